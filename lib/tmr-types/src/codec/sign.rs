/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature mismatch")]
    Mismatch,
    #[error("no signature header")]
    Missing,
    #[error("malformed signature: {0}")]
    Malformed(#[from] hex::FromHexError),
    #[error("invalid signing key")]
    InvalidKey,
}

/// A shared secret used to sign and verify payloads.
#[derive(Clone)]
pub struct SigningKey {
    mac: HmacSha256,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

impl SigningKey {
    pub fn new(key: &[u8]) -> Result<Self, SignatureError> {
        if key.is_empty() {
            return Err(SignatureError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)?;
        Ok(SigningKey { mac })
    }

    /// Hex encoded HMAC-SHA256 of `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<(), SignatureError> {
        let expected = hex::decode(signature.trim())?;
        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

/// Verify when a local key is configured, skip the check otherwise.
///
/// With a key, a payload that carries no signature is rejected.
pub fn verify_optional(
    key: Option<&SigningKey>,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<(), SignatureError> {
    match (key, signature) {
        (Some(key), Some(signature)) => key.verify(payload, signature),
        (Some(_), None) => Err(SignatureError::Missing),
        (None, _) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        // RFC 4231 test case 2
        let key = SigningKey::new(b"Jefe").unwrap();
        assert_eq!(
            key.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn any_byte_mutation_fails() {
        let key = SigningKey::new(b"secret").unwrap();
        let payload = br#"[{"id":"A","type":"gauge","value":1}]"#.to_vec();
        let signature = key.sign(&payload);
        assert!(key.verify(&payload, &signature).is_ok());

        for i in 0..payload.len() {
            let mut mutated = payload.clone();
            mutated[i] ^= 0x01;
            assert!(matches!(
                key.verify(&mutated, &signature),
                Err(SignatureError::Mismatch)
            ));
        }
    }

    #[test]
    fn optional_verification() {
        let key = SigningKey::new(b"secret").unwrap();
        let payload = b"payload";

        assert!(verify_optional(None, payload, Some("00ff")).is_ok());
        assert!(verify_optional(None, payload, None).is_ok());
        assert!(matches!(
            verify_optional(Some(&key), payload, None),
            Err(SignatureError::Missing)
        ));
        assert!(verify_optional(Some(&key), payload, Some(&key.sign(payload))).is_ok());
        assert!(verify_optional(Some(&key), payload, Some("00ff")).is_err());
        assert!(matches!(
            verify_optional(Some(&key), payload, Some("zz")),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn empty_key() {
        assert!(SigningKey::new(b"").is_err());
    }
}
