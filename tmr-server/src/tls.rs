/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use rustls::ServerConfig;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

pub const CERTIFICATE_FILE: &str = "certificate.pem";
pub const PRIVATE_KEY_FILE: &str = "private.key";

/// Load `certificate.pem` and `private.key` from `dir`.
pub fn load_server_config(dir: &Path) -> anyhow::Result<Arc<ServerConfig>> {
    let cert_path = dir.join(CERTIFICATE_FILE);
    let certs = CertificateDer::pem_file_iter(&cert_path)
        .context(format!("failed to open {}", cert_path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .context(format!("invalid certificate in {}", cert_path.display()))?;
    if certs.is_empty() {
        return Err(anyhow!("no certificate found in {}", cert_path.display()));
    }

    let key_path = dir.join(PRIVATE_KEY_FILE);
    let key = PrivateKeyDer::from_pem_file(&key_path)
        .context(format!("invalid private key in {}", key_path.display()))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .context("failed to select tls protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("certificate and private key do not match")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/tls")
    }

    #[test]
    fn load_fixtures() {
        let config = load_server_config(&fixtures()).unwrap();
        assert_eq!(config.alpn_protocols.len(), 2);
    }

    #[test]
    fn missing_dir() {
        assert!(load_server_config(Path::new("/nonexistent/tls")).is_err());
    }

    #[test]
    fn garbage_certificate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CERTIFICATE_FILE), b"not a certificate").unwrap();
        std::fs::copy(
            fixtures().join(PRIVATE_KEY_FILE),
            dir.path().join(PRIVATE_KEY_FILE),
        )
        .unwrap();
        assert!(load_server_config(dir.path()).is_err());
    }
}
