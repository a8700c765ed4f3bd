/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! The envelope exchanged between agent and server.
//!
//! A batch is a JSON array of records, sent gzip-compressed. When a shared
//! key is configured the uncompressed JSON bytes are signed with
//! HMAC-SHA256 and the hex digest travels in the [`HEADER_SIGNATURE`] header.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Metric, MetricKind, MetricValue, ValidationError};

mod gzip;
pub use gzip::{compress, decompress};

mod sign;
pub use sign::{SignatureError, SigningKey, verify_optional};

pub const HEADER_SIGNATURE: &str = "HashSHA256";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_ENCODING_GZIP: &str = "gzip";

pub const DEFAULT_BODY_LIMIT: usize = 16 << 20;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("signature check failed: {0}")]
    Signature(#[from] SignatureError),
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gzip encode failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Single,
    Batch,
}

impl Endpoint {
    pub fn for_batch_len(len: usize) -> Self {
        if len == 1 {
            Endpoint::Single
        } else {
            Endpoint::Batch
        }
    }

    pub const fn path(&self) -> &'static str {
        match self {
            Endpoint::Single => "/update/",
            Endpoint::Batch => "/updates/",
        }
    }
}

/// One element of the JSON envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl From<&Metric> for MetricRecord {
    fn from(m: &Metric) -> Self {
        let (delta, value) = match m.value {
            MetricValue::Gauge(v) => (None, Some(v)),
            MetricValue::Counter(d) => (Some(d), None),
        };
        MetricRecord {
            id: m.name.clone(),
            kind: m.kind().as_str().to_string(),
            delta,
            value,
        }
    }
}

impl TryFrom<MetricRecord> for Metric {
    type Error = ValidationError;

    fn try_from(r: MetricRecord) -> Result<Self, Self::Error> {
        let kind = MetricKind::from_str(&r.kind)?;
        let value = match kind {
            MetricKind::Gauge => MetricValue::Gauge(r.value.ok_or(ValidationError::MissingValue)?),
            MetricKind::Counter => {
                MetricValue::Counter(r.delta.ok_or(ValidationError::MissingDelta)?)
            }
        };
        let metric = Metric {
            name: r.id,
            value,
        };
        metric.validate()?;
        Ok(metric)
    }
}

/// The body of a JSON read request, naming a metric without a value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetricQuery {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MetricQuery {
    pub fn parse(json: &[u8]) -> Result<(MetricKind, String), ValidationError> {
        let q: MetricQuery = serde_json::from_slice(json)?;
        let kind = MetricKind::from_str(&q.kind)?;
        if q.id.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok((kind, q.id))
    }
}

/// Serialize metrics as the JSON array envelope.
pub fn encode(metrics: &[Metric]) -> Result<Vec<u8>, CodecError> {
    let mut records = Vec::with_capacity(metrics.len());
    for m in metrics {
        m.validate()?;
        records.push(MetricRecord::from(m));
    }
    Ok(serde_json::to_vec(&records)?)
}

/// Serialize a single metric as a bare JSON object.
pub fn encode_one(metric: &Metric) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(&MetricRecord::from(metric))?)
}

/// Parse a JSON envelope.
///
/// Either an array of records or a single bare object is accepted. Every
/// record is validated, a single invalid record fails the whole payload.
pub fn decode(json: &[u8]) -> Result<Vec<Metric>, ValidationError> {
    let records: Vec<MetricRecord> = match json.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => vec![serde_json::from_slice(json)?],
        _ => serde_json::from_slice(json)?,
    };
    records.into_iter().map(Metric::try_from).collect()
}

/// A batch ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    pub endpoint: Endpoint,
    pub body: Vec<u8>,
    pub signature: Option<String>,
}

pub fn encode_request(
    metrics: &[Metric],
    key: Option<&SigningKey>,
) -> Result<EncodedBatch, CodecError> {
    let json = encode(metrics)?;
    let signature = key.map(|k| k.sign(&json));
    let body = compress(&json)?;
    Ok(EncodedBatch {
        endpoint: Endpoint::for_batch_len(metrics.len()),
        body,
        signature,
    })
}

/// Undo the transport encoding of a request body and check its signature.
///
/// Returns the plain JSON bytes. The signature is checked over the
/// decompressed bytes.
pub fn decode_request(
    body: &[u8],
    gzipped: bool,
    signature: Option<&str>,
    key: Option<&SigningKey>,
    limit: usize,
) -> Result<Vec<u8>, CodecError> {
    let json = if gzipped {
        decompress(body, limit)?
    } else if body.len() > limit {
        return Err(ValidationError::PayloadTooLarge(limit).into());
    } else {
        body.to_vec()
    };
    verify_optional(key, &json, signature)?;
    Ok(json)
}
