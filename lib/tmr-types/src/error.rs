/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

use crate::MetricKind;

/// Client-correctable problems found while decoding or checking a metric.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed json payload: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("payload too large: more than {0} bytes after decompression")]
    PayloadTooLarge(usize),
    #[error("invalid gzip payload: {0}")]
    InvalidGzip(std::io::Error),
    #[error("unknown metric type {0}")]
    UnknownKind(String),
    #[error("empty metric name")]
    EmptyName,
    #[error("gauge record has no value")]
    MissingValue,
    #[error("counter record has no delta")]
    MissingDelta,
    #[error("invalid {kind} number {raw}")]
    InvalidNumber { kind: MetricKind, raw: String },
    #[error("gauge value is not a finite number")]
    NonFiniteValue,
    #[error("negative gauge value {0}")]
    NegativeValue(f64),
    #[error("negative counter delta {0}")]
    NegativeDelta(i64),
    #[error("counter {0} overflows")]
    CounterOverflow(String),
}
