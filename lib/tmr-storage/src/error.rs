/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use tmr_types::ValidationError;
use tmr_types::codec::CodecError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid metric: {0}")]
    Validation(#[from] ValidationError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(CodecError),
    #[error("snapshot file {} is corrupted: {source}", path.display())]
    Corrupted {
        path: PathBuf,
        source: ValidationError,
    },
    #[error("durable write failed after retries: {0}")]
    Persistence(#[source] Box<StoreError>),
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Validation(e) => StoreError::Validation(e),
            e => StoreError::Encode(e),
        }
    }
}

impl StoreError {
    /// Errors caused by the input rather than the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
