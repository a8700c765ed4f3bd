/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use tmr_storage::StoreError;
use tmr_types::ValidationError;
use tmr_types::codec::CodecError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Codec(#[from] CodecError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("metric not found")]
    NotFound,
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("failed to buffer response body: {0}")]
    Body(#[from] axum::Error),
    #[error("no metric in request")]
    EmptyBatch,
}

fn validation_status(e: &ValidationError) -> StatusCode {
    match e {
        ValidationError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Codec(CodecError::Validation(e)) | ApiError::Validation(e) => {
                validation_status(e)
            }
            ApiError::Codec(CodecError::Signature(_)) => StatusCode::BAD_REQUEST,
            ApiError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Validation(e)) => validation_status(e),
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Body(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::EmptyBatch => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::NOT_FOUND {
            return status.into_response();
        }
        (status, self.to_string()).into_response()
    }
}
