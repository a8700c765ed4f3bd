/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Instant;

use axum::body::{Body, HttpBody, to_bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use http::{HeaderName, HeaderValue, Method};
use slog::{info, warn};

use tmr_types::ValidationError;
use tmr_types::codec;

use super::{ApiError, AppState};

static SIGNATURE_HEADER: HeaderName = HeaderName::from_static("hashsha256");

fn is_gzip(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case(codec::CONTENT_ENCODING_GZIP))
        .unwrap_or(false)
}

/// Replace the request body with the verified plain JSON bytes.
///
/// Every POST is checked, the plain-text update path included. Reads over
/// GET carry no body and pass through untouched.
pub(super) async fn decode_body(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let method = request.method();
    if method == Method::GET || method == Method::HEAD {
        return Ok(next.run(request).await);
    }

    let gzipped = is_gzip(&request);
    let (mut parts, body) = request.into_parts();
    // any read failure is reported against the size limit
    let raw = to_bytes(body, state.body_limit)
        .await
        .map_err(|_| ValidationError::PayloadTooLarge(state.body_limit))?;

    let signature = parts
        .headers
        .get(codec::HEADER_SIGNATURE)
        .and_then(|v| v.to_str().ok());
    let json = codec::decode_request(&raw, gzipped, signature, state.key(), state.body_limit)?;

    if gzipped {
        parts.headers.remove(CONTENT_ENCODING);
    }
    parts.headers.remove(CONTENT_LENGTH);
    Ok(next.run(Request::from_parts(parts, Body::from(json))).await)
}

/// Sign non-empty response bodies when a key is configured.
pub(super) async fn sign_response(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let response = next.run(request).await;
    let Some(key) = state.key() else {
        return Ok(response);
    };

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await?;
    if !bytes.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&key.sign(&bytes)) {
            parts.headers.insert(SIGNATURE_HEADER.clone(), value);
        }
    }
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

pub(super) async fn log_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;
    let size = response.body().size_hint().lower();
    if status.is_server_error() {
        warn!(state.logger, "request failed";
            "method" => %method, "uri" => %uri, "status" => status.as_u16(),
            "duration_ms" => duration_ms, "size" => size);
    } else {
        info!(state.logger, "request";
            "method" => %method, "uri" => %uri, "status" => status.as_u16(),
            "duration_ms" => duration_ms, "size" => size);
    }
    response
}
