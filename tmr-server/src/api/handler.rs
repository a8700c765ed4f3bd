/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::Write;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::CONTENT_TYPE;

use tmr_types::codec::{self, MetricQuery};
use tmr_types::{Metric, MetricKind, MetricValue};

use super::{ApiError, AppState};

const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

fn json_response(body: Vec<u8>) -> Response {
    ([(CONTENT_TYPE, codec::CONTENT_TYPE_JSON)], body).into_response()
}

async fn stored(state: &AppState, kind: MetricKind, name: &str) -> Result<Metric, ApiError> {
    state
        .store
        .get(kind, name)
        .await?
        .ok_or(ApiError::NotFound)
}

/// Store a single metric, or a small batch, and echo the accumulated values.
pub(super) async fn update_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let metrics = codec::decode(&body)?;
    if metrics.is_empty() {
        return Err(ApiError::EmptyBatch);
    }
    state.store.store(&metrics).await?;

    if let [metric] = metrics.as_slice() {
        let current = stored(&state, metric.kind(), &metric.name).await?;
        return Ok(json_response(codec::encode_one(&current)?));
    }

    let mut current: Vec<Metric> = Vec::with_capacity(metrics.len());
    for m in &metrics {
        if current
            .iter()
            .any(|c| c.name == m.name && c.kind() == m.kind())
        {
            continue;
        }
        current.push(stored(&state, m.kind(), &m.name).await?);
    }
    Ok(json_response(codec::encode(&current)?))
}

pub(super) async fn updates(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let metrics = codec::decode(&body)?;
    state.store.store(&metrics).await?;
    Ok(StatusCode::OK)
}

pub(super) async fn update_path(
    State(state): State<AppState>,
    Path((kind, name, value)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let kind = MetricKind::from_str(&kind)?;
    let metric = Metric {
        name,
        value: MetricValue::parse(kind, &value)?,
    };
    metric.validate()?;
    state.store.store(std::slice::from_ref(&metric)).await?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, CONTENT_TYPE_TEXT)]).into_response())
}

pub(super) async fn value_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (kind, name) = MetricQuery::parse(&body)?;
    let metric = stored(&state, kind, &name).await?;
    Ok(json_response(codec::encode_one(&metric)?))
}

pub(super) async fn value_path(
    State(state): State<AppState>,
    Path((kind, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let kind = MetricKind::from_str(&kind).map_err(|_| ApiError::NotFound)?;
    let metric = stored(&state, kind, &name).await?;
    Ok(([(CONTENT_TYPE, CONTENT_TYPE_TEXT)], metric.value.to_string()).into_response())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_listing(metrics: &[Metric]) -> String {
    let mut page = String::from("<html><body><pre>\n");
    for m in metrics {
        let _ = writeln!(page, "{}=\"{}\"", escape_html(&m.name), m.value);
    }
    page.push_str("</pre></body></html>\n");
    page
}

pub(super) async fn list(State(state): State<AppState>) -> Result<Response, ApiError> {
    let metrics = state.store.list_all().await?;
    Ok(([(CONTENT_TYPE, CONTENT_TYPE_HTML)], render_listing(&metrics)).into_response())
}

pub(super) async fn ping(State(state): State<AppState>) -> StatusCode {
    if state.store.health_check().await {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
