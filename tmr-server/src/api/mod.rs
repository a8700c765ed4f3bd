/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! The ingestion API.
//!
//! Request bodies are gunzipped and their signature checked by
//! [`middleware::decode_body`] before any handler runs, so handlers only
//! ever see plain JSON that already passed the integrity check.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use slog::Logger;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;

use tmr_storage::MetricStore;
use tmr_types::codec::SigningKey;

use crate::config::ServerConfig;

mod error;
pub use error::ApiError;

mod handler;
mod middleware;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn MetricStore>,
    key: Option<Arc<SigningKey>>,
    body_limit: usize,
    logger: Logger,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MetricStore>,
        config: &ServerConfig,
        logger: Logger,
    ) -> anyhow::Result<Self> {
        let key = match config.key.as_deref() {
            Some(k) => Some(Arc::new(
                SigningKey::new(k.as_bytes()).context("invalid signing key")?,
            )),
            None => None,
        };
        Ok(AppState {
            store,
            key,
            body_limit: config.body_limit,
            logger,
        })
    }

    fn key(&self) -> Option<&SigningKey> {
        self.key.as_deref()
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/", get(handler::list))
        .route("/ping", get(handler::ping))
        .route("/ping/", get(handler::ping))
        .route("/update", post(handler::update_json))
        .route("/update/", post(handler::update_json))
        .route("/update/{kind}/{name}/{value}", post(handler::update_path))
        .route("/updates", post(handler::updates))
        .route("/updates/", post(handler::updates))
        .route("/value", post(handler::value_json))
        .route("/value/", post(handler::value_json))
        .route("/value/{kind}/{name}", get(handler::value_path))
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(from_fn_with_state(state.clone(), middleware::log_request))
                .layer(from_fn_with_state(state.clone(), middleware::sign_response))
                .layer(from_fn_with_state(state.clone(), middleware::decode_body))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
