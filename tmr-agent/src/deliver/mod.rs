/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Certificate, Client, StatusCode};
use slog::{Logger, debug};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use tmr_retry::RetryPolicy;
use tmr_types::codec::{self, EncodedBatch, SigningKey};

use crate::config::AgentConfig;
use crate::dispatch::SnapshotSink;
use crate::sample::Snapshot;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("collector responded with status {0}")]
    Status(StatusCode),
}

/// Posts snapshots to the collector over http(s).
pub struct HttpDelivery {
    client: Client,
    base_url: String,
    key: Option<SigningKey>,
    retry: RetryPolicy,
    logger: Logger,
}

impl HttpDelivery {
    pub fn new(config: &AgentConfig, logger: Logger) -> anyhow::Result<Self> {
        let mut builder = Client::builder().timeout(config.request_timeout);
        if let Some(path) = &config.crypto_key {
            let pem = std::fs::read(path)
                .context(format!("failed to read CA certificate {}", path.display()))?;
            let certs = Certificate::from_pem_bundle(&pem)
                .context(format!("invalid CA certificate {}", path.display()))?;
            if certs.is_empty() {
                return Err(anyhow!("no certificate found in {}", path.display()));
            }
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
        let client = builder.build().context("failed to build http client")?;

        let key = match config.key.as_deref() {
            Some(k) => Some(SigningKey::new(k.as_bytes()).context("invalid signing key")?),
            None => None,
        };

        Ok(HttpDelivery {
            client,
            base_url: config.base_url(),
            key,
            retry: config.retry,
            logger,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_once(&self, url: &str, batch: &EncodedBatch) -> Result<(), DeliveryError> {
        let mut req = self
            .client
            .post(url)
            .header(CONTENT_TYPE, codec::CONTENT_TYPE_JSON)
            .header(CONTENT_ENCODING, codec::CONTENT_ENCODING_GZIP)
            .body(batch.body.clone());
        if let Some(signature) = &batch.signature {
            req = req.header(codec::HEADER_SIGNATURE, signature);
        }

        let rsp = req.send().await?;
        let status = rsp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status))
        }
    }
}

impl SnapshotSink for HttpDelivery {
    async fn deliver(&self, snapshot: &Snapshot, quit: &CancellationToken) -> anyhow::Result<()> {
        if snapshot.is_empty() {
            return Ok(());
        }

        let batch = codec::encode_request(snapshot.metrics(), self.key.as_ref())
            .context("failed to encode snapshot")?;
        let url = format!("{}{}", self.base_url, batch.endpoint.path());

        self.retry
            .run(quit, &self.logger, |_| self.post_once(&url, &batch))
            .await
            .context(format!("failed to post to {url}"))?;
        debug!(self.logger, "posted {} metrics", snapshot.len(); "url" => &url);
        Ok(())
    }
}
