/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use slog::{Logger, o};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tmr_agent::config::AgentConfig;
use tmr_agent::deliver::HttpDelivery;
use tmr_agent::dispatch::{Dispatcher, SnapshotSink};
use tmr_agent::sample::{GAUGE_NAMES, POLL_COUNT, Sampler, Snapshot};
use tmr_retry::RetryPolicy;
use tmr_server::api::{AppState, build_router};
use tmr_server::config::ServerConfig;
use tmr_storage::{MemoryStore, MetricStore};
use tmr_types::{Metric, MetricKind};

fn logger() -> Logger {
    Logger::root(slog::Discard, o!())
}

fn tls_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/tls")
}

struct Running {
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    quit: CancellationToken,
    task: JoinHandle<()>,
}

async fn start(key: Option<&str>, tls: bool) -> Running {
    let store = Arc::new(MemoryStore::new());
    let config = ServerConfig {
        key: key.map(str::to_string),
        ..Default::default()
    };
    let state = AppState::new(store.clone(), &config, logger()).unwrap();
    let app = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let quit = CancellationToken::new();
    let task = if tls {
        let tls_config = tmr_server::tls::load_server_config(&tls_dir()).unwrap();
        tokio::spawn(tmr_server::serve::serve_tls(
            listener,
            app,
            tls_config,
            quit.clone(),
            logger(),
        ))
    } else {
        let quit = quit.clone();
        tokio::spawn(async move {
            tmr_server::serve::serve_plain(listener, app, quit)
                .await
                .unwrap();
        })
    };
    Running {
        addr,
        store,
        quit,
        task,
    }
}

impl Running {
    async fn stop(self) {
        self.quit.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn signed_delivery_over_tls() {
    let server = start(Some("secret"), true).await;
    let config = AgentConfig {
        address: format!("localhost:{}", server.addr.port()),
        key: Some("secret".to_string()),
        crypto_key: Some(tls_dir().join("ca.pem")),
        retry: RetryPolicy::no_retry(),
        ..Default::default()
    };
    let delivery = HttpDelivery::new(&config, logger()).unwrap();
    assert!(delivery.base_url().starts_with("https://"));

    let snapshot = Snapshot::from_metrics(vec![
        Metric::gauge("Alloc", 3.5),
        Metric::counter(POLL_COUNT, 1),
    ]);
    let quit = CancellationToken::new();
    delivery.deliver(&snapshot, &quit).await.unwrap();
    delivery.deliver(&snapshot, &quit).await.unwrap();

    assert_eq!(
        server.store.get_metric(MetricKind::Counter, POLL_COUNT),
        Some(Metric::counter(POLL_COUNT, 2))
    );

    let ca = std::fs::read(tls_dir().join("ca.pem")).unwrap();
    let client = reqwest::Client::builder()
        .add_root_certificate(reqwest::Certificate::from_pem(&ca).unwrap())
        .build()
        .unwrap();
    let rsp = client
        .get(format!("{}/value/gauge/Alloc", delivery.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(rsp.status(), reqwest::StatusCode::OK);
    assert_eq!(rsp.text().await.unwrap(), "3.5");

    server.stop().await;
}

#[tokio::test]
async fn untrusted_certificate_is_refused() {
    let server = start(None, true).await;
    let config = AgentConfig {
        address: format!("https://localhost:{}", server.addr.port()),
        retry: RetryPolicy::no_retry(),
        ..Default::default()
    };
    let delivery = HttpDelivery::new(&config, logger()).unwrap();
    let snapshot = Snapshot::from_metrics(vec![Metric::gauge("Alloc", 1.0)]);
    assert!(
        delivery
            .deliver(&snapshot, &CancellationToken::new())
            .await
            .is_err()
    );
    assert!(server.store.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn key_mismatch_is_rejected() {
    let server = start(Some("secret"), false).await;
    let config = AgentConfig {
        address: server.addr.to_string(),
        key: Some("wrong".to_string()),
        retry: RetryPolicy::no_retry(),
        ..Default::default()
    };
    let delivery = HttpDelivery::new(&config, logger()).unwrap();
    let snapshot = Snapshot::from_metrics(vec![Metric::gauge("Alloc", 1.0)]);
    assert!(
        delivery
            .deliver(&snapshot, &CancellationToken::new())
            .await
            .is_err()
    );
    assert!(server.store.is_empty());

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn agent_pipeline() {
    let server = start(Some("secret"), false).await;
    let config = AgentConfig {
        address: server.addr.to_string(),
        key: Some("secret".to_string()),
        retry: RetryPolicy::no_retry(),
        ..Default::default()
    };
    let delivery = HttpDelivery::new(&config, logger()).unwrap();

    let dispatcher = Dispatcher::new(
        Arc::new(Sampler::new()),
        Arc::new(delivery),
        Duration::from_millis(50),
        NonZeroUsize::new(2).unwrap(),
        logger(),
    );
    let quit = CancellationToken::new();
    let agent = tokio::spawn(dispatcher.run(quit.clone()));

    let mut delivered = false;
    for _ in 0..100 {
        if server
            .store
            .get_metric(MetricKind::Counter, POLL_COUNT)
            .is_some()
        {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(delivered);

    quit.cancel();
    let summary = agent.await.unwrap();
    assert!(summary.delivered >= 1);
    assert_eq!(summary.failed, 0);

    let stored = server.store.list_all().await.unwrap();
    assert_eq!(stored.len(), GAUGE_NAMES.len() + 1);
    for name in GAUGE_NAMES {
        assert!(
            server.store.get_metric(MetricKind::Gauge, name).is_some(),
            "{name}"
        );
    }

    server.stop().await;
}
