/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use slog::{Logger, debug, info, warn};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

/// Serve plain http until `quit` is cancelled, then finish in-flight requests.
pub async fn serve_plain(
    listener: TcpListener,
    app: Router,
    quit: CancellationToken,
) -> io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(quit.cancelled_owned())
        .await
}

/// Serve https until `quit` is cancelled.
///
/// Accepted connections keep being served until their in-flight requests
/// complete, new connections are refused once `quit` fires.
pub async fn serve_tls(
    listener: TcpListener,
    app: Router,
    tls_config: Arc<rustls::ServerConfig>,
    quit: CancellationToken,
    logger: Logger,
) {
    let acceptor = TlsAcceptor::from(tls_config);
    let builder = auto::Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();

    loop {
        let (stream, peer_addr) = tokio::select! {
            biased;

            _ = quit.cancelled() => break,
            r = listener.accept() => match r {
                Ok(v) => v,
                Err(e) => {
                    warn!(logger, "failed to accept connection: {e}");
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let builder = builder.clone();
        let service = TowerToHyperService::new(app.clone());
        let watcher = graceful.watcher();
        let logger = logger.clone();
        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(s) => s,
                Err(e) => {
                    debug!(logger, "tls handshake failed: {e}"; "peer" => %peer_addr);
                    return;
                }
            };
            let conn = builder.serve_connection(TokioIo::new(tls_stream), service);
            if let Err(e) = watcher.watch(conn.into_owned()).await {
                debug!(logger, "connection closed with error: {e}"; "peer" => %peer_addr);
            }
        });
    }

    drop(listener);
    info!(logger, "waiting for in-flight connections to finish");
    graceful.shutdown().await;
}
