/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::poll_fn;

use anyhow::anyhow;
use log::info;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

/// Cancel `quit` on the first SIGINT, SIGTERM or SIGQUIT.
pub fn register_quit(quit: CancellationToken) -> anyhow::Result<()> {
    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::quit(), "SIGQUIT"),
    ] {
        let mut sig =
            signal(kind).map_err(|e| anyhow!("failed to create {name} listener: {e}"))?;
        let quit = quit.clone();
        tokio::spawn(async move {
            tokio::select! {
                r = poll_fn(|cx| sig.poll_recv(cx)) => {
                    if r.is_some() {
                        info!("got {name}, start graceful shutdown");
                        quit.cancel();
                    }
                }
                _ = quit.cancelled() => {}
            }
        });
    }
    Ok(())
}
