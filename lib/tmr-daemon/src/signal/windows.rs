/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use log::info;
use tokio::signal::windows::ctrl_c;
use tokio_util::sync::CancellationToken;

pub fn register_quit(quit: CancellationToken) -> anyhow::Result<()> {
    let mut quit_sig = ctrl_c().map_err(|e| anyhow!("failed to create Ctrl-C listener: {e}"))?;
    tokio::spawn(async move {
        tokio::select! {
            r = quit_sig.recv() => {
                if r.is_some() {
                    info!("got Ctrl-C, start graceful shutdown");
                    quit.cancel();
                }
            }
            _ = quit.cancelled() => {}
        }
    });
    Ok(())
}
