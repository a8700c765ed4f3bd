/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::Context;
use log::{debug, error, info};
use slog::{Logger, o};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use tmr_server::api::AppState;
use tmr_server::config::ServerConfig;

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        tmr_server::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    // set up process logger early, only proc args is used inside
    let (_log_guard, logger) = tmr_daemon::log::process::setup(&proc_args.daemon_config)
        .context("failed to setup process logger")?;

    let config = tmr_server::config::load(&proc_args)
        .context(format!("failed to load config, opts: {:?}", &proc_args))?;
    debug!("loaded config, listen address {}", config.address);

    if proc_args.daemon_config.test_config {
        info!("the format of the config file is ok");
        return Ok(());
    }

    let ret = tokio_run(config, logger);
    match ret {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{:?}", e);
            Err(e)
        }
    }
}

fn tokio_run(config: ServerConfig, logger: Logger) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tmr-server")
        .build()
        .context("failed to start runtime")?;
    rt.block_on(async {
        let quit = CancellationToken::new();
        tmr_daemon::signal::register_quit(quit.clone())
            .context("failed to setup signal handler")?;

        let store = tmr_storage::build_store(&config.store, config.retry, quit.clone(), &logger)
            .await
            .context("failed to set up metric storage")?;

        let tls_config = match &config.crypto_key {
            Some(dir) => Some(
                tmr_server::tls::load_server_config(dir)
                    .context(format!("failed to load tls material from {}", dir.display()))?,
            ),
            None => None,
        };

        let state = AppState::new(store.clone(), &config, logger.new(o!("component" => "http")))?;
        let app = tmr_server::api::build_router(state);

        let listener = TcpListener::bind(&config.address)
            .await
            .context(format!("failed to bind to {}", config.address))?;
        let local_addr = listener.local_addr().context("failed to get local address")?;

        let served = match tls_config {
            Some(tls_config) => {
                info!("listening on https://{local_addr}");
                tmr_server::serve::serve_tls(listener, app, tls_config, quit, logger.clone()).await;
                Ok(())
            }
            None => {
                info!("listening on http://{local_addr}");
                tmr_server::serve::serve_plain(listener, app, quit)
                    .await
                    .context("http server failed")
            }
        };

        let flushed = store
            .flush()
            .await
            .context("failed to flush metric storage");
        served?;
        flushed?;
        info!("server stopped");
        Ok(())
    })
}
