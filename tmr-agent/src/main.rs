/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::Context;
use log::{debug, error, info};
use slog::Logger;
use tokio_util::sync::CancellationToken;

use tmr_agent::config::AgentConfig;
use tmr_agent::deliver::HttpDelivery;
use tmr_agent::dispatch::Dispatcher;
use tmr_agent::sample::Sampler;

fn main() -> anyhow::Result<()> {
    let Some(proc_args) =
        tmr_agent::opts::parse_clap().context("failed to parse command line options")?
    else {
        return Ok(());
    };

    // set up process logger early, only proc args is used inside
    let (_log_guard, logger) = tmr_daemon::log::process::setup(&proc_args.daemon_config)
        .context("failed to setup process logger")?;

    let config = tmr_agent::config::load(&proc_args)
        .context(format!("failed to load config, opts: {:?}", &proc_args))?;
    debug!("loaded config for collector {}", config.address);

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

fn tokio_run(config: AgentConfig, logger: Logger) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tmr-agent")
        .build()
        .context("failed to start runtime")?;
    rt.block_on(async {
        let quit = CancellationToken::new();
        tmr_daemon::signal::register_quit(quit.clone())
            .context("failed to setup signal handler")?;

        let delivery = HttpDelivery::new(&config, logger.clone())
            .context("failed to create http delivery")?;
        info!(
            "reporting to {} every {:?} with {} workers",
            delivery.base_url(),
            config.poll_interval,
            config.rate_limit
        );
        debug!("report interval {:?} is not used for scheduling", config.report_interval);

        let dispatcher = Dispatcher::new(
            Arc::new(Sampler::new()),
            Arc::new(delivery),
            config.poll_interval,
            config.rate_limit,
            logger,
        );
        let summary = dispatcher.run(quit).await;
        info!(
            "agent stopped, {} delivered, {} failed, {} skipped",
            summary.delivered, summary.failed, summary.skipped
        );
        Ok(())
    })
}
