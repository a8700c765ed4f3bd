/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use slog::{Drain, Logger, o};
use slog_scope::GlobalLoggerGuard;

use crate::opts::DaemonArgs;

const PROCESS_LOG_THREAD_NAME: &str = "log-process";
const PROCESS_LOG_CHANNEL_SIZE: usize = 4096;

/// Level used for both the `log` facade and the returned slog root logger.
fn log_level(verbose_level: u8) -> (log::Level, slog::Level) {
    match verbose_level {
        0 => (log::Level::Warn, slog::Level::Warning),
        1 => (log::Level::Info, slog::Level::Info),
        2 => (log::Level::Debug, slog::Level::Debug),
        _ => (log::Level::Trace, slog::Level::Trace),
    }
}

/// Set up the process logger.
///
/// The returned guard must be held until the process exits. The returned
/// logger is the root handle to be passed to each component.
pub fn setup(args: &DaemonArgs) -> Result<(GlobalLoggerGuard, Logger), log::SetLoggerError> {
    let (std_level, slog_level) = log_level(args.verbose_level);

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .thread_name(PROCESS_LOG_THREAD_NAME.to_string())
        .chan_size(PROCESS_LOG_CHANNEL_SIZE)
        .overflow_strategy(slog_async::OverflowStrategy::DropAndReport)
        .build()
        .fuse();
    let drain = slog::LevelFilter::new(drain, slog_level).fuse();
    let logger = Logger::root(drain, o!("daemon" => args.process_name));

    let scope_guard = slog_scope::set_global_logger(logger.clone());
    slog_stdlog::init_with_level(std_level)?;
    Ok((scope_guard, logger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_mapping() {
        assert_eq!(log_level(0).0, log::Level::Warn);
        assert_eq!(log_level(1).1, slog::Level::Info);
        assert_eq!(log_level(2).0, log::Level::Debug);
        assert_eq!(log_level(9).1, slog::Level::Trace);
    }
}
