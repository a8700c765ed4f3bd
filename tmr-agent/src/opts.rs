/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};

use tmr_daemon::opts::{DaemonArgs, DaemonArgsExt};

const ARGS_VERSION: &str = "version";
const ARGS_ADDRESS: &str = "address";
const ARGS_POLL_INTERVAL: &str = "poll-interval";
const ARGS_REPORT_INTERVAL: &str = "report-interval";
const ARGS_RATE_LIMIT: &str = "rate-limit";
const ARGS_KEY: &str = "key";
const ARGS_CRYPTO_KEY: &str = "crypto-key";

#[derive(Debug)]
pub struct ProcArgs {
    pub daemon_config: DaemonArgs,
    pub address: Option<String>,
    pub poll_interval: Option<Duration>,
    pub report_interval: Option<Duration>,
    pub rate_limit: Option<NonZeroUsize>,
    pub key: Option<String>,
    pub crypto_key: Option<PathBuf>,
}

impl Default for ProcArgs {
    fn default() -> Self {
        ProcArgs {
            daemon_config: DaemonArgs::new(crate::build::PKG_NAME),
            address: None,
            poll_interval: None,
            report_interval: None,
            rate_limit: None,
            key: None,
            crypto_key: None,
        }
    }
}

fn build_cli_args() -> Command {
    Command::new(crate::build::PKG_NAME)
        .disable_version_flag(true)
        .append_daemon_args()
        .arg(
            Arg::new(ARGS_VERSION)
                .help("Show version")
                .action(ArgAction::SetTrue)
                .short('V')
                .long(ARGS_VERSION),
        )
        .arg(
            Arg::new(ARGS_ADDRESS)
                .help("Address of the collector server")
                .num_args(1)
                .value_name("HOST:PORT")
                .env("ADDRESS")
                .short('a')
                .long(ARGS_ADDRESS),
        )
        .arg(
            Arg::new(ARGS_POLL_INTERVAL)
                .help("Interval between two samples")
                .num_args(1)
                .value_name("DURATION")
                .value_parser(tmr_daemon::opts::parse_duration)
                .env("POLL_INTERVAL")
                .short('p')
                .long(ARGS_POLL_INTERVAL),
        )
        .arg(
            Arg::new(ARGS_REPORT_INTERVAL)
                .help("Report interval")
                .num_args(1)
                .value_name("DURATION")
                .value_parser(tmr_daemon::opts::parse_duration)
                .env("REPORT_INTERVAL")
                .short('r')
                .long(ARGS_REPORT_INTERVAL),
        )
        .arg(
            Arg::new(ARGS_RATE_LIMIT)
                .help("Max number of concurrent outgoing requests")
                .num_args(1)
                .value_name("COUNT")
                .value_parser(value_parser!(NonZeroUsize))
                .env("RATE_LIMIT")
                .short('l')
                .long(ARGS_RATE_LIMIT),
        )
        .arg(
            Arg::new(ARGS_KEY)
                .help("Shared key used to sign the payload")
                .num_args(1)
                .value_name("KEY")
                .env("KEY")
                .hide_env_values(true)
                .short('k')
                .long(ARGS_KEY),
        )
        .arg(
            Arg::new(ARGS_CRYPTO_KEY)
                .help("CA certificate of the server, enables https")
                .num_args(1)
                .value_name("PEM FILE")
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf))
                .env("CRYPTO_KEY")
                .long(ARGS_CRYPTO_KEY),
        )
}

fn parse_matches(args: &ArgMatches) -> anyhow::Result<Option<ProcArgs>> {
    let mut proc_args = ProcArgs::default();
    proc_args.daemon_config.parse_clap(args)?;

    if args.get_flag(ARGS_VERSION) {
        crate::build::print_version(proc_args.daemon_config.verbose_level);
        return Ok(None);
    }

    if let Some(address) = args.get_one::<String>(ARGS_ADDRESS) {
        proc_args.address = Some(address.to_string());
    }
    if let Some(interval) = args.get_one::<Duration>(ARGS_POLL_INTERVAL) {
        proc_args.poll_interval = Some(*interval);
    }
    if let Some(interval) = args.get_one::<Duration>(ARGS_REPORT_INTERVAL) {
        proc_args.report_interval = Some(*interval);
    }
    if let Some(limit) = args.get_one::<NonZeroUsize>(ARGS_RATE_LIMIT) {
        proc_args.rate_limit = Some(*limit);
    }
    if let Some(key) = args.get_one::<String>(ARGS_KEY) {
        if !key.is_empty() {
            proc_args.key = Some(key.to_string());
        }
    }
    if let Some(path) = args.get_one::<PathBuf>(ARGS_CRYPTO_KEY) {
        proc_args.crypto_key = Some(path.to_path_buf());
    }
    Ok(Some(proc_args))
}

pub fn parse_clap() -> anyhow::Result<Option<ProcArgs>> {
    let args = build_cli_args().get_matches();
    parse_matches(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ProcArgs {
        let matches = build_cli_args().try_get_matches_from(argv).unwrap();
        parse_matches(&matches).unwrap().unwrap()
    }

    #[test]
    fn all_options() {
        let args = parse(&[
            "tmr-agent",
            "-a",
            "collector:9090",
            "-p",
            "500ms",
            "-r",
            "20",
            "-l",
            "4",
            "-k",
            "secret",
            "--crypto-key",
            "/etc/tmr/ca.pem",
            "-vv",
        ]);
        assert_eq!(args.address.as_deref(), Some("collector:9090"));
        assert_eq!(args.poll_interval, Some(Duration::from_millis(500)));
        assert_eq!(args.report_interval, Some(Duration::from_secs(20)));
        assert_eq!(args.rate_limit, NonZeroUsize::new(4));
        assert_eq!(args.key.as_deref(), Some("secret"));
        assert_eq!(args.crypto_key, Some(PathBuf::from("/etc/tmr/ca.pem")));
        assert_eq!(args.daemon_config.verbose_level, 2);
    }

    #[test]
    fn invalid_rate_limit() {
        assert!(
            build_cli_args()
                .try_get_matches_from(["tmr-agent", "-l", "0"])
                .is_err()
        );
        assert!(
            build_cli_args()
                .try_get_matches_from(["tmr-agent", "-p", "often"])
                .is_err()
        );
    }
}
