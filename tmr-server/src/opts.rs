/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};

use tmr_daemon::opts::{DaemonArgs, DaemonArgsExt};

const ARGS_VERSION: &str = "version";
const ARGS_ADDRESS: &str = "address";
const ARGS_STORE_INTERVAL: &str = "store-interval";
const ARGS_FILE_STORAGE_PATH: &str = "file-storage-path";
const ARGS_RESTORE: &str = "restore";
const ARGS_DATABASE_DSN: &str = "database-dsn";
const ARGS_KEY: &str = "key";
const ARGS_CRYPTO_KEY: &str = "crypto-key";

#[derive(Debug)]
pub struct ProcArgs {
    pub daemon_config: DaemonArgs,
    pub address: Option<String>,
    pub store_interval: Option<Duration>,
    pub file_storage_path: Option<PathBuf>,
    pub restore: Option<bool>,
    pub database_dsn: Option<String>,
    pub key: Option<String>,
    pub crypto_key: Option<PathBuf>,
}

impl Default for ProcArgs {
    fn default() -> Self {
        ProcArgs {
            daemon_config: DaemonArgs::new(crate::build::PKG_NAME),
            address: None,
            store_interval: None,
            file_storage_path: None,
            restore: None,
            database_dsn: None,
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
                .help("Listen address")
                .num_args(1)
                .value_name("HOST:PORT")
                .env("ADDRESS")
                .short('a')
                .long(ARGS_ADDRESS),
        )
        .arg(
            Arg::new(ARGS_STORE_INTERVAL)
                .help("Interval between two snapshot writes, 0 to write on every update")
                .num_args(1)
                .value_name("DURATION")
                .value_parser(tmr_daemon::opts::parse_duration)
                .env("STORE_INTERVAL")
                .short('i')
                .long(ARGS_STORE_INTERVAL),
        )
        .arg(
            Arg::new(ARGS_FILE_STORAGE_PATH)
                .help("Snapshot file of the metrics")
                .num_args(1)
                .value_name("FILE")
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf))
                .env("FILE_STORAGE_PATH")
                .short('f')
                .long(ARGS_FILE_STORAGE_PATH),
        )
        .arg(
            Arg::new(ARGS_RESTORE)
                .help("Load the snapshot file at startup")
                .num_args(1)
                .value_name("BOOL")
                .value_parser(BoolishValueParser::new())
                .env("RESTORE")
                .short('r')
                .long(ARGS_RESTORE),
        )
        .arg(
            Arg::new(ARGS_DATABASE_DSN)
                .help("Database connection string, postgres:// or sqlite://")
                .num_args(1)
                .value_name("DSN")
                .env("DATABASE_DSN")
                .hide_env_values(true)
                .short('d')
                .long(ARGS_DATABASE_DSN),
        )
        .arg(
            Arg::new(ARGS_KEY)
                .help("Shared key used to check and sign payloads")
                .num_args(1)
                .value_name("KEY")
                .env("KEY")
                .hide_env_values(true)
                .short('k')
                .long(ARGS_KEY),
        )
        .arg(
            Arg::new(ARGS_CRYPTO_KEY)
                .help("Directory holding certificate.pem and private.key, enables https")
                .num_args(1)
                .value_name("DIR")
                .value_hint(ValueHint::DirPath)
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
    if let Some(interval) = args.get_one::<Duration>(ARGS_STORE_INTERVAL) {
        proc_args.store_interval = Some(*interval);
    }
    if let Some(path) = args.get_one::<PathBuf>(ARGS_FILE_STORAGE_PATH) {
        proc_args.file_storage_path = Some(path.to_path_buf());
    }
    if let Some(restore) = args.get_one::<bool>(ARGS_RESTORE) {
        proc_args.restore = Some(*restore);
    }
    if let Some(dsn) = args.get_one::<String>(ARGS_DATABASE_DSN) {
        if !dsn.is_empty() {
            proc_args.database_dsn = Some(dsn.to_string());
        }
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
            "tmr-server",
            "-a",
            "0.0.0.0:8080",
            "-i",
            "0",
            "-f",
            "/var/lib/tmr/metrics.json",
            "-r",
            "false",
            "-d",
            "postgres://tmr@db/metrics",
            "-k",
            "secret",
            "--crypto-key",
            "/etc/tmr/tls",
            "-t",
        ]);
        assert_eq!(args.address.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(args.store_interval, Some(Duration::ZERO));
        assert_eq!(
            args.file_storage_path,
            Some(PathBuf::from("/var/lib/tmr/metrics.json"))
        );
        assert_eq!(args.restore, Some(false));
        assert_eq!(args.database_dsn.as_deref(), Some("postgres://tmr@db/metrics"));
        assert_eq!(args.key.as_deref(), Some("secret"));
        assert_eq!(args.crypto_key, Some(PathBuf::from("/etc/tmr/tls")));
        assert!(args.daemon_config.test_config);
    }

    #[test]
    fn boolish_restore() {
        assert_eq!(parse(&["tmr-server", "-r", "1"]).restore, Some(true));
        assert_eq!(parse(&["tmr-server", "--restore", "no"]).restore, Some(false));
        assert!(
            build_cli_args()
                .try_get_matches_from(["tmr-server", "-r", "maybe"])
                .is_err()
        );
    }

    #[test]
    fn empty_values_are_unset() {
        let args = parse(&["tmr-server", "-d", "", "-k", ""]);
        assert!(args.database_dsn.is_none());
        assert!(args.key.is_none());
    }
}
