/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};

const ARGS_VERBOSE: &str = "verbose";
const ARGS_CONFIG_FILE: &str = "config-file";
const ARGS_TEST_CONFIG: &str = "test-config";

pub trait DaemonArgsExt {
    fn append_daemon_args(self) -> Self;
}

#[derive(Debug)]
pub struct DaemonArgs {
    pub verbose_level: u8,
    pub process_name: &'static str,
    pub config_file: Option<PathBuf>,
    pub test_config: bool,
}

impl DaemonArgs {
    pub fn new(process_name: &'static str) -> Self {
        DaemonArgs {
            verbose_level: 0,
            process_name,
            config_file: None,
            test_config: false,
        }
    }

    pub fn parse_clap(&mut self, args: &ArgMatches) -> anyhow::Result<()> {
        if let Some(verbose_level) = args.get_one::<u8>(ARGS_VERBOSE) {
            self.verbose_level = *verbose_level;
        }
        if args.get_flag(ARGS_TEST_CONFIG) {
            self.test_config = true;
        }
        if let Some(config_file) = args.get_one::<PathBuf>(ARGS_CONFIG_FILE) {
            self.config_file = Some(config_file.to_path_buf());
        }
        Ok(())
    }
}

impl DaemonArgsExt for Command {
    fn append_daemon_args(self) -> Self {
        self.arg(
            Arg::new(ARGS_VERBOSE)
                .help("Show verbose output")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .long(ARGS_VERBOSE),
        )
        .arg(
            Arg::new(ARGS_CONFIG_FILE)
                .help("Config file path")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf))
                .env("CONFIG")
                .short('c')
                .long(ARGS_CONFIG_FILE),
        )
        .arg(
            Arg::new(ARGS_TEST_CONFIG)
                .help("Test the format of config file and exit")
                .action(ArgAction::SetTrue)
                .short('t')
                .long(ARGS_TEST_CONFIG),
        )
    }
}

/// Parse "10s", "1m30s" or a plain number of seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    match humanize_rs::duration::parse(s) {
        Ok(d) => Ok(d),
        Err(humanize_rs::ParseError::MissingUnit) => u64::from_str(s)
            .map(Duration::from_secs)
            .map_err(|e| anyhow!("invalid duration {s}: {e}")),
        Err(e) => Err(anyhow!("invalid duration {s}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration() {
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn parse() {
        let cmd = Command::new("test").append_daemon_args();
        let matches = cmd
            .try_get_matches_from(["test", "-vv", "-t", "-c", "/etc/tmr/agent.yaml"])
            .unwrap();
        let mut args = DaemonArgs::new("test");
        args.parse_clap(&matches).unwrap();
        assert_eq!(args.verbose_level, 2);
        assert!(args.test_config);
        assert_eq!(
            args.config_file.as_deref(),
            Some(std::path::Path::new("/etc/tmr/agent.yaml"))
        );
    }
}
