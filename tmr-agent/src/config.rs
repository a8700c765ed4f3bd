/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use tmr_retry::RetryPolicy;

use crate::opts::ProcArgs;

const DEFAULT_ADDRESS: &str = "localhost:8080";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_RATE_LIMIT: NonZeroUsize = NonZeroUsize::new(10).unwrap();
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub address: String,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub rate_limit: NonZeroUsize,
    pub key: Option<String>,
    pub crypto_key: Option<PathBuf>,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            address: DEFAULT_ADDRESS.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
            rate_limit: DEFAULT_RATE_LIMIT,
            key: None,
            crypto_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl AgentConfig {
    pub fn set_by_yaml_kv(
        &mut self,
        k: &str,
        v: &Yaml,
        lookup_dir: Option<&Path>,
    ) -> anyhow::Result<()> {
        match tmr_yaml::key::normalize(k).as_str() {
            "address" | "server" => {
                self.address = tmr_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                Ok(())
            }
            "poll_interval" => {
                self.poll_interval = tmr_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "report_interval" => {
                self.report_interval = tmr_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "rate_limit" => {
                self.rate_limit = tmr_yaml::value::as_nonzero_usize(v)
                    .context(format!("invalid nonzero usize value for key {k}"))?;
                Ok(())
            }
            "key" => {
                let key = tmr_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.key = if key.is_empty() { None } else { Some(key) };
                Ok(())
            }
            "crypto_key" => {
                let path = tmr_yaml::value::as_path(v, lookup_dir)
                    .context(format!("invalid path value for key {k}"))?;
                self.crypto_key = Some(path);
                Ok(())
            }
            "request_timeout" => {
                self.request_timeout = tmr_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "retry" => {
                self.retry = tmr_yaml::value::as_retry_policy(v)
                    .context(format!("invalid retry policy value for key {k}"))?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn load_doc(&mut self, map: &yaml::Hash, lookup_dir: Option<&Path>) -> anyhow::Result<()> {
        tmr_yaml::foreach_kv(map, |k, v| self.set_by_yaml_kv(k, v, lookup_dir))
    }

    pub fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let lookup_dir = path.parent();
        // allow multiple docs, and treat them as the same
        tmr_yaml::foreach_doc(path, |_, doc| match doc {
            Yaml::Hash(map) => self.load_doc(map, lookup_dir),
            Yaml::Null => Ok(()),
            _ => Err(anyhow!("yaml doc root should be hash")),
        })
    }

    /// Command line and environment values override the config file.
    pub fn apply_args(&mut self, args: &ProcArgs) {
        if let Some(address) = &args.address {
            self.address.clone_from(address);
        }
        if let Some(interval) = args.poll_interval {
            self.poll_interval = interval;
        }
        if let Some(interval) = args.report_interval {
            self.report_interval = interval;
        }
        if let Some(limit) = args.rate_limit {
            self.rate_limit = limit;
        }
        if let Some(key) = &args.key {
            self.key = Some(key.clone());
        }
        if let Some(path) = &args.crypto_key {
            self.crypto_key = Some(path.clone());
        }
    }

    pub fn check(&self) -> anyhow::Result<()> {
        if self.address.trim().is_empty() {
            return Err(anyhow!("no server address set"));
        }
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll interval should not be zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("request timeout should not be zero"));
        }
        Ok(())
    }

    /// Base url of the collector, scheme included.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else if self.crypto_key.is_some() {
            format!("https://{address}")
        } else {
            format!("http://{address}")
        }
    }
}

pub fn load(args: &ProcArgs) -> anyhow::Result<AgentConfig> {
    let mut config = AgentConfig::default();
    if let Some(path) = &args.daemon_config.config_file {
        config
            .load_file(path)
            .context(format!("failed to load config file {}", path.display()))?;
    }
    config.apply_args(args);
    config.check()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.address, "localhost:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.report_interval, Duration::from_secs(10));
        assert_eq!(config.rate_limit.get(), 10);
        assert!(config.key.is_none());
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert!(config.check().is_ok());
    }

    #[test]
    fn yaml_then_args() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"address: collector:8080\n\
              poll-interval: 1s\n\
              rate-limit: 3\n\
              key: from-file\n\
              crypto-key: ca.pem\n\
              retry:\n  initial_delay: 100ms\n  step: 100ms\n  max_attempts: 1\n",
        )
        .unwrap();

        let mut args = ProcArgs::default();
        args.daemon_config.config_file = Some(file.path().to_path_buf());
        args.rate_limit = NonZeroUsize::new(5);

        let config = load(&args).unwrap();
        assert_eq!(config.address, "collector:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.rate_limit.get(), 5);
        assert_eq!(config.key.as_deref(), Some("from-file"));
        assert_eq!(
            config.crypto_key,
            Some(file.path().parent().unwrap().join("ca.pem"))
        );
        assert_eq!(config.retry.max_attempts(), 1);
        assert_eq!(config.base_url(), "https://collector:8080");
    }

    #[test]
    fn invalid_key() {
        let mut config = AgentConfig::default();
        assert!(
            config
                .set_by_yaml_kv("pool_interval", &Yaml::Integer(1), None)
                .is_err()
        );
        assert!(
            config
                .set_by_yaml_kv("rate_limit", &Yaml::Integer(0), None)
                .is_err()
        );
    }

    #[test]
    fn zero_poll_interval() {
        let mut args = ProcArgs::default();
        args.poll_interval = Some(Duration::ZERO);
        assert!(load(&args).is_err());
    }

    #[test]
    fn explicit_scheme() {
        let config = AgentConfig {
            address: "http://127.0.0.1:9000/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }
}
