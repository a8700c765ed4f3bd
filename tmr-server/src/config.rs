/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use tmr_retry::RetryPolicy;
use tmr_storage::StoreConfig;
use tmr_types::codec::DEFAULT_BODY_LIMIT;

use crate::opts::ProcArgs;

const DEFAULT_ADDRESS: &str = "localhost:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub store: StoreConfig,
    pub key: Option<String>,
    pub crypto_key: Option<PathBuf>,
    pub body_limit: usize,
    pub retry: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: DEFAULT_ADDRESS.to_string(),
            store: StoreConfig::default(),
            key: None,
            crypto_key: None,
            body_limit: DEFAULT_BODY_LIMIT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn set_by_yaml_kv(
        &mut self,
        k: &str,
        v: &Yaml,
        lookup_dir: Option<&Path>,
    ) -> anyhow::Result<()> {
        match tmr_yaml::key::normalize(k).as_str() {
            "address" | "listen" => {
                self.address = tmr_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                Ok(())
            }
            "store_interval" => {
                self.store.store_interval = tmr_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "file_storage_path" | "file_storage" => {
                let path = tmr_yaml::value::as_path(v, lookup_dir)
                    .context(format!("invalid path value for key {k}"))?;
                self.store.file_path = Some(path);
                Ok(())
            }
            "restore" => {
                self.store.restore =
                    tmr_yaml::value::as_bool(v).context(format!("invalid bool value for key {k}"))?;
                Ok(())
            }
            "database_dsn" | "database" => {
                let dsn = tmr_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.store.database_dsn = if dsn.is_empty() { None } else { Some(dsn) };
                Ok(())
            }
            "max_db_connections" => {
                let n = tmr_yaml::value::as_u64(v)
                    .context(format!("invalid u64 value for key {k}"))?;
                self.store.max_db_connections =
                    u32::try_from(n).map_err(|_| anyhow!("too large value for key {k}"))?;
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
            "body_limit" => {
                self.body_limit = tmr_yaml::humanize::as_usize(v)
                    .context(format!("invalid humanize usize value for key {k}"))?;
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
        tmr_yaml::foreach_doc(path, |_, doc| match doc {
            Yaml::Hash(map) => self.load_doc(map, lookup_dir),
            Yaml::Null => Ok(()),
            _ => Err(anyhow!("yaml doc root should be hash")),
        })
    }

    pub fn apply_args(&mut self, args: &ProcArgs) {
        if let Some(address) = &args.address {
            self.address.clone_from(address);
        }
        if let Some(interval) = args.store_interval {
            self.store.store_interval = interval;
        }
        if let Some(path) = &args.file_storage_path {
            self.store.file_path = Some(path.clone());
        }
        if let Some(restore) = args.restore {
            self.store.restore = restore;
        }
        if let Some(dsn) = &args.database_dsn {
            self.store.database_dsn = Some(dsn.clone());
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
            return Err(anyhow!("no listen address set"));
        }
        if self.body_limit == 0 {
            return Err(anyhow!("body limit should not be zero"));
        }
        Ok(())
    }

    pub fn store_interval(&self) -> Duration {
        self.store.store_interval
    }
}

pub fn load(args: &ProcArgs) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::default();
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
        let config = ServerConfig::default();
        assert_eq!(config.address, "localhost:8080");
        assert_eq!(config.store_interval(), Duration::from_secs(300));
        assert!(config.store.restore);
        assert!(config.store.file_path.is_none());
        assert!(config.store.database_dsn.is_none());
        assert_eq!(config.body_limit, 16 << 20);
    }

    #[test]
    fn yaml_then_args() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(
            b"address: 0.0.0.0:9090\n\
              store_interval: 30s\n\
              file_storage_path: data/metrics.json\n\
              restore: false\n\
              body_limit: 1MiB\n\
              crypto_key: tls\n",
        )
        .unwrap();

        let mut args = ProcArgs::default();
        args.daemon_config.config_file = Some(path);
        args.store_interval = Some(Duration::ZERO);
        args.key = Some("secret".to_string());

        let config = load(&args).unwrap();
        assert_eq!(config.address, "0.0.0.0:9090");
        assert_eq!(config.store_interval(), Duration::ZERO);
        assert_eq!(
            config.store.file_path,
            Some(dir.path().join("data/metrics.json"))
        );
        assert!(!config.store.restore);
        assert_eq!(config.body_limit, 1 << 20);
        assert_eq!(config.crypto_key, Some(dir.path().join("tls")));
        assert_eq!(config.key.as_deref(), Some("secret"));
    }

    #[test]
    fn unknown_key() {
        let mut config = ServerConfig::default();
        assert!(
            config
                .set_by_yaml_kv("store_intervall", &Yaml::Integer(1), None)
                .is_err()
        );
    }

    #[test]
    fn empty_dsn() {
        let mut config = ServerConfig::default();
        config
            .set_by_yaml_kv("database-dsn", &Yaml::String(String::new()), None)
            .unwrap();
        assert!(config.store.database_dsn.is_none());
    }
}
