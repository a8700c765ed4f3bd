/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use tmr_retry::RetryPolicy;

/// Parse a map like `{initial_delay: 1s, step: 2s, max_attempts: 3}`.
///
/// Missing keys keep their default value. A plain integer only sets
/// `max_attempts`.
pub fn as_retry_policy(v: &Yaml) -> anyhow::Result<RetryPolicy> {
    let mut policy = RetryPolicy::default();
    match v {
        Yaml::Hash(map) => {
            crate::foreach_kv(map, |k, v| match crate::key::normalize(k).as_str() {
                "initial_delay" | "delay" => {
                    let delay = crate::humanize::as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    policy.set_initial_delay(delay);
                    Ok(())
                }
                "step" => {
                    let step = crate::humanize::as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    policy.set_step(step);
                    Ok(())
                }
                "max_attempts" | "max_retries" => {
                    let max = super::as_usize(v)
                        .context(format!("invalid usize value for key {k}"))?;
                    policy.set_max_attempts(max);
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
        }
        Yaml::Integer(_) | Yaml::String(_) => {
            let max = super::as_usize(v).context("invalid max attempts value")?;
            policy.set_max_attempts(max);
        }
        _ => return Err(anyhow!("invalid yaml value type for retry policy")),
    }
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn full_map() {
        let doc = yaml_doc!("initial-delay: 500ms\nstep: 1s\nmax-attempts: 5");
        let policy = as_retry_policy(&doc).unwrap();
        assert_eq!(
            policy,
            RetryPolicy::new(Duration::from_millis(500), Duration::from_secs(1), 5)
        );
    }

    #[test]
    fn partial() {
        let doc = yaml_doc!("max_attempts: 0");
        let policy = as_retry_policy(&doc).unwrap();
        assert_eq!(policy.max_attempts(), 0);
        assert_eq!(policy.initial_delay(), Duration::from_secs(1));

        let policy = as_retry_policy(&Yaml::Integer(7)).unwrap();
        assert_eq!(policy.max_attempts(), 7);
    }

    #[test]
    fn invalid() {
        let doc = yaml_doc!("backoff: exponential");
        assert!(as_retry_policy(&doc).is_err());
        assert!(as_retry_policy(&Yaml::Boolean(false)).is_err());
    }
}
