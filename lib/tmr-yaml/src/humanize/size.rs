/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use humanize_rs::bytes::Bytes;
use yaml_rust::Yaml;

pub fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<Bytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_usize() {
        let v = yaml_str!("16MiB");
        assert_eq!(as_usize(&v).unwrap(), 16 << 20);

        let v = yaml_str!("1K");
        assert_eq!(as_usize(&v).unwrap(), 1000);

        let v = Yaml::Integer(4096);
        assert_eq!(as_usize(&v).unwrap(), 4096);

        let v = Yaml::Integer(-1);
        assert!(as_usize(&v).is_err());
    }
}
