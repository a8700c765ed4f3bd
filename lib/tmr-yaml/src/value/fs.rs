/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use yaml_rust::Yaml;

/// A path that may not exist yet. Relative paths are resolved against
/// `lookup_dir` when it is given.
pub fn as_path(v: &Yaml, lookup_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let Yaml::String(s) = v else {
        return Err(anyhow!("yaml value type for path should be string"));
    };
    if s.is_empty() {
        return Err(anyhow!("empty path"));
    }
    let path = PathBuf::from(s);
    match lookup_dir {
        Some(dir) if path.is_relative() => Ok(dir.join(path)),
        _ => Ok(path),
    }
}
