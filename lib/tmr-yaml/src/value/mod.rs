/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod fs;
mod primary;
mod retry;

pub use fs::as_path;
pub use primary::{as_bool, as_nonzero_usize, as_string, as_u64, as_usize};
pub use retry::as_retry_policy;
