/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::ValidationError;

mod metric;
pub use metric::{Metric, MetricKind, MetricValue};

pub mod codec;
