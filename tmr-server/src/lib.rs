/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod api;
pub mod build;
pub mod config;
pub mod opts;
pub mod serve;
pub mod tls;
