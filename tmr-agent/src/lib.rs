/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod build;
pub mod config;
pub mod deliver;
pub mod dispatch;
pub mod opts;
pub mod sample;
