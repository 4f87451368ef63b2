// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for the Terraformer.

pub mod logging;
pub mod runner;

pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use runner::{RunnerConfig, RunnerConfigLayer};
