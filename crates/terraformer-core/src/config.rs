// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Executor configuration.

use std::time::Duration;

use terraformer_config::RunnerConfig;

use crate::poll::PollConfig;

/// Configuration for a Terraformer run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
	/// Image of the validation pod and execution job
	pub image: String,
	/// Service account both workloads run as
	pub service_account: String,
	/// Interval between checks of every wait loop
	pub poll_interval: Duration,
	/// How long to wait for the durable artifacts to become consistent
	pub prepare_timeout: Duration,
	/// How long to wait for leftovers of a previous run to disappear
	pub clean_environment_timeout: Duration,
	/// How long to wait for the validation pod to terminate
	pub validation_timeout: Duration,
	/// How long to wait for the execution job to complete
	pub job_timeout: Duration,
	/// How long to keep retrying the bundle render
	pub define_config_timeout: Duration,
	pub job_backoff_limit: i32,
	pub delete_grace_period_secs: u32,
}

impl Default for ExecutorConfig {
	fn default() -> Self {
		Self::from(&RunnerConfig::default())
	}
}

impl From<&RunnerConfig> for ExecutorConfig {
	fn from(runner: &RunnerConfig) -> Self {
		Self {
			image: runner.image.clone(),
			service_account: runner.service_account.clone(),
			poll_interval: Duration::from_secs(runner.poll_interval_secs),
			prepare_timeout: Duration::from_secs(runner.prepare_timeout_secs),
			clean_environment_timeout: Duration::from_secs(runner.clean_environment_timeout_secs),
			validation_timeout: Duration::from_secs(runner.validation_timeout_secs),
			job_timeout: Duration::from_secs(runner.job_timeout_secs),
			define_config_timeout: Duration::from_secs(runner.define_config_timeout_secs),
			job_backoff_limit: runner.job_backoff_limit,
			delete_grace_period_secs: runner.delete_grace_period_secs,
		}
	}
}

impl ExecutorConfig {
	/// Fixed-interval wait bounded by `timeout`.
	pub fn poll(&self, timeout: Duration) -> PollConfig {
		PollConfig::fixed(self.poll_interval, timeout)
	}

	/// Backing-off wait used when re-applying the bundle after transient failures.
	pub fn render_retry(&self) -> PollConfig {
		PollConfig::fixed(self.poll_interval, self.define_config_timeout)
			.with_backoff(2.0, self.poll_interval * 4)
			.with_jitter()
	}
}
