// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runner configuration section: workload image and wait ceilings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_IMAGE: &str = "eu.gcr.io/gardener-project/gardener/terraformer:latest";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "terraformer";

/// Runner configuration layer (for merging).
///
/// All fields are optional to support layered configuration from
/// multiple sources (defaults, files, environment).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfigLayer {
	pub image: Option<String>,
	pub service_account: Option<String>,
	pub poll_interval_secs: Option<u64>,
	pub prepare_timeout_secs: Option<u64>,
	pub clean_environment_timeout_secs: Option<u64>,
	pub validation_timeout_secs: Option<u64>,
	pub job_timeout_secs: Option<u64>,
	pub define_config_timeout_secs: Option<u64>,
	pub job_backoff_limit: Option<i32>,
	pub delete_grace_period_secs: Option<u32>,
}

impl RunnerConfigLayer {
	/// Merges another layer on top of this one.
	/// Values from `other` take precedence when present.
	pub fn merge(&mut self, other: Self) {
		if other.image.is_some() {
			self.image = other.image;
		}
		if other.service_account.is_some() {
			self.service_account = other.service_account;
		}
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.prepare_timeout_secs.is_some() {
			self.prepare_timeout_secs = other.prepare_timeout_secs;
		}
		if other.clean_environment_timeout_secs.is_some() {
			self.clean_environment_timeout_secs = other.clean_environment_timeout_secs;
		}
		if other.validation_timeout_secs.is_some() {
			self.validation_timeout_secs = other.validation_timeout_secs;
		}
		if other.job_timeout_secs.is_some() {
			self.job_timeout_secs = other.job_timeout_secs;
		}
		if other.define_config_timeout_secs.is_some() {
			self.define_config_timeout_secs = other.define_config_timeout_secs;
		}
		if other.job_backoff_limit.is_some() {
			self.job_backoff_limit = other.job_backoff_limit;
		}
		if other.delete_grace_period_secs.is_some() {
			self.delete_grace_period_secs = other.delete_grace_period_secs;
		}
	}

	pub fn finalize(self) -> RunnerConfig {
		let defaults = RunnerConfig::default();
		RunnerConfig {
			image: self.image.unwrap_or(defaults.image),
			service_account: self.service_account.unwrap_or(defaults.service_account),
			poll_interval_secs: self.poll_interval_secs.unwrap_or(defaults.poll_interval_secs),
			prepare_timeout_secs: self
				.prepare_timeout_secs
				.unwrap_or(defaults.prepare_timeout_secs),
			clean_environment_timeout_secs: self
				.clean_environment_timeout_secs
				.unwrap_or(defaults.clean_environment_timeout_secs),
			validation_timeout_secs: self
				.validation_timeout_secs
				.unwrap_or(defaults.validation_timeout_secs),
			job_timeout_secs: self.job_timeout_secs.unwrap_or(defaults.job_timeout_secs),
			define_config_timeout_secs: self
				.define_config_timeout_secs
				.unwrap_or(defaults.define_config_timeout_secs),
			job_backoff_limit: self.job_backoff_limit.unwrap_or(defaults.job_backoff_limit),
			delete_grace_period_secs: self
				.delete_grace_period_secs
				.unwrap_or(defaults.delete_grace_period_secs),
		}
	}
}

/// Runner configuration (runtime).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerConfig {
	/// Container image running `/terraform.sh`
	pub image: String,
	/// Service account the validation pod and job run as
	pub service_account: String,
	/// Interval between checks of every wait loop
	pub poll_interval_secs: u64,
	/// Ceiling for waiting until the durable artifacts are consistent
	pub prepare_timeout_secs: u64,
	/// Ceiling for waiting until leftovers of a previous run are gone
	pub clean_environment_timeout_secs: u64,
	/// Ceiling for the validation pod to terminate
	pub validation_timeout_secs: u64,
	/// Ceiling for the execution job to complete
	pub job_timeout_secs: u64,
	/// Ceiling for rendering and applying the bundle
	pub define_config_timeout_secs: u64,
	pub job_backoff_limit: i32,
	pub delete_grace_period_secs: u32,
}

impl Default for RunnerConfig {
	fn default() -> Self {
		Self {
			image: DEFAULT_IMAGE.to_string(),
			service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
			poll_interval_secs: 5,
			prepare_timeout_secs: 30,
			clean_environment_timeout_secs: 120, // 2 minutes
			validation_timeout_secs: 600,        // 10 minutes
			job_timeout_secs: 3600,              // 1 hour
			define_config_timeout_secs: 60,
			job_backoff_limit: 0,
			delete_grace_period_secs: 0,
		}
	}
}

impl RunnerConfig {
	/// Every wait needs a non-zero interval and must fit at least one interval.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.poll_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"runner.poll_interval_secs must be greater than zero".to_string(),
			));
		}

		let ceilings = [
			("prepare_timeout_secs", self.prepare_timeout_secs),
			(
				"clean_environment_timeout_secs",
				self.clean_environment_timeout_secs,
			),
			("validation_timeout_secs", self.validation_timeout_secs),
			("job_timeout_secs", self.job_timeout_secs),
			("define_config_timeout_secs", self.define_config_timeout_secs),
		];
		for (key, value) in ceilings {
			if value < self.poll_interval_secs {
				return Err(ConfigError::Validation(format!(
					"runner.{key} ({value}s) is shorter than runner.poll_interval_secs ({}s)",
					self.poll_interval_secs
				)));
			}
		}

		if self.job_backoff_limit < 0 {
			return Err(ConfigError::InvalidValue {
				key: "runner.job_backoff_limit".to_string(),
				message: format!("must not be negative, got {}", self.job_backoff_limit),
			});
		}

		Ok(())
	}
}
