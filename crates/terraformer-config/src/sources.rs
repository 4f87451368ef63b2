// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::TerraformerConfigLayer;
use crate::sections::{LogFormat, LoggingConfigLayer, RunnerConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<TerraformerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<TerraformerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(TerraformerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/terraformer/config.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<TerraformerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(TerraformerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: TerraformerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: TERRAFORMER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<TerraformerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from_lookup(|name| std::env::var(name).ok())
	}
}

fn load_from_lookup<F>(lookup: F) -> Result<TerraformerConfigLayer, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let env = EnvReader { lookup };
	Ok(TerraformerConfigLayer {
		runner: Some(RunnerConfigLayer {
			image: env.var("TERRAFORMER_RUNNER_IMAGE"),
			service_account: env.var("TERRAFORMER_RUNNER_SERVICE_ACCOUNT"),
			poll_interval_secs: env.parse("TERRAFORMER_RUNNER_POLL_INTERVAL_SECS")?,
			prepare_timeout_secs: env.parse("TERRAFORMER_RUNNER_PREPARE_TIMEOUT_SECS")?,
			clean_environment_timeout_secs: env
				.parse("TERRAFORMER_RUNNER_CLEAN_ENVIRONMENT_TIMEOUT_SECS")?,
			validation_timeout_secs: env.parse("TERRAFORMER_RUNNER_VALIDATION_TIMEOUT_SECS")?,
			job_timeout_secs: env.parse("TERRAFORMER_RUNNER_JOB_TIMEOUT_SECS")?,
			define_config_timeout_secs: env.parse("TERRAFORMER_RUNNER_DEFINE_CONFIG_TIMEOUT_SECS")?,
			job_backoff_limit: env.parse("TERRAFORMER_RUNNER_JOB_BACKOFF_LIMIT")?,
			delete_grace_period_secs: env.parse("TERRAFORMER_RUNNER_DELETE_GRACE_PERIOD_SECS")?,
		}),
		logging: Some(LoggingConfigLayer {
			level: env.var("TERRAFORMER_LOG_LEVEL"),
			format: env
				.var("TERRAFORMER_LOG_FORMAT")
				.map(|v| v.parse::<LogFormat>())
				.transpose()?,
		}),
	})
}

struct EnvReader<F> {
	lookup: F,
}

impl<F> EnvReader<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
			}),
			None => Ok(None),
		}
	}
}
