// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the Terraformer.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`TERRAFORMER_*`)
//! - Tracing subscriber setup driven by the logging section
//!
//! # Usage
//!
//! ```ignore
//! use terraformer_config::{init_tracing, load_config};
//!
//! let config = load_config()?;
//! init_tracing(&config.logging)?;
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;
pub mod telemetry;

pub use error::ConfigError;
pub use layer::TerraformerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};
pub use telemetry::init_tracing;

use tracing::{debug, info};

/// Fully resolved Terraformer configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerraformerConfig {
	pub runner: RunnerConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`TERRAFORMER_*`)
/// 2. Config file (`/etc/terraformer/config.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<TerraformerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<TerraformerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<TerraformerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = TerraformerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: TerraformerConfigLayer) -> Result<TerraformerConfig, ConfigError> {
	let runner = layer.runner.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	runner.validate()?;

	info!(
		image = %runner.image,
		poll_interval_secs = runner.poll_interval_secs,
		job_timeout_secs = runner.job_timeout_secs,
		log_format = ?logging.format,
		"Terraformer configuration loaded"
	);

	Ok(TerraformerConfig { runner, logging })
}
