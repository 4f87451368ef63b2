// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ConfigError;
use crate::sections::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Fails if a global
/// subscriber has already been installed.
pub fn init_tracing(logging: &LoggingConfig) -> Result<(), ConfigError> {
	let filter =
		EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level)).map_err(
			|e| ConfigError::InvalidValue {
				key: "logging.level".to_string(),
				message: e.to_string(),
			},
		)?;

	let registry = tracing_subscriber::registry().with(filter);
	let result = match logging.format {
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
		LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
		LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
	};

	result.map_err(|e| ConfigError::Tracing(e.to_string()))
}
