// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Terraformer error types.

use std::time::Duration;

use terraformer_k8s::K8sError;

use crate::poll::PollError;
use crate::renderer::RenderError;

pub type Result<T> = std::result::Result<T, TerraformerError>;

const EXECUTION_FAILED: &str = "Terraform execution job could not be completed.";

/// Errors that can occur while defining, running or cleaning up a Terraform run.
#[derive(Debug, thiserror::Error)]
pub enum TerraformerError {
	/// `execute` was reached without a variables environment
	#[error("no Terraform variables environment provided")]
	MissingVariablesEnvironment,

	/// `apply` was called before a successful `define_config`
	#[error("Terraformer configuration has not been defined, cannot execute the Terraform scripts")]
	ConfigurationNotDefined,

	/// Some, but not all, durable artifacts exist
	#[error("{missing}/{total} terraform resources are missing")]
	InconsistentResources { missing: usize, total: usize },

	/// A bounded wait expired
	#[error("timed out after {timeout:?} waiting for {what}{}", last_error_suffix(.last_error))]
	Timeout {
		what: String,
		timeout: Duration,
		last_error: Option<String>,
	},

	/// The bundle could not be rendered or applied
	#[error("could not apply bundle '{bundle}': {source}")]
	Bundle {
		bundle: String,
		#[source]
		source: RenderError,
	},

	/// Creating the validation pod or execution job failed
	#[error("failed to deploy the Terraform {kind}: {source}")]
	Deploy {
		kind: &'static str,
		#[source]
		source: K8sError,
	},

	/// The run finished unsuccessfully
	#[error("{}", render_execution_failure(.errors))]
	ExecutionFailed { errors: Vec<String> },

	/// The state does not define every requested output
	#[error("Terraform state is missing output variables: {}", .0.join(", "))]
	MissingOutputVariables(Vec<String>),

	/// The state content is not a Terraform state document
	#[error("could not parse Terraform state: {0}")]
	InvalidState(#[from] serde_json::Error),

	/// Kubernetes error
	#[error(transparent)]
	K8s(#[from] K8sError),
}

impl TerraformerError {
	/// Whether re-invoking the same operation may succeed without caller
	/// intervention. Configuration errors and execution failures never are.
	pub fn is_retryable(&self) -> bool {
		match self {
			TerraformerError::MissingVariablesEnvironment
			| TerraformerError::ConfigurationNotDefined
			| TerraformerError::ExecutionFailed { .. }
			| TerraformerError::MissingOutputVariables(_)
			| TerraformerError::InvalidState(_) => false,
			TerraformerError::Bundle { source, .. } => source.is_transient(),
			TerraformerError::InconsistentResources { .. }
			| TerraformerError::Timeout { .. }
			| TerraformerError::Deploy { .. }
			| TerraformerError::K8s(_) => true,
		}
	}
}

impl From<PollError<TerraformerError>> for TerraformerError {
	fn from(err: PollError<TerraformerError>) -> Self {
		match err {
			PollError::Aborted(e) => e,
			PollError::Timeout {
				what,
				timeout,
				last_error,
			} => TerraformerError::Timeout {
				what,
				timeout,
				last_error: last_error.map(|e| e.to_string()),
			},
		}
	}
}

fn last_error_suffix(last_error: &Option<String>) -> String {
	match last_error {
		Some(e) => format!(" (last error: {e})"),
		None => String::new(),
	}
}

fn render_execution_failure(errors: &[String]) -> String {
	if errors.is_empty() {
		return EXECUTION_FAILED.to_string();
	}
	format!(
		"{EXECUTION_FAILED} The following issues have been found in the logs:\n\n{}",
		errors.join("\n\n")
	)
}
