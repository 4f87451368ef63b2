// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Deterministic names of the objects a run owns.

use std::fmt;

pub const CONFIG_SUFFIX: &str = "tf-config";
pub const VARIABLES_SUFFIX: &str = "tf-vars";
pub const STATE_SUFFIX: &str = "tf-state";
pub const POD_SUFFIX: &str = "tf-pod";
pub const JOB_SUFFIX: &str = "tf-job";

/// Label carrying the job name on the validation pod, the job and the job's pods.
pub const JOB_NAME_LABEL: &str = "job-name";

/// The entity a run is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
	pub name: String,
	pub namespace: String,
}

impl Owner {
	pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			namespace: namespace.into(),
		}
	}
}

impl fmt::Display for Owner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.namespace, self.name)
	}
}

/// The five names derived from `<owner>.<purpose>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
	pub config: String,
	pub variables: String,
	pub state: String,
	pub pod: String,
	pub job: String,
}

impl ResourceNames {
	pub fn new(owner_name: &str, purpose: &str) -> Self {
		let prefix = format!("{owner_name}.{purpose}");
		Self {
			config: format!("{prefix}.{CONFIG_SUFFIX}"),
			variables: format!("{prefix}.{VARIABLES_SUFFIX}"),
			state: format!("{prefix}.{STATE_SUFFIX}"),
			pod: format!("{prefix}.{POD_SUFFIX}"),
			job: format!("{prefix}.{JOB_SUFFIX}"),
		}
	}

	/// Selector matching every workload object of this run.
	pub fn job_selector(&self) -> String {
		format!("{JOB_NAME_LABEL}={}", self.job)
	}
}
