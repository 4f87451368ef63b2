// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Supervised Terraform runs coordinated through cluster objects.
//!
//! A [`Terraformer`] is scoped to an owner and a purpose. It persists three
//! durable artifacts (config, variables, state) through a [`BundleRenderer`],
//! then runs a validation pod and an execution job against them:
//!
//! ```text
//! define_config -> apply | destroy
//!                    prepare -> validate -> execute -> collect logs -> clean up
//! ```
//!
//! All state lives in the cluster, so a fresh handle for the same
//! (owner, purpose) resumes wherever a previous one stopped.

mod cleaner;
mod config;
mod definer;
mod environment;
mod error;
mod executor;
mod extractor;
mod manifests;
mod names;
mod poll;
mod preparer;
mod renderer;
mod state;
mod terraformer;

pub use config::ExecutorConfig;
pub use definer::{INITIALIZE_EMPTY_STATE_KEY, NAMES_KEY};
pub use environment::generate_variables_environment;
pub use error::{Result, TerraformerError};
pub use executor::{Phase, PrepareOutcome, SkipPlan, ValidationOutcome};
pub use extractor::{
	find_terraform_errors, retrieve_terraform_errors, ErrorExtractor, TerraformErrorExtractor,
};
pub use manifests::{Script, CONTAINER_NAME, MANAGED_LABEL, PURPOSE_LABEL, SCRIPT_ANNOTATION};
pub use names::{Owner, ResourceNames, JOB_NAME_LABEL};
pub use poll::{poll_until, Attempt, PollConfig, PollError};
pub use preparer::DURABLE_ARTIFACTS;
pub use renderer::{BundleRenderer, RenderError};
pub use state::{parse_output_variables, STATE_KEY};
pub use terraformer::Terraformer;
