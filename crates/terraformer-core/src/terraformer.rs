// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The Terraformer handle and its two supervised-run entry points.

use std::sync::Arc;

use terraformer_k8s::{EnvVar, K8sClient};
use tracing::instrument;

use crate::config::ExecutorConfig;
use crate::error::{Result, TerraformerError};
use crate::extractor::{ErrorExtractor, TerraformErrorExtractor};
use crate::manifests::Script;
use crate::names::{Owner, ResourceNames};
use crate::renderer::BundleRenderer;

/// Handle for running Terraform on behalf of one (owner, purpose) pair.
///
/// A handle holds no durable state of its own. Everything a run needs to
/// resume lives in the config, variables and state artifacts, so handles are
/// cheap to build per call and safe to discard afterwards.
pub struct Terraformer {
	pub(crate) client: Arc<dyn K8sClient>,
	pub(crate) renderer: Arc<dyn BundleRenderer>,
	pub(crate) extractor: Arc<dyn ErrorExtractor>,
	pub(crate) config: ExecutorConfig,
	pub(crate) owner: Owner,
	pub(crate) purpose: String,
	pub(crate) names: ResourceNames,
	pub(crate) variables_environment: Option<Vec<EnvVar>>,
	pub(crate) configuration_defined: bool,
}

impl Terraformer {
	pub fn new(
		client: Arc<dyn K8sClient>,
		renderer: Arc<dyn BundleRenderer>,
		owner: Owner,
		purpose: impl Into<String>,
	) -> Self {
		let purpose = purpose.into();
		let names = ResourceNames::new(&owner.name, &purpose);
		Self {
			client,
			renderer,
			extractor: Arc::new(TerraformErrorExtractor),
			config: ExecutorConfig::default(),
			owner,
			purpose,
			names,
			variables_environment: None,
			configuration_defined: false,
		}
	}

	pub fn with_config(mut self, config: ExecutorConfig) -> Self {
		self.config = config;
		self
	}

	/// Replace the Terraform log parser, e.g. for a different IaC back-end.
	pub fn with_error_extractor(mut self, extractor: Arc<dyn ErrorExtractor>) -> Self {
		self.extractor = extractor;
		self
	}

	/// Set the environment handed to the Terraform container. Required before
	/// [`apply`](Self::apply) or [`destroy`](Self::destroy); an empty list is
	/// a valid environment.
	pub fn set_variables_environment(&mut self, environment: Vec<EnvVar>) -> &mut Self {
		self.variables_environment = Some(environment);
		self
	}

	pub fn names(&self) -> &ResourceNames {
		&self.names
	}

	pub fn owner(&self) -> &Owner {
		&self.owner
	}

	pub fn purpose(&self) -> &str {
		&self.purpose
	}

	pub fn namespace(&self) -> &str {
		&self.owner.namespace
	}

	pub fn config(&self) -> &ExecutorConfig {
		&self.config
	}

	pub fn is_configuration_defined(&self) -> bool {
		self.configuration_defined
	}

	/// Create or update the infrastructure described by the configuration.
	///
	/// Fails with [`TerraformerError::ConfigurationNotDefined`] unless
	/// [`define_config`](Self::define_config) succeeded on this handle.
	#[instrument(skip(self), fields(owner = %self.owner, purpose = %self.purpose))]
	pub async fn apply(&self) -> Result<()> {
		if !self.configuration_defined {
			return Err(TerraformerError::ConfigurationNotDefined);
		}
		self.execute(Script::Apply).await
	}

	/// Tear down the infrastructure and, once that succeeded, remove the
	/// config, variables and state artifacts.
	#[instrument(skip(self), fields(owner = %self.owner, purpose = %self.purpose))]
	pub async fn destroy(&self) -> Result<()> {
		self.execute(Script::Destroy).await?;
		self.cleanup_configuration().await
	}
}

impl std::fmt::Debug for Terraformer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Terraformer")
			.field("owner", &self.owner)
			.field("purpose", &self.purpose)
			.field("names", &self.names)
			.field("configuration_defined", &self.configuration_defined)
			.finish_non_exhaustive()
	}
}
