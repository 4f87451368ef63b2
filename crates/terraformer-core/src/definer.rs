// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use terraformer_k8s::{ConfigMap, ObjectMeta};
use tracing::instrument;

use crate::error::{Result, TerraformerError};
use crate::manifests::{MANAGED_LABEL, PURPOSE_LABEL};
use crate::names::ResourceNames;
use crate::poll::{poll_until, Attempt};
use crate::terraformer::Terraformer;

/// Value key receiving the derived artifact names.
pub const NAMES_KEY: &str = "names";
/// Value key telling the bundle whether to create an empty State artifact.
pub const INITIALIZE_EMPTY_STATE_KEY: &str = "initializeEmptyState";

impl Terraformer {
	/// Render `bundle` with `values` and apply the config, variables and
	/// state artifacts.
	///
	/// Config and variables are overwritten on every call. The State artifact
	/// is only ever created empty when absent, so repeated calls never lose
	/// recorded state. Transient render and object-store failures are retried
	/// until the configured ceiling.
	#[instrument(skip(self, values), fields(owner = %self.owner, purpose = %self.purpose))]
	pub async fn define_config(&mut self, bundle: &str, values: Map<String, Value>) -> Result<()> {
		let this = &*self;
		let values = &values;
		let state_empty = poll_until(
			&self.config.render_retry(),
			"terraform configuration",
			move || {
				let values = values.clone();
				async move {
					match this.apply_configuration(bundle, values).await {
						Ok(state_empty) => Attempt::Done(state_empty),
						Err(e) if e.is_retryable() => Attempt::Retry(Some(e)),
						Err(e) => Attempt::Abort(e),
					}
				}
			},
		)
		.await?;

		tracing::info!(
			bundle,
			config = %self.names.config,
			initialize_empty_state = state_empty,
			"Defined Terraform configuration"
		);
		self.configuration_defined = true;
		Ok(())
	}

	/// One pass of `define_config`; returns whether the state was empty.
	async fn apply_configuration(&self, bundle: &str, values: Map<String, Value>) -> Result<bool> {
		let state_empty = self.is_state_empty().await?;
		let values = Value::Object(inject_values(values, &self.names, state_empty));

		self.renderer
			.apply(bundle, self.namespace(), &values)
			.await
			.map_err(|source| TerraformerError::Bundle {
				bundle: bundle.to_string(),
				source,
			})?;

		self.ensure_state_artifact().await?;
		Ok(state_empty)
	}

	/// Create the State artifact empty unless it already exists.
	async fn ensure_state_artifact(&self) -> Result<()> {
		match self
			.client
			.get_config_map(&self.names.state, self.namespace())
			.await
		{
			Ok(_) => return Ok(()),
			Err(e) if e.is_not_found() => {}
			Err(e) => return Err(e.into()),
		}

		let labels = BTreeMap::from([
			(PURPOSE_LABEL.to_string(), self.purpose.clone()),
			(MANAGED_LABEL.to_string(), "true".to_string()),
		]);
		let config_map = ConfigMap {
			metadata: ObjectMeta {
				name: Some(self.names.state.clone()),
				namespace: Some(self.namespace().to_string()),
				labels: Some(labels),
				..Default::default()
			},
			..Default::default()
		};

		match self.client.create_config_map(self.namespace(), config_map).await {
			Ok(_) => {
				tracing::info!(state = %self.names.state, "Created empty state artifact");
				Ok(())
			}
			Err(e) if e.is_already_exists() => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// Merge the derived names and the empty-state flag into the caller's values.
/// Injected keys win over caller-supplied keys of the same name.
pub(crate) fn inject_values(
	mut values: Map<String, Value>,
	names: &ResourceNames,
	state_empty: bool,
) -> Map<String, Value> {
	values.insert(
		NAMES_KEY.to_string(),
		json!({
			"configuration": names.config,
			"variables": names.variables,
			"state": names.state,
		}),
	);
	values.insert(
		INITIALIZE_EMPTY_STATE_KEY.to_string(),
		Value::Bool(state_empty),
	);
	values
}
