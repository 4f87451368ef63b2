// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only queries of the State artifact.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{Result, TerraformerError};
use crate::terraformer::Terraformer;

/// Data key of the State ConfigMap holding the Terraform state document.
pub const STATE_KEY: &str = "terraform.tfstate";

const ROOT_MODULE: &str = "root";

#[derive(Debug, Deserialize)]
struct StateDocument {
	#[serde(default)]
	outputs: Option<HashMap<String, OutputValue>>,
	#[serde(default)]
	modules: Vec<ModuleState>,
}

#[derive(Debug, Deserialize)]
struct ModuleState {
	#[serde(default)]
	path: Vec<String>,
	#[serde(default)]
	outputs: HashMap<String, OutputValue>,
}

#[derive(Debug, Deserialize)]
struct OutputValue {
	value: Value,
}

impl Terraformer {
	/// Content of the State artifact; empty when the artifact holds no state.
	#[instrument(skip(self), fields(owner = %self.owner, purpose = %self.purpose))]
	pub async fn get_state(&self) -> Result<String> {
		let config_map = self
			.client
			.get_config_map(&self.names.state, self.namespace())
			.await?;

		Ok(config_map
			.data
			.and_then(|mut data| data.remove(STATE_KEY))
			.unwrap_or_default())
	}

	/// Whether nothing has been applied yet. A missing State artifact counts
	/// as empty.
	pub async fn is_state_empty(&self) -> Result<bool> {
		match self.get_state().await {
			Ok(state) => Ok(state.is_empty()),
			Err(TerraformerError::K8s(e)) if e.is_not_found() => {
				debug!(state = %self.names.state, "state artifact not found");
				Ok(true)
			}
			Err(e) => Err(e),
		}
	}

	/// Values of the named root-module outputs recorded in the State artifact.
	pub async fn get_state_output_variables(
		&self,
		variables: &[&str],
	) -> Result<BTreeMap<String, String>> {
		let state = self.get_state().await?;
		parse_output_variables(&state, variables)
	}
}

/// Extract the named outputs from a state document of either the v3 layout
/// (`modules[path=[root]].outputs`) or the v4 layout (top-level `outputs`).
///
/// String values are returned verbatim, anything else as compact JSON.
pub fn parse_output_variables(
	state: &str,
	variables: &[&str],
) -> Result<BTreeMap<String, String>> {
	let mut found = BTreeMap::new();
	let mut missing = Vec::new();

	let outputs = if state.trim().is_empty() {
		HashMap::new()
	} else {
		root_outputs(serde_json::from_str(state)?)
	};

	for name in variables {
		match outputs.get(*name) {
			Some(output) => {
				let value = match &output.value {
					Value::String(s) => s.clone(),
					other => other.to_string(),
				};
				found.insert(name.to_string(), value);
			}
			None => missing.push(name.to_string()),
		}
	}

	if !missing.is_empty() {
		return Err(TerraformerError::MissingOutputVariables(missing));
	}
	Ok(found)
}

fn root_outputs(document: StateDocument) -> HashMap<String, OutputValue> {
	if let Some(outputs) = document.outputs {
		return outputs;
	}
	document
		.modules
		.into_iter()
		.find(|m| m.path.len() == 1 && m.path[0] == ROOT_MODULE)
		.map(|m| m.outputs)
		.unwrap_or_default()
}
