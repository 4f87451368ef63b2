// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Variables environment handed to the Terraform container.

use std::collections::BTreeMap;

use terraformer_k8s::{EnvVar, EnvVarSource, SecretKeySelector};

const TF_VAR_PREFIX: &str = "TF_VAR_";

/// Build a variables environment whose values are read from keys of a secret.
///
/// `mapping` maps Terraform variable names to secret keys; each entry becomes
/// `TF_VAR_<variable>` referencing `<secret_name>[<key>]`. Entries are ordered
/// by variable name.
pub fn generate_variables_environment(
	secret_name: &str,
	mapping: &BTreeMap<String, String>,
) -> Vec<EnvVar> {
	mapping
		.iter()
		.map(|(variable, key)| EnvVar {
			name: format!("{TF_VAR_PREFIX}{variable}"),
			value: None,
			value_from: Some(EnvVarSource {
				secret_key_ref: Some(SecretKeySelector {
					name: secret_name.to_string(),
					key: key.clone(),
					optional: Some(false),
				}),
				..Default::default()
			}),
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_entries_reference_secret_keys() {
		let mapping = BTreeMap::from([
			("ACCESS_KEY_ID".to_string(), "accessKeyID".to_string()),
			("SECRET_ACCESS_KEY".to_string(), "secretAccessKey".to_string()),
		]);

		let env = generate_variables_environment("cloudprovider", &mapping);

		assert_eq!(env.len(), 2);
		assert_eq!(env[0].name, "TF_VAR_ACCESS_KEY_ID");
		assert!(env[0].value.is_none());
		let selector = env[0]
			.value_from
			.as_ref()
			.and_then(|v| v.secret_key_ref.as_ref())
			.unwrap();
		assert_eq!(selector.name, "cloudprovider");
		assert_eq!(selector.key, "accessKeyID");
		assert_eq!(env[1].name, "TF_VAR_SECRET_ACCESS_KEY");
	}

	#[test]
	fn test_empty_mapping_is_an_empty_but_present_environment() {
		let env = generate_variables_environment("cloudprovider", &BTreeMap::new());
		assert!(env.is_empty());
	}
}
