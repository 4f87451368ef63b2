// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Manifests of the validation pod and the execution job.

use std::collections::BTreeMap;
use std::fmt;

use terraformer_k8s::{
	ConfigMapVolumeSource, Container, EnvVar, Job, JobSpec, ObjectMeta, Pod, PodSpec,
	PodTemplateSpec, SecretVolumeSource, Volume, VolumeMount,
};

use crate::config::ExecutorConfig;
use crate::names::{ResourceNames, JOB_NAME_LABEL};

pub const CONTAINER_NAME: &str = "terraform";
pub const MANAGED_LABEL: &str = "terraformer.dev/managed";
pub const PURPOSE_LABEL: &str = "terraformer.dev/purpose";
pub const SCRIPT_ANNOTATION: &str = "terraformer.dev/script";

const ENTRYPOINT: &str = "/terraform.sh";
const VOLUME_CONFIG: &str = "tf";
const VOLUME_VARIABLES: &str = "tfvars";
const VOLUME_STATE: &str = "tfstate";
const PATH_CONFIG: &str = "/tf";
const PATH_VARIABLES: &str = "/tfvars";
const PATH_STATE: &str = "/tf-state-in";

/// Script the Terraform container runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
	Validate,
	Apply,
	Destroy,
}

impl Script {
	pub fn as_str(&self) -> &'static str {
		match self {
			Script::Validate => "validate",
			Script::Apply => "apply",
			Script::Destroy => "destroy",
		}
	}
}

impl fmt::Display for Script {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Everything a workload manifest is built from.
pub(crate) struct WorkloadContext<'a> {
	pub names: &'a ResourceNames,
	pub namespace: &'a str,
	pub purpose: &'a str,
	pub environment: &'a [EnvVar],
	pub config: &'a ExecutorConfig,
}

/// Build the pod running `terraform plan` for drift detection.
pub(crate) fn build_validation_pod(ctx: &WorkloadContext<'_>) -> Pod {
	Pod {
		metadata: build_metadata(ctx, &ctx.names.pod, Script::Validate),
		spec: Some(build_pod_spec(ctx, Script::Validate)),
		status: None,
	}
}

/// Build the job running `script` against the configuration.
pub(crate) fn build_job(ctx: &WorkloadContext<'_>, script: Script) -> Job {
	let metadata = build_metadata(ctx, &ctx.names.job, script);
	let template_metadata = ObjectMeta {
		labels: metadata.labels.clone(),
		annotations: metadata.annotations.clone(),
		..Default::default()
	};

	Job {
		metadata,
		spec: Some(JobSpec {
			backoff_limit: Some(ctx.config.job_backoff_limit),
			template: PodTemplateSpec {
				metadata: Some(template_metadata),
				spec: Some(build_pod_spec(ctx, script)),
			},
			..Default::default()
		}),
		status: None,
	}
}

fn build_metadata(ctx: &WorkloadContext<'_>, name: &str, script: Script) -> ObjectMeta {
	let labels = BTreeMap::from([
		(JOB_NAME_LABEL.to_string(), ctx.names.job.clone()),
		(PURPOSE_LABEL.to_string(), ctx.purpose.to_string()),
		(MANAGED_LABEL.to_string(), "true".to_string()),
	]);
	let annotations = BTreeMap::from([(SCRIPT_ANNOTATION.to_string(), script.to_string())]);

	ObjectMeta {
		name: Some(name.to_string()),
		namespace: Some(ctx.namespace.to_string()),
		labels: Some(labels),
		annotations: Some(annotations),
		..Default::default()
	}
}

fn build_pod_spec(ctx: &WorkloadContext<'_>, script: Script) -> PodSpec {
	let mut env: Vec<EnvVar> = ctx.environment.to_vec();
	env.extend([
		plain_env("TF_CONFIGURATION_CONFIG_MAP_NAME", &ctx.names.config),
		plain_env("TF_STATE_CONFIG_MAP_NAME", &ctx.names.state),
		plain_env("TF_VARIABLES_SECRET_NAME", &ctx.names.variables),
	]);

	let container = Container {
		name: CONTAINER_NAME.to_string(),
		image: Some(ctx.config.image.clone()),
		image_pull_policy: Some("IfNotPresent".to_string()),
		command: Some(vec![ENTRYPOINT.to_string(), script.to_string()]),
		env: Some(env),
		volume_mounts: Some(vec![
			volume_mount(VOLUME_CONFIG, PATH_CONFIG),
			volume_mount(VOLUME_VARIABLES, PATH_VARIABLES),
			volume_mount(VOLUME_STATE, PATH_STATE),
		]),
		..Default::default()
	};

	PodSpec {
		containers: vec![container],
		restart_policy: Some("Never".to_string()),
		service_account_name: Some(ctx.config.service_account.clone()),
		termination_grace_period_seconds: Some(i64::from(ctx.config.delete_grace_period_secs)),
		volumes: Some(vec![
			Volume {
				name: VOLUME_CONFIG.to_string(),
				config_map: Some(ConfigMapVolumeSource {
					name: ctx.names.config.clone(),
					..Default::default()
				}),
				..Default::default()
			},
			Volume {
				name: VOLUME_VARIABLES.to_string(),
				secret: Some(SecretVolumeSource {
					secret_name: Some(ctx.names.variables.clone()),
					..Default::default()
				}),
				..Default::default()
			},
			Volume {
				name: VOLUME_STATE.to_string(),
				config_map: Some(ConfigMapVolumeSource {
					name: ctx.names.state.clone(),
					..Default::default()
				}),
				..Default::default()
			},
		]),
		..Default::default()
	}
}

fn plain_env(name: &str, value: &str) -> EnvVar {
	EnvVar {
		name: name.to_string(),
		value: Some(value.to_string()),
		value_from: None,
	}
}

fn volume_mount(name: &str, path: &str) -> VolumeMount {
	VolumeMount {
		name: name.to_string(),
		mount_path: path.to_string(),
		..Default::default()
	}
}
