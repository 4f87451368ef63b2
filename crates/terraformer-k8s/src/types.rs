// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

pub use k8s_openapi::api::batch::v1::{Job, JobCondition, JobSpec, JobStatus};
pub use k8s_openapi::api::core::v1::{
	ConfigMap, ConfigMapVolumeSource, Container, ContainerState, ContainerStateTerminated,
	ContainerStatus, EnvVar, EnvVarSource, Pod, PodSpec, PodStatus, PodTemplateSpec, Secret,
	SecretKeySelector, SecretVolumeSource, Volume, VolumeMount,
};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Options for fetching container logs.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
	/// Container to read from; the pod's only container when unset.
	pub container: Option<String>,
}
