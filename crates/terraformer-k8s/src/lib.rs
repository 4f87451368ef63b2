// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s object-store client abstraction for the Terraformer.
//!
//! This crate provides:
//! - A trait-based client over the handful of object kinds a Terraform run
//!   touches (ConfigMaps, Secrets, Pods, Jobs) for testability
//! - Production implementation using the kube crate
//! - An error taxonomy that keeps "not found" and "already exists" distinct

mod client;
mod error;
mod kube_client;
mod types;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::KubeClient;
pub use types::{
	ConfigMap, ConfigMapVolumeSource, Container, ContainerState, ContainerStateTerminated,
	ContainerStatus, EnvVar, EnvVarSource, Job, JobCondition, JobSpec, JobStatus, LogOptions,
	ObjectMeta, Pod, PodSpec, PodStatus, PodTemplateSpec, Secret, SecretKeySelector,
	SecretVolumeSource, Volume, VolumeMount,
};
