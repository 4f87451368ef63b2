// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{ConfigMap, Job, LogOptions, Pod, Secret};

/// Trait for K8s client operations.
///
/// This abstraction allows for easy mocking in tests while providing
/// a clean interface for the object-store operations needed by the
/// Terraformer. Lookups and deletions of missing objects report
/// [`K8sError::NotFound`]; creations of existing objects report
/// [`K8sError::AlreadyExists`].
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// Get a ConfigMap by name from the specified namespace.
	async fn get_config_map(&self, name: &str, namespace: &str) -> Result<ConfigMap, K8sError>;

	/// Create a new ConfigMap in the specified namespace.
	async fn create_config_map(
		&self,
		namespace: &str,
		config_map: ConfigMap,
	) -> Result<ConfigMap, K8sError>;

	/// Delete a ConfigMap by name from the specified namespace.
	async fn delete_config_map(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	/// Get a Secret by name from the specified namespace.
	async fn get_secret(&self, name: &str, namespace: &str) -> Result<Secret, K8sError>;

	/// Delete a Secret by name from the specified namespace.
	async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	/// Create a new pod in the specified namespace.
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError>;

	/// Get a specific pod by name from the specified namespace.
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError>;

	/// Delete a pod by name from the specified namespace.
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError>;

	/// List pods in a namespace matching the given label selector.
	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError>;

	/// Create a new Job in the specified namespace.
	async fn create_job(&self, namespace: &str, job: Job) -> Result<Job, K8sError>;

	/// Get a specific Job by name from the specified namespace.
	async fn get_job(&self, name: &str, namespace: &str) -> Result<Job, K8sError>;

	/// Delete a Job by name, letting the garbage collector remove its pods
	/// in the background.
	async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), K8sError>;

	/// List Jobs in a namespace matching the given label selector.
	async fn list_jobs(&self, namespace: &str, label_selector: &str) -> Result<Vec<Job>, K8sError>;

	/// Fetch the complete log output of a pod's container.
	async fn pod_logs(
		&self,
		name: &str,
		namespace: &str,
		opts: LogOptions,
	) -> Result<String, K8sError>;
}
