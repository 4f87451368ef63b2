// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use kube::{
	api::{Api, DeleteParams, ListParams, LogParams, PostParams},
	Client,
};
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{ConfigMap, Job, LogOptions, Pod, Secret};

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	/// Wrap an already configured kube client.
	pub fn from_client(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn get_config_map(&self, name: &str, namespace: &str) -> Result<ConfigMap, K8sError> {
		let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
		config_maps
			.get(name)
			.await
			.map_err(|e| K8sError::from_kube(e, "ConfigMap", name))
	}

	async fn create_config_map(
		&self,
		namespace: &str,
		config_map: ConfigMap,
	) -> Result<ConfigMap, K8sError> {
		let name = config_map.metadata.name.clone().unwrap_or_default();
		let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
		config_maps
			.create(&PostParams::default(), &config_map)
			.await
			.map_err(|e| K8sError::from_kube(e, "ConfigMap", &name))
	}

	async fn delete_config_map(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
		config_maps
			.delete(name, &DeleteParams::default())
			.await
			.map(|_| ())
			.map_err(|e| K8sError::from_kube(e, "ConfigMap", name))
	}

	async fn get_secret(&self, name: &str, namespace: &str) -> Result<Secret, K8sError> {
		let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
		secrets
			.get(name)
			.await
			.map_err(|e| K8sError::from_kube(e, "Secret", name))
	}

	async fn delete_secret(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
		secrets
			.delete(name, &DeleteParams::default())
			.await
			.map(|_| ())
			.map_err(|e| K8sError::from_kube(e, "Secret", name))
	}

	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		pods
			.create(&PostParams::default(), &pod)
			.await
			.map_err(|e| K8sError::from_kube(e, "Pod", &name))
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		pods
			.get(name)
			.await
			.map_err(|e| K8sError::from_kube(e, "Pod", name))
	}

	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let dp = DeleteParams {
			grace_period_seconds: Some(grace_period_seconds),
			..Default::default()
		};
		pods
			.delete(name, &dp)
			.await
			.map(|_| ())
			.map_err(|e| K8sError::from_kube(e, "Pod", name))
	}

	async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let lp = ListParams::default().labels(label_selector);
		let pod_list = pods.list(&lp).await?;
		Ok(pod_list.items)
	}

	async fn create_job(&self, namespace: &str, job: Job) -> Result<Job, K8sError> {
		let name = job.metadata.name.clone().unwrap_or_default();
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		jobs
			.create(&PostParams::default(), &job)
			.await
			.map_err(|e| K8sError::from_kube(e, "Job", &name))
	}

	async fn get_job(&self, name: &str, namespace: &str) -> Result<Job, K8sError> {
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		jobs
			.get(name)
			.await
			.map_err(|e| K8sError::from_kube(e, "Job", name))
	}

	async fn delete_job(&self, name: &str, namespace: &str) -> Result<(), K8sError> {
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		jobs
			.delete(name, &DeleteParams::background())
			.await
			.map(|_| ())
			.map_err(|e| K8sError::from_kube(e, "Job", name))
	}

	async fn list_jobs(&self, namespace: &str, label_selector: &str) -> Result<Vec<Job>, K8sError> {
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		let lp = ListParams::default().labels(label_selector);
		let job_list = jobs.list(&lp).await?;
		Ok(job_list.items)
	}

	#[instrument(skip(self, opts), fields(container = ?opts.container))]
	async fn pod_logs(
		&self,
		name: &str,
		namespace: &str,
		opts: LogOptions,
	) -> Result<String, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let lp = LogParams {
			container: opts.container,
			..Default::default()
		};

		pods.logs(name, &lp).await.map_err(|e| match e {
			kube::Error::Api(ref err) if err.code == 404 => K8sError::NotFound {
				kind: "Pod",
				name: name.into(),
			},
			_ => K8sError::LogError {
				name: name.into(),
				message: e.to_string(),
			},
		})
	}
}
