// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory cluster and bundle renderer for driving full Terraformer runs.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use terraformer_core::{
	BundleRenderer, ExecutorConfig, Owner, RenderError, Terraformer, INITIALIZE_EMPTY_STATE_KEY,
	NAMES_KEY, STATE_KEY,
};
use terraformer_k8s::{
	ConfigMap, ContainerState, ContainerStateTerminated, ContainerStatus, Job, JobCondition,
	JobStatus, K8sClient, K8sError, LogOptions, ObjectMeta, Pod, PodStatus, Secret,
};

pub const NAMESPACE: &str = "shoot--dev--aws";
pub const OWNER: &str = "aws";
pub const PURPOSE: &str = "infra";
pub const BUNDLE: &str = "aws-infra";

/// How a created Job ends up.
#[derive(Debug, Clone)]
pub enum JobBehavior {
	/// Reports one succeeded run.
	Succeed,
	/// Reports a Failed condition; one pod is created per log.
	Fail { pod_logs: Vec<String> },
	/// Never finishes.
	Hang,
}

pub struct MockK8sClient {
	config_maps: Mutex<BTreeMap<String, ConfigMap>>,
	secrets: Mutex<BTreeMap<String, Secret>>,
	pods: Mutex<BTreeMap<String, Pod>>,
	jobs: Mutex<BTreeMap<String, Job>>,
	logs: Mutex<BTreeMap<String, String>>,
	validation_exit_code: Mutex<Option<i32>>,
	validation_logs: Mutex<String>,
	validation_vanishes: Mutex<bool>,
	job_behavior: Mutex<JobBehavior>,
	fail_delete_of: Mutex<Option<String>>,
	fail_logs: Mutex<bool>,
	config_map_read_failures: AtomicUsize,
	jobs_stuck: Mutex<bool>,
	fail_job_creation: Mutex<bool>,
	pod_listing_down_with_job: Mutex<bool>,
	deletions: Mutex<Vec<String>>,
	pods_created: AtomicUsize,
	jobs_created: AtomicUsize,
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self {
			config_maps: Mutex::new(BTreeMap::new()),
			secrets: Mutex::new(BTreeMap::new()),
			pods: Mutex::new(BTreeMap::new()),
			jobs: Mutex::new(BTreeMap::new()),
			logs: Mutex::new(BTreeMap::new()),
			validation_exit_code: Mutex::new(Some(2)),
			validation_logs: Mutex::new(String::new()),
			validation_vanishes: Mutex::new(false),
			job_behavior: Mutex::new(JobBehavior::Succeed),
			fail_delete_of: Mutex::new(None),
			fail_logs: Mutex::new(false),
			config_map_read_failures: AtomicUsize::new(0),
			jobs_stuck: Mutex::new(false),
			fail_job_creation: Mutex::new(false),
			pod_listing_down_with_job: Mutex::new(false),
			deletions: Mutex::new(Vec::new()),
			pods_created: AtomicUsize::new(0),
			jobs_created: AtomicUsize::new(0),
		}
	}

	/// Exit code the validation pod terminates with; `None` keeps it running.
	pub fn set_validation_exit_code(&self, code: Option<i32>) {
		*self.validation_exit_code.lock().unwrap() = code;
	}

	pub fn set_validation_logs(&self, logs: &str) {
		*self.validation_logs.lock().unwrap() = logs.to_string();
	}

	/// Accept the validation pod but never show it.
	pub fn set_validation_vanishes(&self) {
		*self.validation_vanishes.lock().unwrap() = true;
	}

	pub fn set_job_behavior(&self, behavior: JobBehavior) {
		*self.job_behavior.lock().unwrap() = behavior;
	}

	/// Fail every delete of the object with this name.
	pub fn fail_delete_of(&self, name: &str) {
		*self.fail_delete_of.lock().unwrap() = Some(name.to_string());
	}

	pub fn fail_log_retrieval(&self) {
		*self.fail_logs.lock().unwrap() = true;
	}

	/// Fail the next `n` ConfigMap reads as an unavailable API server would.
	pub fn fail_next_config_map_reads(&self, n: usize) {
		self.config_map_read_failures.store(n, Ordering::SeqCst);
	}

	/// Accept Job deletes but keep the Jobs listed, like a stuck finalizer.
	pub fn set_jobs_stuck(&self) {
		*self.jobs_stuck.lock().unwrap() = true;
	}

	pub fn fail_job_creation(&self) {
		*self.fail_job_creation.lock().unwrap() = true;
	}

	/// Fail pod listings while any Job exists.
	pub fn fail_pod_listing_with_job(&self) {
		*self.pod_listing_down_with_job.lock().unwrap() = true;
	}

	pub fn put_config_map(&self, name: &str, data: BTreeMap<String, String>) {
		let config_map = ConfigMap {
			metadata: meta(name, BTreeMap::new()),
			data: Some(data),
			..Default::default()
		};
		self.config_maps
			.lock()
			.unwrap()
			.insert(name.to_string(), config_map);
	}

	pub fn put_secret(&self, name: &str, data: BTreeMap<String, String>) {
		let secret = Secret {
			metadata: meta(name, BTreeMap::new()),
			string_data: Some(data),
			..Default::default()
		};
		self.secrets.lock().unwrap().insert(name.to_string(), secret);
	}

	pub fn put_pod(&self, name: &str, labels: BTreeMap<String, String>) {
		let pod = Pod {
			metadata: meta(name, labels),
			spec: None,
			status: None,
		};
		self.pods.lock().unwrap().insert(name.to_string(), pod);
	}

	pub fn put_job(&self, name: &str, labels: BTreeMap<String, String>) {
		let job = Job {
			metadata: meta(name, labels),
			spec: None,
			status: None,
		};
		self.jobs.lock().unwrap().insert(name.to_string(), job);
	}

	pub fn remove_config_map(&self, name: &str) {
		self.config_maps.lock().unwrap().remove(name);
	}

	pub fn has_config_map(&self, name: &str) -> bool {
		self.config_maps.lock().unwrap().contains_key(name)
	}

	pub fn has_secret(&self, name: &str) -> bool {
		self.secrets.lock().unwrap().contains_key(name)
	}

	pub fn config_map_data(&self, name: &str) -> Option<BTreeMap<String, String>> {
		self.config_maps
			.lock()
			.unwrap()
			.get(name)
			.map(|cm| cm.data.clone().unwrap_or_default())
	}

	pub fn has_pod(&self, name: &str) -> bool {
		self.pods.lock().unwrap().contains_key(name)
	}

	pub fn pod_count(&self) -> usize {
		self.pods.lock().unwrap().len()
	}

	pub fn job_count(&self) -> usize {
		self.jobs.lock().unwrap().len()
	}

	pub fn pods_created(&self) -> usize {
		self.pods_created.load(Ordering::SeqCst)
	}

	pub fn jobs_created(&self) -> usize {
		self.jobs_created.load(Ordering::SeqCst)
	}

	/// Deletes of durable artifacts in call order, as `Kind/name`.
	pub fn deletions(&self) -> Vec<String> {
		self.deletions.lock().unwrap().clone()
	}

	fn check_delete(&self, kind: &str, name: &str) -> Result<(), K8sError> {
		self.deletions
			.lock()
			.unwrap()
			.push(format!("{kind}/{name}"));
		if self.fail_delete_of.lock().unwrap().as_deref() == Some(name) {
			return Err(K8sError::ApiError {
				message: format!("deleting {kind} {name}: connection reset"),
			});
		}
		Ok(())
	}

	fn create_job_pod(&self, job_name: &str, labels: &BTreeMap<String, String>, logs: &str) {
		let index = self.pods.lock().unwrap().len();
		let name = format!("{job_name}-{index:05}");
		self.put_pod(&name, labels.clone());
		self.logs.lock().unwrap().insert(name, logs.to_string());
	}
}

fn meta(name: &str, labels: BTreeMap<String, String>) -> ObjectMeta {
	ObjectMeta {
		name: Some(name.to_string()),
		namespace: Some(NAMESPACE.to_string()),
		labels: Some(labels),
		..Default::default()
	}
}

fn matches_selector(metadata: &ObjectMeta, selector: &str) -> bool {
	let labels = metadata.labels.clone().unwrap_or_default();
	selector
		.split(',')
		.filter_map(|term| term.split_once('='))
		.all(|(key, value)| labels.get(key).map(String::as_str) == Some(value))
}

fn not_found(kind: &'static str, name: &str) -> K8sError {
	K8sError::NotFound {
		kind,
		name: name.to_string(),
	}
}

fn terminated(code: i32) -> PodStatus {
	PodStatus {
		phase: Some(if code == 0 { "Succeeded" } else { "Failed" }.to_string()),
		container_statuses: Some(vec![ContainerStatus {
			name: terraformer_core::CONTAINER_NAME.to_string(),
			state: Some(ContainerState {
				terminated: Some(ContainerStateTerminated {
					exit_code: code,
					..Default::default()
				}),
				..Default::default()
			}),
			..Default::default()
		}]),
		..Default::default()
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn get_config_map(&self, name: &str, _namespace: &str) -> Result<ConfigMap, K8sError> {
		let pending = self.config_map_read_failures.load(Ordering::SeqCst);
		if pending > 0 {
			self.config_map_read_failures.store(pending - 1, Ordering::SeqCst);
			return Err(K8sError::ApiError {
				message: "etcdserver: leader changed".to_string(),
			});
		}
		self.config_maps
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| not_found("ConfigMap", name))
	}

	async fn create_config_map(
		&self,
		_namespace: &str,
		config_map: ConfigMap,
	) -> Result<ConfigMap, K8sError> {
		let name = config_map.metadata.name.clone().unwrap_or_default();
		let mut config_maps = self.config_maps.lock().unwrap();
		if config_maps.contains_key(&name) {
			return Err(K8sError::AlreadyExists {
				kind: "ConfigMap",
				name,
			});
		}
		config_maps.insert(name, config_map.clone());
		Ok(config_map)
	}

	async fn delete_config_map(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.check_delete("ConfigMap", name)?;
		self.config_maps
			.lock()
			.unwrap()
			.remove(name)
			.map(|_| ())
			.ok_or_else(|| not_found("ConfigMap", name))
	}

	async fn get_secret(&self, name: &str, _namespace: &str) -> Result<Secret, K8sError> {
		self.secrets
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| not_found("Secret", name))
	}

	async fn delete_secret(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		self.check_delete("Secret", name)?;
		self.secrets
			.lock()
			.unwrap()
			.remove(name)
			.map(|_| ())
			.ok_or_else(|| not_found("Secret", name))
	}

	async fn create_pod(&self, _namespace: &str, mut pod: Pod) -> Result<Pod, K8sError> {
		self.pods_created.fetch_add(1, Ordering::SeqCst);
		if *self.validation_vanishes.lock().unwrap() {
			return Ok(pod);
		}

		let name = pod.metadata.name.clone().unwrap_or_default();
		pod.status = match *self.validation_exit_code.lock().unwrap() {
			Some(code) => Some(terminated(code)),
			None => Some(PodStatus {
				phase: Some("Running".to_string()),
				..Default::default()
			}),
		};

		let logs = self.validation_logs.lock().unwrap().clone();
		self.logs.lock().unwrap().insert(name.clone(), logs);
		self.pods.lock().unwrap().insert(name, pod.clone());
		Ok(pod)
	}

	async fn get_pod(&self, name: &str, _namespace: &str) -> Result<Pod, K8sError> {
		self.pods
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| not_found("Pod", name))
	}

	async fn delete_pod(
		&self,
		name: &str,
		_namespace: &str,
		_grace_period_seconds: u32,
	) -> Result<(), K8sError> {
		self.pods
			.lock()
			.unwrap()
			.remove(name)
			.map(|_| ())
			.ok_or_else(|| not_found("Pod", name))
	}

	async fn list_pods(&self, _namespace: &str, label_selector: &str) -> Result<Vec<Pod>, K8sError> {
		if *self.pod_listing_down_with_job.lock().unwrap() && !self.jobs.lock().unwrap().is_empty() {
			return Err(K8sError::ApiError {
				message: "the server was unable to return a response in the time allotted".to_string(),
			});
		}
		let pods = self.pods.lock().unwrap();
		Ok(pods
			.values()
			.filter(|p| matches_selector(&p.metadata, label_selector))
			.cloned()
			.collect())
	}

	async fn create_job(&self, _namespace: &str, mut job: Job) -> Result<Job, K8sError> {
		self.jobs_created.fetch_add(1, Ordering::SeqCst);
		if *self.fail_job_creation.lock().unwrap() {
			return Err(K8sError::ApiError {
				message: "admission webhook denied the request".to_string(),
			});
		}
		let name = job.metadata.name.clone().unwrap_or_default();
		let labels = job
			.spec
			.as_ref()
			.and_then(|s| s.template.metadata.as_ref())
			.and_then(|m| m.labels.clone())
			.unwrap_or_default();

		let behavior = self.job_behavior.lock().unwrap().clone();
		job.status = match behavior {
			JobBehavior::Succeed => {
				self.create_job_pod(&name, &labels, "Apply complete! Resources: 4 added.");
				Some(JobStatus {
					succeeded: Some(1),
					..Default::default()
				})
			}
			JobBehavior::Fail { pod_logs } => {
				for logs in &pod_logs {
					self.create_job_pod(&name, &labels, logs);
				}
				Some(JobStatus {
					succeeded: Some(0),
					failed: Some(pod_logs.len() as i32),
					conditions: Some(vec![JobCondition {
						type_: "Failed".to_string(),
						status: "True".to_string(),
						reason: Some("BackoffLimitExceeded".to_string()),
						..Default::default()
					}]),
					..Default::default()
				})
			}
			JobBehavior::Hang => Some(JobStatus {
				active: Some(1),
				..Default::default()
			}),
		};

		self.jobs.lock().unwrap().insert(name, job.clone());
		Ok(job)
	}

	async fn get_job(&self, name: &str, _namespace: &str) -> Result<Job, K8sError> {
		self.jobs
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| not_found("Job", name))
	}

	async fn delete_job(&self, name: &str, _namespace: &str) -> Result<(), K8sError> {
		if *self.jobs_stuck.lock().unwrap() {
			return Ok(());
		}
		self.jobs
			.lock()
			.unwrap()
			.remove(name)
			.map(|_| ())
			.ok_or_else(|| not_found("Job", name))
	}

	async fn list_jobs(&self, _namespace: &str, label_selector: &str) -> Result<Vec<Job>, K8sError> {
		let jobs = self.jobs.lock().unwrap();
		Ok(jobs
			.values()
			.filter(|j| matches_selector(&j.metadata, label_selector))
			.cloned()
			.collect())
	}

	async fn pod_logs(
		&self,
		name: &str,
		_namespace: &str,
		opts: LogOptions,
	) -> Result<String, K8sError> {
		if opts.container.as_deref() != Some(terraformer_core::CONTAINER_NAME) {
			return Err(K8sError::LogError {
				name: name.to_string(),
				message: format!("container {:?} is not valid for pod {name}", opts.container),
			});
		}
		if *self.fail_logs.lock().unwrap() {
			return Err(K8sError::LogError {
				name: name.to_string(),
				message: "container terraform is terminated".to_string(),
			});
		}
		self.logs
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| not_found("Pod", name))
	}
}

/// Renders [`BUNDLE`] by writing the config and variables artifacts, and the
/// state artifact when asked to initialize it.
pub struct MockRenderer {
	client: Arc<MockK8sClient>,
	transient_failures: AtomicUsize,
	calls: AtomicUsize,
	last_values: Mutex<Option<Value>>,
}

impl MockRenderer {
	pub fn new(client: Arc<MockK8sClient>) -> Self {
		Self {
			client,
			transient_failures: AtomicUsize::new(0),
			calls: AtomicUsize::new(0),
			last_values: Mutex::new(None),
		}
	}

	/// Fail the next `n` renders with a transient error.
	pub fn fail_next(&self, n: usize) {
		self.transient_failures.store(n, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_values(&self) -> Option<Value> {
		self.last_values.lock().unwrap().clone()
	}
}

#[async_trait]
impl BundleRenderer for MockRenderer {
	async fn apply(&self, bundle: &str, namespace: &str, values: &Value) -> Result<(), RenderError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last_values.lock().unwrap() = Some(values.clone());

		if bundle != BUNDLE {
			return Err(RenderError::BundleNotFound(bundle.to_string()));
		}
		let pending = self.transient_failures.load(Ordering::SeqCst);
		if pending > 0 {
			self.transient_failures.store(pending - 1, Ordering::SeqCst);
			return Err(RenderError::Render {
				bundle: bundle.to_string(),
				message: "the server is currently unable to handle the request".to_string(),
			});
		}

		let names = &values[NAMES_KEY];
		let name = |key: &str| names[key].as_str().unwrap_or_default().to_string();

		self.client.put_config_map(
			&name("configuration"),
			BTreeMap::from([("main.tf".to_string(), "resource \"aws_vpc\" \"vpc\" {}".to_string())]),
		);
		self.client.put_secret(
			&name("variables"),
			BTreeMap::from([("terraform.tfvars".to_string(), "region = \"eu-west-1\"".to_string())]),
		);

		if values[INITIALIZE_EMPTY_STATE_KEY].as_bool() == Some(true) {
			let state = ConfigMap {
				metadata: meta(&name("state"), BTreeMap::new()),
				..Default::default()
			};
			match self.client.create_config_map(namespace, state).await {
				Ok(_) => {}
				Err(e) if e.is_already_exists() => {}
				Err(e) => return Err(e.into()),
			}
		}
		Ok(())
	}
}

pub fn fast_config() -> ExecutorConfig {
	ExecutorConfig {
		poll_interval: Duration::from_millis(5),
		prepare_timeout: Duration::from_millis(100),
		clean_environment_timeout: Duration::from_millis(100),
		validation_timeout: Duration::from_millis(100),
		job_timeout: Duration::from_millis(100),
		define_config_timeout: Duration::from_millis(200),
		..Default::default()
	}
}

pub struct Harness {
	pub client: Arc<MockK8sClient>,
	pub renderer: Arc<MockRenderer>,
}

impl Harness {
	pub fn new() -> Self {
		let client = Arc::new(MockK8sClient::new());
		let renderer = Arc::new(MockRenderer::new(Arc::clone(&client)));
		Self { client, renderer }
	}

	/// A fresh handle with an (empty) variables environment set.
	pub fn terraformer(&self) -> Terraformer {
		let mut terraformer = self.bare_terraformer();
		terraformer.set_variables_environment(Vec::new());
		terraformer
	}

	pub fn bare_terraformer(&self) -> Terraformer {
		Terraformer::new(
			self.client.clone(),
			self.renderer.clone(),
			Owner::new(OWNER, NAMESPACE),
			PURPOSE,
		)
		.with_config(fast_config())
	}

	/// Store all three durable artifacts, with `state` as the state content.
	pub fn seed_artifacts(&self, state: &str) {
		let names = self.terraformer().names().clone();
		self.client
			.put_config_map(&names.config, BTreeMap::from([("main.tf".to_string(), String::new())]));
		self.client.put_secret(&names.variables, BTreeMap::new());
		let data = if state.is_empty() {
			BTreeMap::new()
		} else {
			BTreeMap::from([(STATE_KEY.to_string(), state.to_string())])
		};
		self.client.put_config_map(&names.state, data);
	}
}
