// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The validate-then-execute pipeline behind `apply` and `destroy`.
//!
//! A run walks through [`Phase`]s. Which phases are visited is decided by the
//! pure transition functions on [`Phase`], [`SkipPlan`], [`PrepareOutcome`]
//! and [`ValidationOutcome`], so each branch can be tested without a cluster.

use std::collections::BTreeMap;
use std::fmt;

use terraformer_k8s::{Job, JobStatus, LogOptions, Pod};
use tracing::instrument;

use crate::error::{Result, TerraformerError};
use crate::manifests::{build_job, build_validation_pod, Script, WorkloadContext, CONTAINER_NAME};
use crate::poll::{poll_until, Attempt, PollError};
use crate::preparer::{ignore_not_found, DURABLE_ARTIFACTS};
use crate::terraformer::Terraformer;

/// Exit code of the validation script when the configuration is invalid.
const VALIDATION_FAILED_EXIT_CODE: i32 = 1;

/// Condition types after which a Job no longer makes progress.
const JOB_FINISHED_CONDITIONS: [&str; 2] = ["Complete", "Failed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Preparing,
	Validating,
	Executing,
	CollectingLogs,
	CleaningUp,
	Done,
}

impl Phase {
	/// Phase following a decisive prepare result.
	pub fn after_prepare(outcome: PrepareOutcome, skip: SkipPlan) -> Phase {
		match outcome {
			PrepareOutcome::Empty => Phase::Done,
			PrepareOutcome::Complete if !skip.validation => Phase::Validating,
			PrepareOutcome::Complete if !skip.job => Phase::Executing,
			PrepareOutcome::Complete => Phase::CollectingLogs,
		}
	}

	/// Phase following the validation pod's verdict.
	pub fn after_validation(outcome: ValidationOutcome, skip: SkipPlan) -> Phase {
		match outcome {
			ValidationOutcome::Drift if !skip.job => Phase::Executing,
			_ => Phase::CollectingLogs,
		}
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Phase::Preparing => "preparing",
			Phase::Validating => "validating",
			Phase::Executing => "executing",
			Phase::CollectingLogs => "collecting-logs",
			Phase::CleaningUp => "cleaning-up",
			Phase::Done => "done",
		};
		f.write_str(s)
	}
}

/// Which workloads a run leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipPlan {
	pub validation: bool,
	pub job: bool,
}

impl SkipPlan {
	/// Destroy never validates, and has nothing to tear down while the state
	/// is empty. Apply always runs both.
	pub fn for_script(script: Script, state_empty: bool) -> Self {
		match script {
			Script::Destroy => Self {
				validation: true,
				job: state_empty,
			},
			Script::Apply | Script::Validate => Self::default(),
		}
	}
}

/// Decisive result of counting the durable artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepareOutcome {
	/// Nothing was ever configured.
	Empty,
	/// Config, variables and state all exist.
	Complete,
}

impl PrepareOutcome {
	/// Classify an artifact count. Partial sets are an inconsistency that may
	/// resolve once freshly written artifacts become visible.
	pub fn from_count(existing: usize) -> Result<Self> {
		match existing {
			0 => Ok(PrepareOutcome::Empty),
			DURABLE_ARTIFACTS => Ok(PrepareOutcome::Complete),
			existing => Err(TerraformerError::InconsistentResources {
				missing: DURABLE_ARTIFACTS.saturating_sub(existing),
				total: DURABLE_ARTIFACTS,
			}),
		}
	}
}

/// Verdict of the validation pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
	/// Infrastructure matches the configuration.
	NoChanges,
	/// The configuration cannot be planned.
	Failed,
	/// Infrastructure differs from the configuration.
	Drift,
}

impl ValidationOutcome {
	pub fn from_exit_code(code: i32) -> Self {
		match code {
			0 => ValidationOutcome::NoChanges,
			VALIDATION_FAILED_EXIT_CODE => ValidationOutcome::Failed,
			_ => ValidationOutcome::Drift,
		}
	}

	/// Whether the run is still successful after this verdict.
	pub fn is_success(&self) -> bool {
		!matches!(self, ValidationOutcome::Failed)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
	Succeeded,
	Failed,
}

/// Terminal outcome of a Job, or `None` while it is still running.
fn job_outcome(status: &JobStatus) -> Option<JobOutcome> {
	if status.succeeded.unwrap_or(0) >= 1 {
		return Some(JobOutcome::Succeeded);
	}

	let finished = status.conditions.iter().flatten().any(|c| {
		JOB_FINISHED_CONDITIONS.contains(&c.type_.as_str()) && c.status == "True"
	});
	finished.then_some(JobOutcome::Failed)
}

/// Exit code of the terminated Terraform container, if it has terminated.
fn terminated_exit_code(pod: &Pod) -> Option<i32> {
	pod.status
		.as_ref()?
		.container_statuses
		.iter()
		.flatten()
		.filter(|s| s.name == CONTAINER_NAME)
		.find_map(|s| s.state.as_ref()?.terminated.as_ref().map(|t| t.exit_code))
}

impl Terraformer {
	/// Run `script` through the full pipeline and fail with the extracted
	/// Terraform errors when it did not succeed.
	///
	/// Once a workload may have been deployed, logs are collected and the
	/// workloads deleted whatever the outcome. A deploy or wait error is
	/// returned after that cleanup.
	#[instrument(skip(self, script), fields(owner = %self.owner, purpose = %self.purpose, script = %script))]
	pub(crate) async fn execute(&self, script: Script) -> Result<()> {
		let mut phase = Phase::Preparing;
		let mut skip = SkipPlan::default();
		let mut succeeded = true;
		let mut failure: Option<TerraformerError> = None;
		let mut pods: Vec<Pod> = Vec::new();
		let mut logs: BTreeMap<String, String> = BTreeMap::new();

		loop {
			tracing::debug!(%phase, "Entering phase");
			phase = match phase {
				Phase::Preparing => {
					let outcome = self.prepare_with_retry().await?;
					if outcome == PrepareOutcome::Empty {
						tracing::info!(
							"No Terraform artifacts exist, nothing to {}",
							script.as_str()
						);
					} else if script == Script::Destroy {
						skip = SkipPlan::for_script(script, self.is_state_empty().await?);
					} else {
						skip = SkipPlan::for_script(script, false);
					}
					Phase::after_prepare(outcome, skip)
				}
				Phase::Validating => match self.run_validation().await {
					Ok(outcome) => {
						succeeded = outcome.is_success();
						Phase::after_validation(outcome, skip)
					}
					Err(e) => {
						failure = Some(e);
						Phase::CollectingLogs
					}
				},
				Phase::Executing => {
					match self.run_job(script).await {
						Ok(job_succeeded) => succeeded = job_succeeded,
						Err(e) => failure = Some(e),
					}
					Phase::CollectingLogs
				}
				Phase::CollectingLogs => {
					pods = self.list_job_pods().await;
					logs = self.retrieve_pod_logs(&pods).await;
					Phase::CleaningUp
				}
				Phase::CleaningUp => {
					if let Err(e) = self.cleanup_job(&pods).await {
						if failure.is_some() {
							tracing::error!(job = %self.names.job, error = %e, "Could not clean up Terraform workloads");
						} else {
							failure = Some(e);
						}
					}
					Phase::Done
				}
				Phase::Done => break,
			};
		}

		if let Some(e) = failure {
			return Err(e);
		}

		if succeeded {
			tracing::info!("Terraform {} finished", script.as_str());
			return Ok(());
		}

		let errors = self.extractor.extract(&logs).unwrap_or_default();
		tracing::error!(
			errors = errors.len(),
			"Terraform {} did not succeed",
			script.as_str()
		);
		Err(TerraformerError::ExecutionFailed { errors })
	}

	/// Prepare until the artifact count is decisive (0 or 3).
	async fn prepare_with_retry(&self) -> Result<PrepareOutcome> {
		let outcome = poll_until(
			&self.config.poll(self.config.prepare_timeout),
			"terraform resources",
			move || async move {
				match self.prepare().await.and_then(PrepareOutcome::from_count) {
					Ok(outcome) => Attempt::Done(outcome),
					Err(e) if e.is_retryable() => Attempt::Retry(Some(e)),
					Err(e) => Attempt::Abort(e),
				}
			},
		)
		.await?;
		Ok(outcome)
	}

	fn workload_context(&self) -> WorkloadContext<'_> {
		WorkloadContext {
			names: &self.names,
			namespace: self.namespace(),
			purpose: &self.purpose,
			environment: self.variables_environment.as_deref().unwrap_or_default(),
			config: &self.config,
		}
	}

	async fn run_validation(&self) -> Result<ValidationOutcome> {
		let pod = build_validation_pod(&self.workload_context());
		tracing::info!(pod = %self.names.pod, "Deploying Terraform validation pod");
		self.client
			.create_pod(self.namespace(), pod)
			.await
			.map_err(|source| TerraformerError::Deploy {
				kind: "validation pod",
				source,
			})?;

		let outcome = match self.wait_for_validation().await? {
			Some(exit_code) => {
				let outcome = ValidationOutcome::from_exit_code(exit_code);
				tracing::info!(exit_code, ?outcome, "Terraform validation pod terminated");
				outcome
			}
			None => ValidationOutcome::Drift,
		};
		Ok(outcome)
	}

	/// Exit code of the validation pod, or `None` if it vanished or did not
	/// terminate in time.
	async fn wait_for_validation(&self) -> Result<Option<i32>> {
		let client = &self.client;
		let ns = self.namespace();
		let pod_name = self.names.pod.as_str();

		let result = poll_until(
			&self.config.poll(self.config.validation_timeout),
			"terraform validation pod",
			move || async move {
				match client.get_pod(pod_name, ns).await {
					Ok(pod) => match terminated_exit_code(&pod) {
						Some(code) => Attempt::Done(Some(code)),
						None => Attempt::Retry(None),
					},
					Err(e) if e.is_not_found() => {
						tracing::warn!(pod = pod_name, "Terraform validation pod disappeared, assuming drift");
						Attempt::Done(None)
					}
					Err(e) => Attempt::Retry(Some(TerraformerError::from(e))),
				}
			},
		)
		.await;

		match result {
			Ok(code) => Ok(code),
			Err(PollError::Timeout { timeout, .. }) => {
				tracing::warn!(
					pod = pod_name,
					timeout_secs = timeout.as_secs_f64(),
					"Terraform validation pod did not terminate in time, assuming drift"
				);
				Ok(None)
			}
			Err(PollError::Aborted(e)) => Err(e),
		}
	}

	/// Run the execution job and report whether it succeeded.
	async fn run_job(&self, script: Script) -> Result<bool> {
		let job: Job = build_job(&self.workload_context(), script);
		tracing::info!(job = %self.names.job, "Deploying Terraform job");
		self.client
			.create_job(self.namespace(), job)
			.await
			.map_err(|source| TerraformerError::Deploy { kind: "job", source })?;

		self.wait_for_job().await
	}

	async fn wait_for_job(&self) -> Result<bool> {
		let client = &self.client;
		let ns = self.namespace();
		let job_name = self.names.job.as_str();

		let result = poll_until(
			&self.config.poll(self.config.job_timeout),
			"terraform job",
			move || async move {
				match client.get_job(job_name, ns).await {
					Ok(job) => match job.status.as_ref().and_then(job_outcome) {
						Some(outcome) => Attempt::Done(outcome),
						None => Attempt::Retry(None),
					},
					Err(e) if e.is_not_found() => {
						tracing::warn!(job = job_name, "Terraform job disappeared before finishing");
						Attempt::Done(JobOutcome::Failed)
					}
					Err(e) => Attempt::Retry(Some(TerraformerError::from(e))),
				}
			},
		)
		.await;

		match result {
			Ok(outcome) => {
				tracing::info!(job = job_name, ?outcome, "Terraform job finished");
				Ok(outcome == JobOutcome::Succeeded)
			}
			Err(PollError::Timeout { timeout, .. }) => {
				tracing::error!(
					job = job_name,
					timeout_secs = timeout.as_secs_f64(),
					"Terraform job did not finish in time"
				);
				Ok(false)
			}
			Err(PollError::Aborted(e)) => Err(e),
		}
	}

	/// Pods of the validation pod and the job. Listing failures degrade to an
	/// empty list.
	async fn list_job_pods(&self) -> Vec<Pod> {
		match self
			.client
			.list_pods(self.namespace(), &self.names.job_selector())
			.await
		{
			Ok(pods) => pods,
			Err(e) => {
				tracing::error!(job = %self.names.job, error = %e, "Could not list Terraform pods");
				Vec::new()
			}
		}
	}

	/// Logs of `pods` keyed by pod name. Any retrieval failure degrades to an
	/// empty map.
	async fn retrieve_pod_logs(&self, pods: &[Pod]) -> BTreeMap<String, String> {
		let mut logs = BTreeMap::new();

		for pod in pods {
			let Some(name) = pod.metadata.name.as_deref() else {
				continue;
			};
			let opts = LogOptions {
				container: Some(CONTAINER_NAME.to_string()),
			};

			match self.client.pod_logs(name, self.namespace(), opts).await {
				Ok(output) => {
					tracing::info!(pod = name, logs = %output, "Terraform pod logs");
					logs.insert(name.to_string(), output);
				}
				Err(e) => {
					tracing::error!(job = %self.names.job, pod = name, error = %e, "Could not retrieve Terraform pod logs");
					return BTreeMap::new();
				}
			}
		}

		logs
	}

	/// Delete the Job, the listed pods and the validation pod. The validation
	/// pod is deleted by name since an unavailable listing misses it.
	async fn cleanup_job(&self, pods: &[Pod]) -> Result<()> {
		tracing::info!(job = %self.names.job, pods = pods.len(), "Cleaning up Terraform job");
		self.delete_job().await?;
		self.delete_pods(pods).await?;

		let listed = pods
			.iter()
			.any(|p| p.metadata.name.as_deref() == Some(self.names.pod.as_str()));
		if listed {
			return Ok(());
		}
		ignore_not_found(
			self.client
				.delete_pod(&self.names.pod, self.namespace(), self.config.delete_grace_period_secs)
				.await,
		)
	}
}
