// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use terraformer_k8s::{K8sError, Pod};
use tracing::instrument;

use crate::error::{Result, TerraformerError};
use crate::poll::{poll_until, Attempt};
use crate::terraformer::Terraformer;

/// Number of durable artifacts a configured run owns.
pub const DURABLE_ARTIFACTS: usize = 3;

impl Terraformer {
	/// Count the durable artifacts that exist and purge workloads left over
	/// from an interrupted run.
	///
	/// Returns once no Job or Pod of this run remains; a clean environment
	/// that does not appear within the configured ceiling is an error.
	#[instrument(skip(self), fields(job = %self.names.job))]
	pub(crate) async fn prepare(&self) -> Result<usize> {
		if self.variables_environment.is_none() {
			return Err(TerraformerError::MissingVariablesEnvironment);
		}

		let existing = self.count_durable_artifacts().await?;
		tracing::debug!(existing, total = DURABLE_ARTIFACTS, "Counted durable artifacts");

		self.purge_workloads().await?;
		self.wait_for_clean_environment().await?;

		Ok(existing)
	}

	async fn count_durable_artifacts(&self) -> Result<usize> {
		let ns = self.namespace();
		let checks = [
			self.client
				.get_config_map(&self.names.config, ns)
				.await
				.map(|_| ()),
			self.client
				.get_secret(&self.names.variables, ns)
				.await
				.map(|_| ()),
			self.client
				.get_config_map(&self.names.state, ns)
				.await
				.map(|_| ()),
		];

		let mut existing = 0;
		for check in checks {
			match check {
				Ok(()) => existing += 1,
				Err(e) if e.is_not_found() => {}
				Err(e) => return Err(e.into()),
			}
		}
		Ok(existing)
	}

	/// Delete every Job and Pod carrying this run's job name label.
	async fn purge_workloads(&self) -> Result<()> {
		let selector = self.names.job_selector();
		let ns = self.namespace();

		let jobs = self.client.list_jobs(ns, &selector).await?;
		for job in &jobs {
			if let Some(name) = job.metadata.name.as_deref() {
				tracing::info!(job = name, "Deleting leftover Terraform job");
				ignore_not_found(self.client.delete_job(name, ns).await)?;
			}
		}

		let pods = self.client.list_pods(ns, &selector).await?;
		self.delete_pods(&pods).await
	}

	/// Delete the execution Job; a missing Job is already clean.
	pub(crate) async fn delete_job(&self) -> Result<()> {
		ignore_not_found(self.client.delete_job(&self.names.job, self.namespace()).await)?;
		Ok(())
	}

	pub(crate) async fn delete_pods(&self, pods: &[Pod]) -> Result<()> {
		let ns = self.namespace();
		for pod in pods {
			let Some(name) = pod.metadata.name.as_deref() else {
				continue;
			};
			tracing::debug!(pod = name, "Deleting Terraform pod");
			ignore_not_found(
				self.client
					.delete_pod(name, ns, self.config.delete_grace_period_secs)
					.await,
			)?;
		}
		Ok(())
	}

	async fn wait_for_clean_environment(&self) -> Result<()> {
		let client = &self.client;
		let ns = self.namespace();
		let selector = self.names.job_selector();
		let selector = selector.as_str();

		poll_until(
			&self.config.poll(self.config.clean_environment_timeout),
			"clean Terraform environment",
			move || async move {
				let jobs = match client.list_jobs(ns, selector).await {
					Ok(jobs) => jobs,
					Err(e) => return Attempt::Abort(TerraformerError::from(e)),
				};
				let pods = match client.list_pods(ns, selector).await {
					Ok(pods) => pods,
					Err(e) => return Attempt::Abort(TerraformerError::from(e)),
				};

				if jobs.is_empty() && pods.is_empty() {
					Attempt::Done(())
				} else {
					tracing::debug!(
						jobs = jobs.len(),
						pods = pods.len(),
						"Waiting for Terraform workloads to disappear"
					);
					Attempt::Retry(None)
				}
			},
		)
		.await?;
		Ok(())
	}
}

pub(crate) fn ignore_not_found(result: std::result::Result<(), K8sError>) -> Result<()> {
	match result {
		Ok(()) => Ok(()),
		Err(e) if e.is_not_found() => Ok(()),
		Err(e) => Err(e.into()),
	}
}
