// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use tracing::instrument;

use crate::error::Result;
use crate::preparer::ignore_not_found;
use crate::terraformer::Terraformer;

impl Terraformer {
	/// Delete the variables, config and state artifacts, in that order.
	///
	/// Missing artifacts count as deleted. The first other failure stops the
	/// sequence and leaves the remaining artifacts in place.
	#[instrument(skip(self), fields(owner = %self.owner, purpose = %self.purpose))]
	pub async fn cleanup_configuration(&self) -> Result<()> {
		let ns = self.namespace();

		ignore_not_found(self.client.delete_secret(&self.names.variables, ns).await)?;
		tracing::debug!(secret = %self.names.variables, "Deleted Terraform variables");

		ignore_not_found(self.client.delete_config_map(&self.names.config, ns).await)?;
		tracing::debug!(config_map = %self.names.config, "Deleted Terraform configuration");

		ignore_not_found(self.client.delete_config_map(&self.names.state, ns).await)?;
		tracing::debug!(config_map = %self.names.state, "Deleted Terraform state");

		tracing::info!("Cleaned up Terraform configuration");
		Ok(())
	}
}
