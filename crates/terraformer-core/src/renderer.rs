// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Seam to the component that renders a bundle into cluster objects.

use async_trait::async_trait;
use serde_json::Value;
use terraformer_k8s::K8sError;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
	#[error("bundle not found: {0}")]
	BundleNotFound(String),

	#[error("failed to render bundle {bundle}: {message}")]
	Render { bundle: String, message: String },

	#[error(transparent)]
	K8s(#[from] K8sError),
}

impl RenderError {
	/// Whether trying the same render again may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			RenderError::BundleNotFound(_) => false,
			RenderError::Render { .. } | RenderError::K8s(_) => true,
		}
	}
}

/// Renders a named bundle with a value map and submits the resulting
/// manifests to the cluster.
///
/// The Terraformer treats the bundle as opaque; it only injects the object
/// names and the `initializeEmptyState` flag into `values`.
#[async_trait]
pub trait BundleRenderer: Send + Sync {
	async fn apply(&self, bundle: &str, namespace: &str, values: &Value) -> Result<(), RenderError>;
}
