// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Extraction of Terraform error reports from collected pod logs.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Note Terraform appends after a failed apply; it carries no error detail.
const ROLLBACK_NOTE: &str = "\n\nTerraform does not automatically rollback";
const UUID_PLACEHOLDER: &str = "<omitted>";

static TERRAFORM_ERROR: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"(?:Error [^:]*|Errors): *([\s\S]*)").expect("valid error regex"));
static UUID: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
		.expect("valid uuid regex")
});
static MULTI_NEWLINE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"\n{2,}").expect("valid newline regex"));

/// Turns the logs of a failed run into human-readable error reports.
///
/// Implementations receive logs keyed by pod name and return one entry per
/// distinct error, or `None` when nothing recognizable was found.
pub trait ErrorExtractor: Send + Sync {
	fn extract(&self, logs_by_pod: &BTreeMap<String, String>) -> Option<Vec<String>>;
}

/// Extractor for Terraform's textual CLI output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerraformErrorExtractor;

impl ErrorExtractor for TerraformErrorExtractor {
	fn extract(&self, logs_by_pod: &BTreeMap<String, String>) -> Option<Vec<String>> {
		retrieve_terraform_errors(logs_by_pod)
	}
}

/// Collect the distinct errors of all pods, each attributed to the first pod
/// (in pod name order) that reported it.
pub fn retrieve_terraform_errors(logs_by_pod: &BTreeMap<String, String>) -> Option<Vec<String>> {
	let mut seen = HashSet::new();
	let mut reports = Vec::new();

	for (pod_name, output) in logs_by_pod {
		let message = find_terraform_errors(output);
		if message.is_empty() || !seen.insert(message.clone()) {
			continue;
		}
		reports.push(format!("-> Pod '{pod_name}' reported:\n{message}"));
	}

	if reports.is_empty() {
		None
	} else {
		Some(reports)
	}
}

/// Normalize the error block of one log, or return an empty string if the log
/// holds none.
///
/// Bullet lines (`* ...`) are sorted and kept, header and footer noise is
/// dropped and UUIDs are masked so reports differing only in request IDs
/// compare equal. A block without bullets is kept whole instead of being
/// reduced to a bare `*`, so bullet-less diagnostics still reach the caller.
pub fn find_terraform_errors(output: &str) -> String {
	let output = match output.find(ROLLBACK_NOTE) {
		Some(idx) => &output[..idx],
		None => output,
	};

	let Some(body) = TERRAFORM_ERROR.captures(output).and_then(|c| c.get(1)) else {
		return String::new();
	};

	let body = UUID.replace_all(body.as_str().trim(), UUID_PLACEHOLDER);

	let mut lines: Vec<&str> = body.split('*').collect();
	lines.sort_unstable();
	let bullets: Vec<&str> = lines.into_iter().filter(|l| l.starts_with(' ')).collect();

	let message = if bullets.is_empty() {
		body.to_string()
	} else {
		format!("*{}", bullets.join("\n*"))
	};

	MULTI_NEWLINE.replace_all(&message, "\n").trim().to_string()
}
