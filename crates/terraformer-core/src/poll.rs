// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded "poll until a condition holds" primitive shared by every wait.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Interval and ceiling of a wait loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
	pub interval: Duration,
	pub timeout: Duration,
	pub backoff_factor: f64,
	pub max_interval: Duration,
	pub jitter: bool,
}

impl PollConfig {
	/// Check every `interval` until `timeout` has elapsed.
	pub fn fixed(interval: Duration, timeout: Duration) -> Self {
		Self {
			interval,
			timeout,
			backoff_factor: 1.0,
			max_interval: interval,
			jitter: false,
		}
	}

	/// Grow the interval by `factor` after every attempt, capped at `max_interval`.
	pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
		self.backoff_factor = factor;
		self.max_interval = max_interval;
		self
	}

	pub fn with_jitter(mut self) -> Self {
		self.jitter = true;
		self
	}

	fn delay(&self, attempt: u32) -> Duration {
		let exponential = self.interval.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exponential.min(self.max_interval.as_secs_f64().max(self.interval.as_secs_f64()));

		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(delay)
	}
}

/// Result of a single check.
#[derive(Debug)]
pub enum Attempt<T, E> {
	/// The condition holds; stop with this value.
	Done(T),
	/// Not yet; check again after the interval, remembering the error if any.
	Retry(Option<E>),
	/// A severe failure; stop immediately.
	Abort(E),
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<E> {
	#[error("timed out after {timeout:?} waiting for {what}")]
	Timeout {
		what: String,
		timeout: Duration,
		last_error: Option<E>,
	},

	#[error("{0}")]
	Aborted(E),
}

/// Run `check` immediately and then after every interval until it reports
/// [`Attempt::Done`], reports [`Attempt::Abort`], or the timeout elapses.
pub async fn poll_until<T, E, F, Fut>(
	cfg: &PollConfig,
	what: &str,
	mut check: F,
) -> Result<T, PollError<E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Attempt<T, E>>,
	E: Display,
{
	let start = Instant::now();
	let mut attempt: u32 = 0;
	let mut last_error: Option<E> = None;

	loop {
		match check().await {
			Attempt::Done(value) => return Ok(value),
			Attempt::Abort(err) => return Err(PollError::Aborted(err)),
			Attempt::Retry(Some(err)) => {
				debug!(what, attempt, error = %err, "condition not met yet");
				last_error = Some(err);
			}
			Attempt::Retry(None) => {
				debug!(what, attempt, "condition not met yet");
			}
		}

		let elapsed = start.elapsed();
		if elapsed >= cfg.timeout {
			warn!(
				what,
				attempts = attempt + 1,
				timeout_secs = cfg.timeout.as_secs_f64(),
				"gave up waiting"
			);
			return Err(PollError::Timeout {
				what: what.to_string(),
				timeout: cfg.timeout,
				last_error,
			});
		}

		let delay = cfg.delay(attempt).min(cfg.timeout - elapsed);
		attempt = attempt.saturating_add(1);
		tokio::time::sleep(delay).await;
	}
}
