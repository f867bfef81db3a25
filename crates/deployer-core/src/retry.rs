//! Reusable bounded-retry primitive with exponential backoff.
//!
//! Wraps an async operation with a fixed number of attempts, sleeping
//! `base_delay * 2^(attempt-1)` between failures. The delay suspends only
//! the retrying operation, never unrelated work on the runtime.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Error returned when an operation has exhausted its attempt budget.
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
	/// All attempts failed; wraps the last underlying error.
	#[error("'{label}' failed after {attempts} attempts: {source}")]
	MaxRetriesExceeded {
		label: String,
		attempts: u32,
		#[source]
		source: E,
	},
}

/// Runs `operation` up to `max_attempts` times with exponential backoff.
///
/// Delays between attempts are `base_delay, 2*base_delay, 4*base_delay, ...`.
/// No delay follows the final attempt.
pub async fn run_with_retry<T, E, F, Fut>(
	label: &str,
	max_attempts: u32,
	base_delay: Duration,
	mut operation: F,
) -> Result<T, RetryError<E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: std::error::Error + 'static,
{
	let mut attempt = 1u32;
	loop {
		match operation().await {
			Ok(value) => return Ok(value),
			Err(source) if attempt >= max_attempts => {
				return Err(RetryError::MaxRetriesExceeded {
					label: label.to_string(),
					attempts: attempt,
					source,
				});
			},
			Err(e) => {
				let delay = base_delay * 2u32.pow(attempt - 1);
				tracing::warn!(
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					"'{}' failed, backing off: {}",
					label,
					e
				);
				tokio::time::sleep(delay).await;
				attempt += 1;
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{Arc, Mutex};
	use tokio::time::Instant;

	#[derive(Debug, Error)]
	#[error("always fails")]
	struct AlwaysFails;

	#[tokio::test]
	async fn test_success_on_first_attempt_skips_backoff() {
		let calls = AtomicU32::new(0);
		let result: Result<u32, RetryError<AlwaysFails>> =
			run_with_retry("op", 3, Duration::from_millis(100), || {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Ok(42) }
			})
			.await;

		assert_eq!(result.unwrap(), 42);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_succeeds_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let calls_in_op = calls.clone();
		let result: Result<&str, RetryError<AlwaysFails>> =
			run_with_retry("op", 5, Duration::from_millis(100), move || {
				let n = calls_in_op.fetch_add(1, Ordering::SeqCst);
				async move {
					if n < 2 {
						Err(AlwaysFails)
					} else {
						Ok("done")
					}
				}
			})
			.await;

		assert_eq!(result.unwrap(), "done");
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn test_exhaustion_wraps_last_error() {
		let result: Result<(), RetryError<AlwaysFails>> =
			run_with_retry("doomed", 3, Duration::from_millis(10), || async {
				Err(AlwaysFails)
			})
			.await;

		match result {
			Err(RetryError::MaxRetriesExceeded {
				label, attempts, ..
			}) => {
				assert_eq!(label, "doomed");
				assert_eq!(attempts, 3);
			},
			Ok(_) => panic!("expected exhaustion"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_backoff_delays_double_each_attempt() {
		let base = Duration::from_millis(100);
		let attempt_times: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
		let times_in_op = attempt_times.clone();

		let _: Result<(), RetryError<AlwaysFails>> =
			run_with_retry("timing", 5, base, move || {
				times_in_op.lock().unwrap().push(Instant::now());
				async { Err(AlwaysFails) }
			})
			.await;

		let times = attempt_times.lock().unwrap();
		assert_eq!(times.len(), 5);
		// Delays following attempts 1..4 are d, 2d, 4d, 8d
		assert_eq!(times[1] - times[0], base);
		assert_eq!(times[2] - times[1], 2 * base);
		assert_eq!(times[3] - times[2], 4 * base);
		assert_eq!(times[4] - times[3], 8 * base);
	}
}
