//! Deployment queue: batch processing and retry accounting.
//!
//! The queue pulls pending jobs on a fixed interval, runs them through the
//! executor sequentially (the deployer account cannot tolerate concurrent
//! submissions), and either finalizes or re-queues them based on the
//! retry budget. A single atomic flag guards against overlapping batch
//! triggers.

use crate::engine::event_bus::EventBus;
use crate::executor::DeploymentExecutor;
use deployer_alerts::AlertManager;
use deployer_storage::{JobStore, StatusCounts, StorageError};
use deployer_types::{
	truncate_id, Alert, AlertEvent, AlertLevel, DeployerEvent, DeploymentJob, DeploymentResult,
	JobKind, JobStatus, QueueEvent,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Source recorded on alerts raised by the queue.
pub const ALERT_SOURCE: &str = "deployment-queue";

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
	/// Error from the job store.
	#[error(transparent)]
	Storage(#[from] StorageError),
}

/// Outcome of an operator retry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
	/// The failed job was reset to pending with a fresh retry budget.
	Reset,
	/// The job was not in the failed state; nothing was changed.
	NotFailed(JobStatus),
}

/// Configuration for the deployment queue.
#[derive(Debug, Clone)]
pub struct QueueConfig {
	/// Maximum jobs pulled per processing pass.
	pub batch_size: usize,
	/// Retry budget assigned to newly enqueued jobs.
	pub max_retries: u32,
}

/// Service that owns queued deployment jobs during processing.
pub struct DeploymentQueue {
	store: Arc<dyn JobStore>,
	executor: Arc<DeploymentExecutor>,
	alerts: Arc<AlertManager>,
	event_bus: EventBus,
	config: QueueConfig,
	/// Re-entrancy guard; the queue's sole concurrency-safety mechanism.
	is_processing: AtomicBool,
}

/// Clears the processing flag on every exit path, including panics.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

impl DeploymentQueue {
	/// Creates a new DeploymentQueue with the given collaborators.
	pub fn new(
		store: Arc<dyn JobStore>,
		executor: Arc<DeploymentExecutor>,
		alerts: Arc<AlertManager>,
		event_bus: EventBus,
		config: QueueConfig,
	) -> Self {
		Self {
			store,
			executor,
			alerts,
			event_bus,
			config,
			is_processing: AtomicBool::new(false),
		}
	}

	/// Accepts a new deployment job into the queue.
	///
	/// Only the shape of the request is checked here; business validation
	/// happens in the executor so that bad parameters surface as a job
	/// failure with diagnostics rather than a rejected enqueue.
	pub async fn enqueue(&self, kind: JobKind) -> Result<String, QueueError> {
		let job = DeploymentJob::new(kind, self.config.max_retries);
		let job_id = job.id.clone();
		let kind_name = job.kind.name().to_string();

		self.store.insert(job).await?;
		tracing::info!(job_id = %truncate_id(&job_id), kind = %kind_name, "Job enqueued");
		self.event_bus
			.publish(DeployerEvent::Queue(QueueEvent::JobQueued {
				job_id: job_id.clone(),
				kind: kind_name,
			}))
			.ok();

		Ok(job_id)
	}

	/// Returns job counts per status.
	pub async fn queue_status(&self) -> Result<StatusCounts, QueueError> {
		Ok(self.store.status_counts().await?)
	}

	/// Resets a terminally failed job to pending with a fresh retry budget.
	///
	/// A retry request for a job in any other state is a no-op, reported
	/// as such rather than treated as an error.
	pub async fn retry(&self, job_id: &str) -> Result<RetryOutcome, QueueError> {
		let mut job = self.store.get(job_id).await?;
		if job.status != JobStatus::Failed {
			tracing::info!(
				job_id = %truncate_id(job_id),
				status = %job.status,
				"Retry requested for non-failed job, ignoring"
			);
			return Ok(RetryOutcome::NotFailed(job.status));
		}

		job.status = JobStatus::Pending;
		job.retry_count = 0;
		job.last_error = None;
		job.touch();
		self.store.update(&job).await?;
		tracing::info!(job_id = %truncate_id(job_id), "Failed job reset to pending");

		Ok(RetryOutcome::Reset)
	}

	/// Processes one batch of jobs.
	///
	/// If a batch is already in progress the call is a no-op; the periodic
	/// trigger may fire faster than processing completes and must not
	/// stack batches. Batch-level faults (e.g. the store is unreachable)
	/// are reported as a critical alert instead of crashing the trigger.
	#[instrument(skip_all)]
	pub async fn process_batch(&self) {
		if self
			.is_processing
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			tracing::info!("Queue batch already in progress, skipping trigger");
			return;
		}
		let _guard = ProcessingGuard(&self.is_processing);

		if let Err(e) = self.run_batch().await {
			tracing::error!("Queue batch processing failed: {}", e);
			let alert = self.alerts.create(
				"Queue processing failure",
				format!("Batch aborted: {}", e),
				AlertLevel::Critical,
				ALERT_SOURCE,
				None,
			);
			self.dispatch_alert(alert).await;
		}
	}

	async fn run_batch(&self) -> Result<(), QueueError> {
		let pending = self
			.store
			.fetch_by_status(JobStatus::Pending, self.config.batch_size)
			.await?;
		if !pending.is_empty() {
			tracing::info!(count = pending.len(), "Processing pending deployment jobs");
		}
		for job in pending {
			self.process_job(job).await?;
		}

		// Failed jobs with remaining budget re-enter the normal pipeline.
		let failed = self
			.store
			.fetch_by_status(JobStatus::Failed, self.config.batch_size)
			.await?;
		for mut job in failed.into_iter().filter(|j| j.is_retriable()) {
			tracing::info!(
				job_id = %truncate_id(&job.id),
				retry_count = job.retry_count,
				"Retrying failed deployment job"
			);
			job.status = JobStatus::Pending;
			job.touch();
			self.store.update(&job).await?;
			self.process_job(job).await?;
		}

		Ok(())
	}

	/// Runs one job through the executor and applies the outcome.
	///
	/// Executor failures are handled here; only store failures propagate
	/// to the batch level.
	async fn process_job(&self, mut job: DeploymentJob) -> Result<(), QueueError> {
		job.status = JobStatus::Processing;
		job.touch();
		self.store.update(&job).await?;
		self.event_bus
			.publish(DeployerEvent::Queue(QueueEvent::JobStarted {
				job_id: job.id.clone(),
			}))
			.ok();

		match self.executor.deploy(&mut job).await {
			Ok(result) => self.finish_success(job, result).await,
			Err(e) if e.is_retryable() => self.handle_retryable_failure(job, e.to_string()).await,
			Err(e) => self.finish_validation_failure(job, e.to_string()).await,
		}
	}

	async fn finish_success(
		&self,
		mut job: DeploymentJob,
		result: DeploymentResult,
	) -> Result<(), QueueError> {
		job.status = JobStatus::Completed;
		job.deployed_address = Some(result.contract_address.clone());
		job.deployment_tx = Some(result.tx_hash.clone());
		job.gas_used = Some(result.gas_used);
		job.gas_price = Some(result.gas_price);
		job.last_error = None;
		job.touch();
		self.store.update(&job).await?;

		// Audit record; its failure must never abort the primary flow.
		if let Err(e) = self.store.insert_result(&job.id, &result).await {
			tracing::warn!(
				job_id = %truncate_id(&job.id),
				"Failed to persist deployment result: {}",
				e
			);
		}

		tracing::info!(
			job_id = %truncate_id(&job.id),
			contract = %result.contract_address,
			duration_ms = result.duration_ms,
			"Deployment completed"
		);

		let alert = self.alerts.create(
			"Deployment completed",
			format!(
				"{} job {} deployed at {}",
				job.kind.name(),
				job.id,
				result.contract_address
			),
			AlertLevel::Info,
			ALERT_SOURCE,
			Some(
				[
					("job_id".to_string(), serde_json::json!(job.id)),
					(
						"contract_address".to_string(),
						serde_json::json!(result.contract_address.to_string()),
					),
				]
				.into_iter()
				.collect(),
			),
		);
		self.dispatch_alert(alert).await;

		self.event_bus
			.publish(DeployerEvent::Queue(QueueEvent::JobCompleted {
				job_id: job.id.clone(),
				contract_address: result.contract_address.to_string(),
				tx_hash: result.tx_hash,
			}))
			.ok();

		Ok(())
	}

	/// Applies one failed attempt to the job's retry budget.
	///
	/// The increment happens exactly once per failed attempt, here and
	/// nowhere else.
	async fn handle_retryable_failure(
		&self,
		mut job: DeploymentJob,
		error: String,
	) -> Result<(), QueueError> {
		job.last_error = Some(error.clone());

		if job.retry_count < job.max_retries {
			job.retry_count += 1;
			job.status = JobStatus::Pending;
			job.touch();
			self.store.update(&job).await?;

			tracing::warn!(
				job_id = %truncate_id(&job.id),
				retry_count = job.retry_count,
				max_retries = job.max_retries,
				"Deployment attempt failed, re-queued: {}",
				error
			);
			self.event_bus
				.publish(DeployerEvent::Queue(QueueEvent::JobRequeued {
					job_id: job.id.clone(),
					retry_count: job.retry_count,
					error,
				}))
				.ok();
		} else {
			job.status = JobStatus::Failed;
			job.touch();
			self.store.update(&job).await?;

			tracing::error!(
				job_id = %truncate_id(&job.id),
				retry_count = job.retry_count,
				"Deployment failed permanently: {}",
				error
			);
			let alert = self.alerts.create(
				"Deployment failed permanently",
				format!(
					"Job {} exhausted its retry budget: {}",
					job.id, error
				),
				AlertLevel::Critical,
				ALERT_SOURCE,
				Some(
					[("job_id".to_string(), serde_json::json!(job.id))]
						.into_iter()
						.collect(),
				),
			);
			self.dispatch_alert(alert).await;

			self.event_bus
				.publish(DeployerEvent::Queue(QueueEvent::JobFailed {
					job_id: job.id.clone(),
					error,
				}))
				.ok();
		}

		Ok(())
	}

	/// Finalizes a job whose parameters failed validation.
	///
	/// Validation failures never consume retry budget.
	async fn finish_validation_failure(
		&self,
		mut job: DeploymentJob,
		error: String,
	) -> Result<(), QueueError> {
		job.status = JobStatus::Failed;
		job.last_error = Some(error.clone());
		job.touch();
		self.store.update(&job).await?;

		tracing::warn!(
			job_id = %truncate_id(&job.id),
			"Deployment rejected by validation: {}",
			error
		);
		let alert = self.alerts.create(
			"Deployment validation failed",
			format!("Job {} rejected: {}", job.id, error),
			AlertLevel::Warning,
			ALERT_SOURCE,
			Some(
				[("job_id".to_string(), serde_json::json!(job.id))]
					.into_iter()
					.collect(),
			),
		);
		self.dispatch_alert(alert).await;

		self.event_bus
			.publish(DeployerEvent::Queue(QueueEvent::JobFailed {
				job_id: job.id.clone(),
				error,
			}))
			.ok();

		Ok(())
	}

	/// Triggers an alert; dispatch failures are logged, never propagated.
	async fn dispatch_alert(&self, alert: Alert) {
		let (id, level, title, source) = (
			alert.id.clone(),
			alert.level,
			alert.title.clone(),
			alert.source.clone(),
		);
		match self.alerts.trigger(alert).await {
			Ok(true) => {
				self.event_bus
					.publish(DeployerEvent::Alert(AlertEvent::Dispatched {
						alert_id: id,
						level,
						title,
					}))
					.ok();
			},
			Ok(false) => {
				self.event_bus
					.publish(DeployerEvent::Alert(AlertEvent::Suppressed { source, title }))
					.ok();
			},
			Err(e) => {
				tracing::warn!(alert_id = %id, "Alert dispatch failed: {}", e);
			},
		}
	}
}
