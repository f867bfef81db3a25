//! Storage module for the deployment orchestrator.
//!
//! This module provides abstractions for persistence of deployment jobs
//! and deployment results, plus the oracle allow-list lookup consumed by
//! executor validation. Backends are pluggable; the in-memory
//! implementation ships for tests and development.

use async_trait::async_trait;
use deployer_types::{Address, DeploymentJob, DeploymentResult, JobStatus};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
}

pub use implementations::memory::{MemoryJobStore, StaticOracleWhitelist};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Per-status job counts exposed to the API layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
	pub pending: usize,
	pub processing: usize,
	pub completed: usize,
	pub failed: usize,
}

/// Trait defining the interface for job persistence backends.
///
/// This trait must be implemented by any backend that wants to hold queue
/// state. The queue processor and executor are the only writers; read
/// paths must stay available regardless of individual job state.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait JobStore: Send + Sync {
	/// Persists a new job.
	async fn insert(&self, job: DeploymentJob) -> Result<(), StorageError>;

	/// Retrieves a job by id.
	async fn get(&self, id: &str) -> Result<DeploymentJob, StorageError>;

	/// Persists the current state of an existing job.
	async fn update(&self, job: &DeploymentJob) -> Result<(), StorageError>;

	/// Fetches up to `limit` jobs with the given status, oldest first.
	async fn fetch_by_status(
		&self,
		status: JobStatus,
		limit: usize,
	) -> Result<Vec<DeploymentJob>, StorageError>;

	/// Records the outcome of a successful deployment.
	///
	/// This is an audit-style write: callers treat failures here as
	/// non-fatal for the primary flow.
	async fn insert_result(
		&self,
		job_id: &str,
		result: &DeploymentResult,
	) -> Result<(), StorageError>;

	/// Returns job counts per status.
	async fn status_counts(&self) -> Result<StatusCounts, StorageError>;
}

/// Trait defining the oracle allow-list lookup.
///
/// Market deployments are only valid when their oracle address is present
/// in this list.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait OracleWhitelist: Send + Sync {
	/// Whether the given address may act as a market oracle.
	async fn is_whitelisted(&self, address: &Address) -> Result<bool, StorageError>;
}
