//! In-memory storage backend implementation for the orchestrator.
//!
//! This module provides memory-based implementations of the [`JobStore`]
//! and [`OracleWhitelist`] traits, useful for testing and development
//! scenarios where persistence is not required. Data is lost on restart;
//! for production, use a database-backed implementation.

use crate::{JobStore, OracleWhitelist, StatusCounts, StorageError};
use async_trait::async_trait;
use deployer_types::{Address, DeploymentJob, DeploymentResult, JobStatus};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Entry stored in memory, tagged with insertion order so status queries
/// can return oldest-first batches even when creation timestamps collide.
#[derive(Clone)]
struct StoredJob {
	seq: u64,
	job: DeploymentJob,
}

/// In-memory job store.
pub struct MemoryJobStore {
	jobs: Arc<RwLock<HashMap<String, StoredJob>>>,
	results: Arc<RwLock<HashMap<String, DeploymentResult>>>,
	next_seq: AtomicU64,
}

impl MemoryJobStore {
	/// Creates a new empty store.
	pub fn new() -> Self {
		Self {
			jobs: Arc::new(RwLock::new(HashMap::new())),
			results: Arc::new(RwLock::new(HashMap::new())),
			next_seq: AtomicU64::new(0),
		}
	}

	/// Returns the recorded result for a job, if any.
	pub async fn result_for(&self, job_id: &str) -> Option<DeploymentResult> {
		self.results.read().await.get(job_id).cloned()
	}
}

impl Default for MemoryJobStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl JobStore for MemoryJobStore {
	async fn insert(&self, job: DeploymentJob) -> Result<(), StorageError> {
		let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
		let mut jobs = self.jobs.write().await;
		jobs.insert(job.id.clone(), StoredJob { seq, job });
		Ok(())
	}

	async fn get(&self, id: &str) -> Result<DeploymentJob, StorageError> {
		let jobs = self.jobs.read().await;
		jobs.get(id)
			.map(|entry| entry.job.clone())
			.ok_or_else(|| StorageError::NotFound(id.to_string()))
	}

	async fn update(&self, job: &DeploymentJob) -> Result<(), StorageError> {
		let mut jobs = self.jobs.write().await;
		match jobs.get_mut(&job.id) {
			Some(entry) => {
				entry.job = job.clone();
				Ok(())
			},
			None => Err(StorageError::NotFound(job.id.clone())),
		}
	}

	async fn fetch_by_status(
		&self,
		status: JobStatus,
		limit: usize,
	) -> Result<Vec<DeploymentJob>, StorageError> {
		let jobs = self.jobs.read().await;
		let mut matching: Vec<&StoredJob> = jobs
			.values()
			.filter(|entry| entry.job.status == status)
			.collect();
		matching.sort_by_key(|entry| entry.seq);
		Ok(matching
			.into_iter()
			.take(limit)
			.map(|entry| entry.job.clone())
			.collect())
	}

	async fn insert_result(
		&self,
		job_id: &str,
		result: &DeploymentResult,
	) -> Result<(), StorageError> {
		let mut results = self.results.write().await;
		results.insert(job_id.to_string(), result.clone());
		Ok(())
	}

	async fn status_counts(&self) -> Result<StatusCounts, StorageError> {
		let jobs = self.jobs.read().await;
		let mut counts = StatusCounts::default();
		for entry in jobs.values() {
			match entry.job.status {
				JobStatus::Pending => counts.pending += 1,
				JobStatus::Processing => counts.processing += 1,
				JobStatus::Completed => counts.completed += 1,
				JobStatus::Failed => counts.failed += 1,
			}
		}
		Ok(counts)
	}
}

/// Static oracle allow-list backed by an in-memory set.
pub struct StaticOracleWhitelist {
	allowed: HashSet<Address>,
}

impl StaticOracleWhitelist {
	/// Creates a whitelist from the given addresses.
	pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
		Self {
			allowed: addresses.into_iter().collect(),
		}
	}
}

#[async_trait]
impl OracleWhitelist for StaticOracleWhitelist {
	async fn is_whitelisted(&self, address: &Address) -> Result<bool, StorageError> {
		Ok(self.allowed.contains(address))
	}
}
