//! Deployment job types: kinds, parameters, status and results.
//!
//! A [`DeploymentJob`] represents one contract-deployment intent moving
//! through the queue. Job parameters are a tagged union keyed by the
//! deployable contract kind, each variant carrying its own field set.

use crate::chain::Address;
use crate::delivery::TransactionHash;
use crate::utils::current_timestamp;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Parameters for deploying a binary prediction market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMarketParams {
	/// Market question shown to traders.
	pub title: String,
	/// Longer-form resolution criteria.
	pub description: String,
	/// Unix timestamp after which the market stops trading.
	pub end_time: u64,
	/// Oracle contract that resolves the market.
	pub oracle: Address,
	/// Initial liquidity seeded into the market, in wei.
	pub initial_liquidity: U256,
}

/// Parameters for deploying a copy-trading vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyTradingVaultParams {
	/// Trader whose positions the vault mirrors.
	pub leader: Address,
	/// Display name of the vault.
	pub name: String,
	/// Performance fee in basis points.
	pub performance_fee_bps: u16,
	/// Management fee in basis points.
	pub management_fee_bps: u16,
}

/// The deployable contract kinds, each with its validated parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum JobKind {
	/// A binary (yes/no) prediction market.
	BinaryMarket(BinaryMarketParams),
	/// A vault that copies a leader's trades.
	CopyTradingVault(CopyTradingVaultParams),
}

impl JobKind {
	/// Returns a short name for logging and alert metadata.
	pub fn name(&self) -> &'static str {
		match self {
			JobKind::BinaryMarket(_) => "binary_market",
			JobKind::CopyTradingVault(_) => "copy_trading_vault",
		}
	}
}

/// Lifecycle status of a deployment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
	/// Waiting in the queue for a processing slot.
	Pending,
	/// Currently held by the executor.
	Processing,
	/// Deployed and confirmed; terminal.
	Completed,
	/// Exhausted its retry budget or failed validation; terminal.
	Failed,
}

impl std::fmt::Display for JobStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			JobStatus::Pending => "pending",
			JobStatus::Processing => "processing",
			JobStatus::Completed => "completed",
			JobStatus::Failed => "failed",
		};
		write!(f, "{}", s)
	}
}

/// One contract-deployment intent.
///
/// Mutated only by the queue processor and executor. The retry budget
/// invariant `retry_count <= max_retries` holds at all times; terminal
/// states are immutable except for an explicit operator reset of a
/// `Failed` job back to `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentJob {
	/// Unique job identifier.
	pub id: String,
	/// Contract kind and its parameters.
	pub kind: JobKind,
	/// Current lifecycle status.
	pub status: JobStatus,
	/// Failed attempts so far.
	pub retry_count: u32,
	/// Maximum failed attempts before the job is finalized `Failed`.
	pub max_retries: u32,
	/// Diagnostic message from the most recent failure.
	pub last_error: Option<String>,
	/// Creation time (unix seconds).
	pub created_at: u64,
	/// Last mutation time (unix seconds).
	pub updated_at: u64,
	/// Address of the deployed contract; populated on `Completed`.
	pub deployed_address: Option<Address>,
	/// Hash of the most recent deployment transaction.
	pub deployment_tx: Option<TransactionHash>,
	/// Gas consumed by the successful deployment.
	pub gas_used: Option<u64>,
	/// Effective gas price of the successful deployment, in wei.
	pub gas_price: Option<u128>,
}

impl DeploymentJob {
	/// Creates a new pending job with a fresh identifier.
	pub fn new(kind: JobKind, max_retries: u32) -> Self {
		let now = current_timestamp();
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			kind,
			status: JobStatus::Pending,
			retry_count: 0,
			max_retries,
			last_error: None,
			created_at: now,
			updated_at: now,
			deployed_address: None,
			deployment_tx: None,
			gas_used: None,
			gas_price: None,
		}
	}

	/// Whether the job is in a terminal state.
	pub fn is_terminal(&self) -> bool {
		matches!(self.status, JobStatus::Completed | JobStatus::Failed)
	}

	/// Whether a failed job still has retry budget left.
	pub fn is_retriable(&self) -> bool {
		self.retry_count < self.max_retries
	}

	/// Updates the modification timestamp.
	pub fn touch(&mut self) {
		self.updated_at = current_timestamp();
	}
}

/// Outcome of a successful deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
	/// Address of the deployed contract.
	pub contract_address: Address,
	/// Hash of the deployment transaction.
	pub tx_hash: TransactionHash,
	/// Block in which the transaction was included.
	pub block_number: u64,
	/// Gas actually consumed.
	pub gas_used: u64,
	/// Effective gas price paid, in wei.
	pub gas_price: u128,
	/// Wall-clock duration of the deployment in milliseconds.
	pub duration_ms: u64,
	/// Confirmations observed when the deployment was accepted.
	pub confirmations: u64,
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::utils::builders::JobBuilder;

	#[test]
	fn test_new_job_is_pending() {
		let job = JobBuilder::binary_market().build();
		assert_eq!(job.status, JobStatus::Pending);
		assert_eq!(job.retry_count, 0);
		assert!(job.last_error.is_none());
		assert!(!job.is_terminal());
	}

	#[test]
	fn test_job_ids_are_unique() {
		let a = JobBuilder::binary_market().build();
		let b = JobBuilder::binary_market().build();
		assert_ne!(a.id, b.id);
	}

	#[test]
	fn test_retriable_respects_budget() {
		let mut job = JobBuilder::binary_market().max_retries(2).build();
		assert!(job.is_retriable());
		job.retry_count = 2;
		assert!(!job.is_retriable());
	}

	#[test]
	fn test_kind_serde_round_trip() {
		let job = JobBuilder::copy_trading_vault().build();
		let json = serde_json::to_string(&job).unwrap();
		let back: DeploymentJob = serde_json::from_str(&json).unwrap();
		assert_eq!(back.kind, job.kind);
		assert_eq!(back.kind.name(), "copy_trading_vault");
	}
}
