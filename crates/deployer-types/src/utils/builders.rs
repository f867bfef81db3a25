//! Builder utilities for creating test and production instances of
//! orchestrator types.

use crate::chain::{Address, Transaction};
use crate::job::{
	BinaryMarketParams, CopyTradingVaultParams, DeploymentJob, JobKind, JobStatus,
};
use crate::utils::current_timestamp;
use alloy_primitives::U256;

/// Builder for creating `Transaction` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
	to: Option<Address>,
	data: Vec<u8>,
	value: U256,
	chain_id: u64,
	nonce: Option<u64>,
	gas_limit: Option<u64>,
	gas_price: Option<u128>,
	max_fee_per_gas: Option<u128>,
	max_priority_fee_per_gas: Option<u128>,
}

impl Default for TransactionBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl TransactionBuilder {
	/// Creates a new `TransactionBuilder` with default values.
	pub fn new() -> Self {
		Self {
			to: None,
			data: Vec::new(),
			value: U256::ZERO,
			chain_id: 1,
			nonce: None,
			gas_limit: None,
			gas_price: None,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}

	/// Sets the recipient address (leave unset for contract creation).
	pub fn to(mut self, to: Address) -> Self {
		self.to = Some(to);
		self
	}

	/// Sets the transaction data/calldata.
	pub fn data(mut self, data: Vec<u8>) -> Self {
		self.data = data;
		self
	}

	/// Sets the value to transfer.
	pub fn value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	/// Sets the chain ID.
	pub fn chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Sets the nonce.
	pub fn nonce(mut self, nonce: u64) -> Self {
		self.nonce = Some(nonce);
		self
	}

	/// Sets the gas limit.
	pub fn gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}

	/// Sets a legacy gas price in wei.
	pub fn gas_price(mut self, wei: u128) -> Self {
		self.gas_price = Some(wei);
		self
	}

	/// Sets fee-market pricing in wei.
	pub fn eip1559(mut self, max_fee: u128, priority_fee: u128) -> Self {
		self.max_fee_per_gas = Some(max_fee);
		self.max_priority_fee_per_gas = Some(priority_fee);
		self
	}

	/// Builds the `Transaction`.
	pub fn build(self) -> Transaction {
		Transaction {
			to: self.to,
			data: self.data,
			value: self.value,
			chain_id: self.chain_id,
			nonce: self.nonce,
			gas_limit: self.gas_limit,
			gas_price: self.gas_price,
			max_fee_per_gas: self.max_fee_per_gas,
			max_priority_fee_per_gas: self.max_priority_fee_per_gas,
		}
	}
}

/// Builder for creating `DeploymentJob` fixtures.
///
/// Defaults produce a valid pending binary-market job with an end time one
/// day in the future.
#[derive(Debug, Clone)]
pub struct JobBuilder {
	kind: JobKind,
	status: JobStatus,
	retry_count: u32,
	max_retries: u32,
}

impl JobBuilder {
	/// Starts from a valid binary-market parameter set.
	pub fn binary_market() -> Self {
		Self {
			kind: JobKind::BinaryMarket(BinaryMarketParams {
				title: "Will it resolve yes?".to_string(),
				description: "Resolves yes if the condition holds at end time.".to_string(),
				end_time: current_timestamp() + 86_400,
				oracle: Address(vec![0x11; 20]),
				initial_liquidity: U256::from(1_000_000_000_000_000_000u128),
			}),
			status: JobStatus::Pending,
			retry_count: 0,
			max_retries: 3,
		}
	}

	/// Starts from a valid copy-trading-vault parameter set.
	pub fn copy_trading_vault() -> Self {
		Self {
			kind: JobKind::CopyTradingVault(CopyTradingVaultParams {
				leader: Address(vec![0x22; 20]),
				name: "Leader vault".to_string(),
				performance_fee_bps: 1_000,
				management_fee_bps: 200,
			}),
			status: JobStatus::Pending,
			retry_count: 0,
			max_retries: 3,
		}
	}

	/// Replaces the job kind entirely.
	pub fn kind(mut self, kind: JobKind) -> Self {
		self.kind = kind;
		self
	}

	/// Sets the job status.
	pub fn status(mut self, status: JobStatus) -> Self {
		self.status = status;
		self
	}

	/// Sets the current retry count.
	pub fn retry_count(mut self, retry_count: u32) -> Self {
		self.retry_count = retry_count;
		self
	}

	/// Sets the retry budget.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	/// Builds the `DeploymentJob`.
	pub fn build(self) -> DeploymentJob {
		let mut job = DeploymentJob::new(self.kind, self.max_retries);
		job.status = self.status;
		job.retry_count = self.retry_count;
		job
	}
}
