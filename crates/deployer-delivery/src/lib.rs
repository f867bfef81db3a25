//! Transaction delivery module for the deployment orchestrator.
//!
//! This module handles interaction with the blockchain: querying fee data,
//! estimating gas, submitting deployment transactions and fetching
//! receipts. It provides an abstraction over the ledger provider so the
//! executor and estimator can be tested against mocks.

use async_trait::async_trait;
use deployer_types::{Address, FeeData, Transaction, TransactionHash, TransactionReceipt};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

pub use implementations::evm::alloy::AlloyChainProvider;

/// Errors that can occur during delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when the provider configuration is unusable.
	#[error("Invalid configuration: {0}")]
	Configuration(String),
}

/// Capability interface over the ledger provider and signer.
///
/// The implementation owns the deployer wallet: `submit` signs and sends
/// in one step, the way a filler-equipped provider stack works. The
/// deployer account is a shared, non-reentrant resource; callers must not
/// race concurrent submissions against the same instance.
#[async_trait]
#[cfg_attr(feature = "testing", mockall::automock)]
pub trait ChainProvider: Send + Sync {
	/// Reads current network fee data.
	///
	/// The fee-market fields are `None` on networks without EIP-1559-style
	/// pricing; callers decide whether that is acceptable.
	async fn fee_data(&self) -> Result<FeeData, DeliveryError>;

	/// Estimates gas units for a transaction without submitting it.
	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError>;

	/// Signs and submits a transaction, returning its hash.
	///
	/// Returns as soon as the remote accepts the transaction; confirmation
	/// is observed separately through `transaction_receipt`.
	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Retrieves the receipt for a transaction if it has been mined.
	async fn transaction_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Returns the deployed bytecode at an address (empty if none).
	async fn get_code(&self, address: &Address) -> Result<Vec<u8>, DeliveryError>;

	/// Gets the current block number.
	async fn block_number(&self) -> Result<u64, DeliveryError>;
}
