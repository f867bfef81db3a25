//! Transaction delivery types for the deployment orchestrator.
//!
//! This module defines types related to blockchain transaction submission
//! and monitoring, including transaction hashes, receipts and fee data.

use crate::chain::Address;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes to support different chain formats.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl std::fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Fixed-size hash type for log topics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct H256(pub [u8; 32]);

/// Event log emitted by smart contracts.
///
/// Contains event data and indexed parameters (topics).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Log {
	/// Contract address that emitted the log.
	pub address: Address,
	/// Indexed event parameters.
	/// Topic[0] is typically the event signature hash.
	pub topics: Vec<H256>,
	/// Non-indexed event data.
	pub data: Vec<u8>,
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a
/// block, including its success status, gas consumption and, for deployment
/// transactions, the created contract address.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Gas actually consumed by the transaction.
	pub gas_used: u64,
	/// Address of the created contract for direct creation transactions.
	pub contract_address: Option<Address>,
	/// Event logs emitted during transaction execution.
	pub logs: Vec<Log>,
}

/// Current network fee data as reported by the ledger provider.
///
/// Legacy pricing always carries a `gas_price`; the fee-market fields are
/// absent on networks that do not support EIP-1559-style pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeeData {
	/// Legacy gas price in wei.
	pub gas_price: u128,
	/// Maximum fee per gas in wei (fee-market pricing).
	pub max_fee_per_gas: Option<u128>,
	/// Maximum priority fee per gas in wei (fee-market pricing).
	pub max_priority_fee_per_gas: Option<u128>,
}
