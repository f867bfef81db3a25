//! Common types module for the deployment orchestrator.
//!
//! This module defines the core data types and structures used throughout
//! the orchestration system. It provides a centralized location for shared
//! types to ensure consistency across all components.

/// Alert types for the notification pipeline.
pub mod alert;
/// Chain-level types: addresses, transactions and their alloy conversions.
pub mod chain;
/// Transaction delivery types: hashes, receipts and fee data.
pub mod delivery;
/// Event types for inter-service communication.
pub mod events;
/// Fee estimation types.
pub mod fees;
/// Deployment job types: kinds, parameters, status and results.
pub mod job;
/// Secure string type for handling sensitive data.
pub mod secret;
/// Utility functions for common type conversions.
pub mod utils;

// Re-export all types for convenient access
pub use alert::{Alert, AlertLevel, AlertStatus};
pub use chain::{Address, Transaction};
pub use delivery::{FeeData, Log, TransactionHash, TransactionReceipt, H256};
pub use events::{AlertEvent, DeliveryEvent, DeployerEvent, QueueEvent};
pub use fees::FeeQuote;
pub use job::{
	BinaryMarketParams, CopyTradingVaultParams, DeploymentJob, DeploymentResult, JobKind,
	JobStatus,
};
pub use secret::SecretString;
pub use utils::{
	current_timestamp, gwei_to_wei, parse_address, truncate_id, wei_to_eth, with_0x_prefix,
	without_0x_prefix, GWEI,
};
