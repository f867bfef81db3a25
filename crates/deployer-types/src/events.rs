//! Event types for inter-service communication.
//!
//! This module defines the event system used by the orchestrator for
//! asynchronous communication between components. Events flow through an
//! event bus allowing services to react to state changes in other parts
//! of the system.

use crate::alert::AlertLevel;
use crate::delivery::TransactionHash;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all orchestrator events.
///
/// Events are categorized by the service that produces them, allowing
/// consumers to filter and handle specific event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeployerEvent {
	/// Events from the deployment queue.
	Queue(QueueEvent),
	/// Events from the transaction delivery path.
	Delivery(DeliveryEvent),
	/// Events from the alert pipeline.
	Alert(AlertEvent),
}

/// Events related to queue processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueEvent {
	/// A new job has been accepted into the queue.
	JobQueued { job_id: String, kind: String },
	/// A job has been picked up by the executor.
	JobStarted { job_id: String },
	/// A job completed; the contract is deployed and confirmed.
	JobCompleted {
		job_id: String,
		contract_address: String,
		tx_hash: TransactionHash,
	},
	/// A job failed a retryable attempt and went back to the pending pool.
	JobRequeued {
		job_id: String,
		retry_count: u32,
		error: String,
	},
	/// A job was finalized as failed.
	JobFailed { job_id: String, error: String },
}

/// Events related to transaction delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeliveryEvent {
	/// A deployment transaction has been submitted and is pending confirmation.
	TransactionSubmitted {
		job_id: String,
		tx_hash: TransactionHash,
	},
	/// A deployment transaction reached the confirmation threshold.
	TransactionConfirmed {
		job_id: String,
		tx_hash: TransactionHash,
		block_number: u64,
		confirmations: u64,
	},
	/// A deployment transaction failed or timed out.
	TransactionFailed { job_id: String, error: String },
}

/// Events related to alert dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AlertEvent {
	/// An alert was dispatched to its channels.
	Dispatched {
		alert_id: String,
		level: AlertLevel,
		title: String,
	},
	/// An alert was suppressed by deduplication.
	Suppressed { source: String, title: String },
}
