//! Alert types for the notification pipeline.

use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity of an alert.
///
/// The derived ordering (`Info < Warning < Critical`) is what escalation
/// checks compare against; a level only increases via explicit escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
	/// Informational, routed to low-urgency channels only.
	Info,
	/// Needs attention but not immediately actionable.
	Warning,
	/// Requires operator action.
	Critical,
}

impl std::fmt::Display for AlertLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			AlertLevel::Info => "info",
			AlertLevel::Warning => "warning",
			AlertLevel::Critical => "critical",
		};
		write!(f, "{}", s)
	}
}

/// Handling status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
	/// Dispatched and awaiting acknowledgement.
	Active,
	/// An operator has seen the alert.
	Acknowledged,
	/// The underlying condition is resolved.
	Resolved,
}

/// A notification event raised by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
	/// Unique alert identifier.
	pub id: String,
	/// Short human-readable summary; part of the deduplication key.
	pub title: String,
	/// Longer description of the condition.
	pub description: String,
	/// Severity level.
	pub level: AlertLevel,
	/// Handling status.
	pub status: AlertStatus,
	/// Component that raised the alert; part of the deduplication key.
	pub source: String,
	/// Creation time (unix seconds).
	pub timestamp: u64,
	/// Structured context attached to the alert.
	pub metadata: HashMap<String, serde_json::Value>,
}

impl Alert {
	/// Creates a new active alert with a fresh identifier.
	pub fn new(
		title: impl Into<String>,
		description: impl Into<String>,
		level: AlertLevel,
		source: impl Into<String>,
		metadata: Option<HashMap<String, serde_json::Value>>,
	) -> Self {
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			title: title.into(),
			description: description.into(),
			level,
			status: AlertStatus::Active,
			source: source.into(),
			timestamp: current_timestamp(),
			metadata: metadata.unwrap_or_default(),
		}
	}

	/// The deduplication key for this alert.
	pub fn dedup_key(&self) -> (String, String) {
		(self.source.clone(), self.title.clone())
	}
}
