//! Alert pipeline for the deployment orchestrator.
//!
//! This module creates, deduplicates, escalates and routes notifications
//! for queue and executor events. Channels are pluggable behind the
//! [`NotificationChannel`] trait; routing is determined by alert level.

use async_trait::async_trait;
use deployer_types::{Alert, AlertLevel, AlertStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod webhook;
}

pub use implementations::log::LogChannel;
pub use implementations::webhook::WebhookChatChannel;

/// Errors that can occur during alert operations.
#[derive(Debug, Error)]
pub enum AlertError {
	/// Error that occurs when a referenced alert does not exist.
	#[error("Alert not found: {0}")]
	NotFound(String),
	/// Error that occurs when one or more channel sends fail.
	#[error("Dispatch failed: {0}")]
	Dispatch(String),
}

/// The delivery channels an alert can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
	Email,
	Chat,
	Sms,
}

impl std::fmt::Display for ChannelKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ChannelKind::Email => "email",
			ChannelKind::Chat => "chat",
			ChannelKind::Sms => "sms",
		};
		write!(f, "{}", s)
	}
}

/// Trait defining the interface for notification channels.
///
/// Implementations deliver an alert to one destination. Each channel send
/// is attempted independently of the others.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
	/// Which routing slot this channel fills.
	fn kind(&self) -> ChannelKind;

	/// Delivers the alert.
	async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// A predicate rule evaluated against event payloads.
///
/// When the predicate matches, an alert with the rule's level and title is
/// created and triggered.
pub struct AlertRule {
	/// Rule name, used as the alert title.
	pub name: String,
	/// Disabled rules are skipped by evaluation.
	pub enabled: bool,
	/// Level of the alert raised on match.
	pub level: AlertLevel,
	/// Source recorded on the raised alert.
	pub source: String,
	/// Predicate over the event payload.
	pub predicate: Box<dyn Fn(&serde_json::Value) -> bool + Send + Sync>,
}

/// Service that owns alert records and dispatches notifications.
///
/// Deduplication is keyed by `(source, title)`: a repeated trigger for the
/// same key within the deduplication window is suppressed and logged, which
/// bounds notification storms from a single failure condition.
pub struct AlertManager {
	/// Channels available for routing.
	channels: Vec<Arc<dyn NotificationChannel>>,
	/// All alert records by id.
	alerts: RwLock<HashMap<String, Alert>>,
	/// Most recent dispatch time per dedup key.
	last_dispatch: RwLock<HashMap<(String, String), Instant>>,
	/// Window during which repeated identical alerts are suppressed.
	dedup_window: Duration,
	/// Predicate rules evaluated against event payloads.
	rules: Vec<AlertRule>,
}

impl AlertManager {
	/// Creates a new AlertManager with the given channels and window.
	pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, dedup_window: Duration) -> Self {
		Self {
			channels,
			alerts: RwLock::new(HashMap::new()),
			last_dispatch: RwLock::new(HashMap::new()),
			dedup_window,
			rules: Vec::new(),
		}
	}

	/// Adds predicate rules evaluated by [`AlertManager::evaluate_rules`].
	pub fn with_rules(mut self, rules: Vec<AlertRule>) -> Self {
		self.rules = rules;
		self
	}

	/// Creates an alert record without dispatching it. Pure construction.
	pub fn create(
		&self,
		title: impl Into<String>,
		description: impl Into<String>,
		level: AlertLevel,
		source: impl Into<String>,
		metadata: Option<HashMap<String, serde_json::Value>>,
	) -> Alert {
		Alert::new(title, description, level, source, metadata)
	}

	/// Triggers an alert: stores it and dispatches to its channels.
	///
	/// Returns `Ok(false)` when the alert was suppressed by deduplication.
	/// Returns an error when any attempted channel send fails; the alert
	/// record is stored either way.
	pub async fn trigger(&self, alert: Alert) -> Result<bool, AlertError> {
		let key = alert.dedup_key();

		{
			let last_dispatch = self.last_dispatch.read().await;
			if let Some(at) = last_dispatch.get(&key) {
				if at.elapsed() < self.dedup_window {
					tracing::debug!(
						source = %key.0,
						title = %key.1,
						"Suppressing duplicate alert within dedup window"
					);
					return Ok(false);
				}
			}
		}

		self.alerts
			.write()
			.await
			.insert(alert.id.clone(), alert.clone());
		self.last_dispatch.write().await.insert(key, Instant::now());

		self.dispatch(&alert).await?;
		Ok(true)
	}

	/// Marks an alert as acknowledged.
	pub async fn acknowledge(&self, id: &str) -> Result<(), AlertError> {
		let mut alerts = self.alerts.write().await;
		let alert = alerts
			.get_mut(id)
			.ok_or_else(|| AlertError::NotFound(id.to_string()))?;
		alert.status = AlertStatus::Acknowledged;
		Ok(())
	}

	/// Marks an alert as resolved.
	pub async fn resolve(&self, id: &str) -> Result<(), AlertError> {
		let mut alerts = self.alerts.write().await;
		let alert = alerts
			.get_mut(id)
			.ok_or_else(|| AlertError::NotFound(id.to_string()))?;
		alert.status = AlertStatus::Resolved;
		Ok(())
	}

	/// Escalates an alert to a strictly higher level.
	///
	/// A non-increasing `new_level` leaves the alert unchanged and returns
	/// `Ok(false)`. Escalation re-dispatches the alert, subject to the same
	/// deduplication check as a fresh trigger (the level change itself is
	/// never suppressed).
	pub async fn escalate(&self, id: &str, new_level: AlertLevel) -> Result<bool, AlertError> {
		let alert = {
			let mut alerts = self.alerts.write().await;
			let alert = alerts
				.get_mut(id)
				.ok_or_else(|| AlertError::NotFound(id.to_string()))?;

			if new_level <= alert.level {
				tracing::debug!(
					alert_id = %id,
					current = %alert.level,
					requested = %new_level,
					"Ignoring non-increasing escalation"
				);
				return Ok(false);
			}
			alert.level = new_level;
			alert.clone()
		};

		let key = alert.dedup_key();
		let suppressed = {
			let last_dispatch = self.last_dispatch.read().await;
			last_dispatch
				.get(&key)
				.map(|at| at.elapsed() < self.dedup_window)
				.unwrap_or(false)
		};

		if suppressed {
			tracing::debug!(
				source = %key.0,
				title = %key.1,
				"Escalation dispatch suppressed within dedup window"
			);
		} else {
			self.last_dispatch.write().await.insert(key, Instant::now());
			self.dispatch(&alert).await?;
		}

		Ok(true)
	}

	/// Runs all enabled rules against an event payload, triggering any that
	/// match. Returns the alerts that were raised.
	pub async fn evaluate_rules(&self, data: &serde_json::Value) -> Vec<Alert> {
		let mut raised = Vec::new();
		for rule in self.rules.iter().filter(|r| r.enabled) {
			if (rule.predicate)(data) {
				let alert = self.create(
					rule.name.clone(),
					format!("Rule '{}' matched", rule.name),
					rule.level,
					rule.source.clone(),
					None,
				);
				match self.trigger(alert.clone()).await {
					Ok(true) => raised.push(alert),
					Ok(false) => {},
					Err(e) => {
						tracing::warn!(rule = %rule.name, "Rule alert dispatch failed: {}", e);
						raised.push(alert);
					},
				}
			}
		}
		raised
	}

	/// Lists alert records, optionally filtered by source and status,
	/// newest first.
	pub async fn list(
		&self,
		source_filter: Option<&str>,
		status_filter: Option<AlertStatus>,
		limit: usize,
	) -> Vec<Alert> {
		let alerts = self.alerts.read().await;
		let mut matching: Vec<Alert> = alerts
			.values()
			.filter(|a| source_filter.map(|s| a.source == s).unwrap_or(true))
			.filter(|a| status_filter.map(|s| a.status == s).unwrap_or(true))
			.cloned()
			.collect();
		matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
		matching.truncate(limit);
		matching
	}

	/// Returns the stored alert record, if any.
	pub async fn get(&self, id: &str) -> Option<Alert> {
		self.alerts.read().await.get(id).cloned()
	}

	/// The channel kinds an alert of the given level is routed to.
	fn routes_for(level: AlertLevel) -> &'static [ChannelKind] {
		match level {
			AlertLevel::Critical => &[ChannelKind::Email, ChannelKind::Chat, ChannelKind::Sms],
			AlertLevel::Warning => &[ChannelKind::Email, ChannelKind::Chat],
			AlertLevel::Info => &[ChannelKind::Chat],
		}
	}

	/// Sends the alert to every configured channel its level routes to.
	/// Each send is attempted independently; any failure fails the overall
	/// dispatch after all attempts.
	async fn dispatch(&self, alert: &Alert) -> Result<(), AlertError> {
		let routes = Self::routes_for(alert.level);
		let mut failures = Vec::new();

		for channel in self
			.channels
			.iter()
			.filter(|c| routes.contains(&c.kind()))
		{
			if let Err(e) = channel.send(alert).await {
				tracing::warn!(
					channel = %channel.kind(),
					alert_id = %alert.id,
					"Channel send failed: {}",
					e
				);
				failures.push(format!("{}: {}", channel.kind(), e));
			}
		}

		if failures.is_empty() {
			Ok(())
		} else {
			Err(AlertError::Dispatch(failures.join("; ")))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// Channel that records every alert it is asked to deliver.
	struct RecordingChannel {
		kind: ChannelKind,
		sent: Arc<AtomicUsize>,
		fail: bool,
	}

	#[async_trait]
	impl NotificationChannel for RecordingChannel {
		fn kind(&self) -> ChannelKind {
			self.kind
		}

		async fn send(&self, _alert: &Alert) -> Result<(), AlertError> {
			if self.fail {
				return Err(AlertError::Dispatch("channel down".to_string()));
			}
			self.sent.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	fn channel(kind: ChannelKind, sent: Arc<AtomicUsize>) -> Arc<dyn NotificationChannel> {
		Arc::new(RecordingChannel {
			kind,
			sent,
			fail: false,
		})
	}

	fn full_manager(window: Duration) -> (AlertManager, [Arc<AtomicUsize>; 3]) {
		let counters = [
			Arc::new(AtomicUsize::new(0)),
			Arc::new(AtomicUsize::new(0)),
			Arc::new(AtomicUsize::new(0)),
		];
		let manager = AlertManager::new(
			vec![
				channel(ChannelKind::Email, counters[0].clone()),
				channel(ChannelKind::Chat, counters[1].clone()),
				channel(ChannelKind::Sms, counters[2].clone()),
			],
			window,
		);
		(manager, counters)
	}

	#[tokio::test]
	async fn test_routing_by_level() {
		let (manager, [email, chat, sms]) = full_manager(Duration::from_secs(60));

		let info = manager.create("a", "d", AlertLevel::Info, "s1", None);
		manager.trigger(info).await.unwrap();
		assert_eq!((email.load(Ordering::SeqCst), chat.load(Ordering::SeqCst), sms.load(Ordering::SeqCst)), (0, 1, 0));

		let warning = manager.create("b", "d", AlertLevel::Warning, "s2", None);
		manager.trigger(warning).await.unwrap();
		assert_eq!((email.load(Ordering::SeqCst), chat.load(Ordering::SeqCst), sms.load(Ordering::SeqCst)), (1, 2, 0));

		let critical = manager.create("c", "d", AlertLevel::Critical, "s3", None);
		manager.trigger(critical).await.unwrap();
		assert_eq!((email.load(Ordering::SeqCst), chat.load(Ordering::SeqCst), sms.load(Ordering::SeqCst)), (2, 3, 1));
	}

	#[tokio::test(start_paused = true)]
	async fn test_dedup_suppresses_within_window() {
		let (manager, [_, chat, _]) = full_manager(Duration::from_secs(60));

		let first = manager.create("same title", "d", AlertLevel::Info, "source", None);
		assert!(manager.trigger(first).await.unwrap());

		let second = manager.create("same title", "d", AlertLevel::Info, "source", None);
		assert!(!manager.trigger(second).await.unwrap());
		assert_eq!(chat.load(Ordering::SeqCst), 1);

		// After the window elapses a third trigger dispatches again
		tokio::time::advance(Duration::from_secs(61)).await;
		let third = manager.create("same title", "d", AlertLevel::Info, "source", None);
		assert!(manager.trigger(third).await.unwrap());
		assert_eq!(chat.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_dedup_key_distinguishes_sources() {
		let (manager, [_, chat, _]) = full_manager(Duration::from_secs(60));

		let a = manager.create("same title", "d", AlertLevel::Info, "source-a", None);
		let b = manager.create("same title", "d", AlertLevel::Info, "source-b", None);
		assert!(manager.trigger(a).await.unwrap());
		assert!(manager.trigger(b).await.unwrap());
		assert_eq!(chat.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_partial_channel_failure_is_reported() {
		let sent = Arc::new(AtomicUsize::new(0));
		let manager = AlertManager::new(
			vec![
				Arc::new(RecordingChannel {
					kind: ChannelKind::Email,
					sent: sent.clone(),
					fail: true,
				}),
				channel(ChannelKind::Chat, sent.clone()),
			],
			Duration::from_secs(60),
		);

		let alert = manager.create("t", "d", AlertLevel::Warning, "s", None);
		let result = manager.trigger(alert.clone()).await;

		assert!(matches!(result, Err(AlertError::Dispatch(_))));
		// The healthy channel was still attempted
		assert_eq!(sent.load(Ordering::SeqCst), 1);
		// The record exists despite the dispatch failure
		assert!(manager.get(&alert.id).await.is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn test_escalate_to_lower_level_is_noop() {
		let (manager, _) = full_manager(Duration::from_secs(60));

		let alert = manager.create("t", "d", AlertLevel::Warning, "s", None);
		let id = alert.id.clone();
		manager.trigger(alert).await.unwrap();

		assert!(!manager.escalate(&id, AlertLevel::Info).await.unwrap());
		assert_eq!(manager.get(&id).await.unwrap().level, AlertLevel::Warning);
	}

	#[tokio::test(start_paused = true)]
	async fn test_escalate_raises_level_and_redispatches() {
		let (manager, [email, chat, sms]) = full_manager(Duration::from_secs(60));

		let alert = manager.create("t", "d", AlertLevel::Warning, "s", None);
		let id = alert.id.clone();
		manager.trigger(alert).await.unwrap();
		assert_eq!(sms.load(Ordering::SeqCst), 0);

		// Move past the dedup window so the escalation dispatch goes out
		tokio::time::advance(Duration::from_secs(61)).await;
		assert!(manager.escalate(&id, AlertLevel::Critical).await.unwrap());

		assert_eq!(manager.get(&id).await.unwrap().level, AlertLevel::Critical);
		assert_eq!(email.load(Ordering::SeqCst), 2);
		assert_eq!(chat.load(Ordering::SeqCst), 2);
		assert_eq!(sms.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_escalate_within_window_changes_level_without_dispatch() {
		let (manager, [_, chat, sms]) = full_manager(Duration::from_secs(60));

		let alert = manager.create("t", "d", AlertLevel::Warning, "s", None);
		let id = alert.id.clone();
		manager.trigger(alert).await.unwrap();

		assert!(manager.escalate(&id, AlertLevel::Critical).await.unwrap());
		assert_eq!(manager.get(&id).await.unwrap().level, AlertLevel::Critical);
		// Suppressed by dedup: no additional sends
		assert_eq!(chat.load(Ordering::SeqCst), 1);
		assert_eq!(sms.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_acknowledge_and_resolve() {
		let (manager, _) = full_manager(Duration::from_secs(60));

		let alert = manager.create("t", "d", AlertLevel::Info, "s", None);
		let id = alert.id.clone();
		manager.trigger(alert).await.unwrap();

		manager.acknowledge(&id).await.unwrap();
		assert_eq!(
			manager.get(&id).await.unwrap().status,
			AlertStatus::Acknowledged
		);

		manager.resolve(&id).await.unwrap();
		assert_eq!(manager.get(&id).await.unwrap().status, AlertStatus::Resolved);

		assert!(matches!(
			manager.acknowledge("missing").await,
			Err(AlertError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_list_filters_and_limits() {
		let (manager, _) = full_manager(Duration::from_secs(60));

		for i in 0..3 {
			let alert = manager.create(
				format!("t{}", i),
				"d",
				AlertLevel::Info,
				"source-a",
				None,
			);
			manager.trigger(alert).await.unwrap();
		}
		let other = manager.create("other", "d", AlertLevel::Info, "source-b", None);
		let other_id = other.id.clone();
		manager.trigger(other).await.unwrap();
		manager.acknowledge(&other_id).await.unwrap();

		assert_eq!(manager.list(Some("source-a"), None, 10).await.len(), 3);
		assert_eq!(manager.list(None, None, 2).await.len(), 2);
		assert_eq!(
			manager
				.list(None, Some(AlertStatus::Acknowledged), 10)
				.await
				.len(),
			1
		);
	}

	#[tokio::test]
	async fn test_evaluate_rules_triggers_matches_only() {
		let (manager, [_, chat, _]) = full_manager(Duration::from_secs(60));
		let manager = manager.with_rules(vec![
			AlertRule {
				name: "gas-spike".to_string(),
				enabled: true,
				level: AlertLevel::Warning,
				source: "rules".to_string(),
				predicate: Box::new(|data| {
					data.get("gas_price_gwei")
						.and_then(|v| v.as_f64())
						.map(|v| v > 400.0)
						.unwrap_or(false)
				}),
			},
			AlertRule {
				name: "disabled-rule".to_string(),
				enabled: false,
				level: AlertLevel::Critical,
				source: "rules".to_string(),
				predicate: Box::new(|_| true),
			},
		]);

		let raised = manager
			.evaluate_rules(&serde_json::json!({ "gas_price_gwei": 450.0 }))
			.await;
		assert_eq!(raised.len(), 1);
		assert_eq!(raised[0].title, "gas-spike");

		let none = manager
			.evaluate_rules(&serde_json::json!({ "gas_price_gwei": 50.0 }))
			.await;
		assert!(none.is_empty());
		assert_eq!(chat.load(Ordering::SeqCst), 1);
	}
}
