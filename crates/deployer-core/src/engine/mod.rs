//! Engine wiring and the periodic processing loop.
//!
//! The engine owns the constructed pipeline (store, provider, estimator,
//! executor, queue, alert manager) and drives the queue on a fixed
//! interval. Components carry injected collaborators; there is no
//! process-wide state.

pub mod event_bus;

pub use event_bus::EventBus;

use crate::executor::{DeploymentExecutor, ExecutorConfig};
use crate::queue::{DeploymentQueue, QueueConfig};
use deployer_alerts::{AlertManager, LogChannel, NotificationChannel, WebhookChatChannel};
use deployer_config::Config;
use deployer_delivery::{AlloyChainProvider, DeliveryError};
use deployer_pricing::{FeeConfig, FeeEstimator};
use deployer_storage::{MemoryJobStore, StaticOracleWhitelist};
use deployer_types::{
	parse_address, truncate_id, AlertEvent, DeliveryEvent, DeployerEvent, QueueEvent,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;

/// Default capacity of the engine event bus.
const EVENT_BUS_CAPACITY: usize = 256;

/// Errors that can occur while assembling or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error from the delivery layer while connecting the provider.
	#[error("Delivery error: {0}")]
	Delivery(#[from] DeliveryError),
	/// Error in the supplied configuration.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// The assembled deployment engine.
pub struct Engine {
	queue: Arc<DeploymentQueue>,
	alerts: Arc<AlertManager>,
	event_bus: EventBus,
	process_interval: Duration,
}

impl Engine {
	/// Creates an engine from pre-built components.
	pub fn new(
		queue: Arc<DeploymentQueue>,
		alerts: Arc<AlertManager>,
		event_bus: EventBus,
		process_interval: Duration,
	) -> Self {
		Self {
			queue,
			alerts,
			event_bus,
			process_interval,
		}
	}

	/// Assembles the full pipeline from configuration.
	pub fn from_config(config: &Config) -> Result<Self, EngineError> {
		let provider = Arc::new(AlloyChainProvider::connect(
			&config.network.rpc_url,
			config.network.chain_id,
			&config.network.private_key,
		)?);

		let estimator = Arc::new(FeeEstimator::new(
			provider.clone(),
			FeeConfig::with_gwei_bounds(
				config.fees.price_multiplier,
				config.fees.limit_multiplier,
				config.fees.min_gas_price_gwei,
				config.fees.max_gas_price_gwei,
				config.fees.reference_fiat_price,
				config.fees.default_gas_limit,
			),
		));

		let whitelist = config
			.executor
			.oracle_whitelist
			.iter()
			.map(|entry| parse_address(entry))
			.collect::<Result<Vec<_>, _>>()
			.map_err(EngineError::Config)?;
		let whitelist = Arc::new(StaticOracleWhitelist::new(whitelist));

		let market_factory =
			parse_address(&config.network.market_factory).map_err(EngineError::Config)?;
		let vault_factory =
			parse_address(&config.network.vault_factory).map_err(EngineError::Config)?;

		let mut channels: Vec<Arc<dyn NotificationChannel>> =
			vec![Arc::new(LogChannel::email()), Arc::new(LogChannel::sms())];
		match &config.alerts.chat_webhook_url {
			Some(url) => channels.push(Arc::new(
				WebhookChatChannel::new(url.clone())
					.map_err(|e| EngineError::Config(e.to_string()))?,
			)),
			None => channels.push(Arc::new(LogChannel::chat())),
		}
		let alerts = Arc::new(AlertManager::new(
			channels,
			Duration::from_millis(config.alerts.dedup_window_ms),
		));

		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

		let executor = Arc::new(DeploymentExecutor::new(
			provider,
			estimator,
			whitelist,
			event_bus.clone(),
			ExecutorConfig {
				chain_id: config.network.chain_id,
				timeout: Duration::from_secs(config.executor.timeout_seconds),
				confirmation_blocks: config.executor.confirmation_blocks,
				poll_interval: Duration::from_secs(config.executor.poll_interval_secs),
				submit_attempts: config.executor.submit_attempts,
				submit_retry_delay: Duration::from_millis(config.queue.retry_delay_ms),
				market_factory,
				vault_factory,
			},
		));

		let queue = Arc::new(DeploymentQueue::new(
			Arc::new(MemoryJobStore::new()),
			executor,
			alerts.clone(),
			event_bus.clone(),
			QueueConfig {
				batch_size: config.queue.batch_size,
				max_retries: config.queue.max_retries,
			},
		));

		Ok(Self::new(
			queue,
			alerts,
			event_bus,
			Duration::from_secs(config.queue.process_interval_secs),
		))
	}

	/// The queue, for the API layer to enqueue and inspect jobs.
	pub fn queue(&self) -> Arc<DeploymentQueue> {
		self.queue.clone()
	}

	/// The alert manager, for the API layer to list and acknowledge alerts.
	pub fn alerts(&self) -> Arc<AlertManager> {
		self.alerts.clone()
	}

	/// A handle to the engine event bus.
	pub fn event_bus(&self) -> EventBus {
		self.event_bus.clone()
	}

	/// Runs the periodic processing loop until shutdown is signalled.
	///
	/// A single interval trigger drives `process_batch`; overlapping ticks
	/// are absorbed by the queue's re-entrancy guard. Events published by
	/// the pipeline are logged here so operators get one coherent stream.
	#[instrument(skip_all)]
	pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
		let mut interval = tokio::time::interval(self.process_interval);
		let mut events = self.event_bus.subscribe();
		tracing::info!(
			interval_secs = self.process_interval.as_secs(),
			"Deployment engine started"
		);

		loop {
			tokio::select! {
				_ = interval.tick() => {
					self.queue.process_batch().await;
				}
				Ok(event) = events.recv() => {
					Self::log_event(&event);
				}
				_ = shutdown.changed() => {
					if *shutdown.borrow() {
						tracing::info!("Deployment engine shutting down");
						break;
					}
				}
			}
		}
	}

	fn log_event(event: &DeployerEvent) {
		match event {
			DeployerEvent::Queue(QueueEvent::JobQueued { job_id, kind }) => {
				tracing::info!(job_id = %truncate_id(job_id), kind = %kind, "Job queued");
			},
			DeployerEvent::Queue(QueueEvent::JobStarted { job_id }) => {
				tracing::debug!(job_id = %truncate_id(job_id), "Job started");
			},
			DeployerEvent::Queue(QueueEvent::JobCompleted {
				job_id,
				contract_address,
				..
			}) => {
				tracing::info!(
					job_id = %truncate_id(job_id),
					contract = %contract_address,
					"Job completed"
				);
			},
			DeployerEvent::Queue(QueueEvent::JobRequeued {
				job_id,
				retry_count,
				error,
			}) => {
				tracing::warn!(
					job_id = %truncate_id(job_id),
					retry_count,
					"Job re-queued: {}",
					error
				);
			},
			DeployerEvent::Queue(QueueEvent::JobFailed { job_id, error }) => {
				tracing::error!(job_id = %truncate_id(job_id), "Job failed: {}", error);
			},
			DeployerEvent::Delivery(DeliveryEvent::TransactionSubmitted { job_id, tx_hash }) => {
				tracing::info!(
					job_id = %truncate_id(job_id),
					tx_hash = %tx_hash,
					"Submitted transaction"
				);
			},
			DeployerEvent::Delivery(DeliveryEvent::TransactionConfirmed {
				job_id,
				tx_hash,
				confirmations,
				..
			}) => {
				tracing::info!(
					job_id = %truncate_id(job_id),
					tx_hash = %tx_hash,
					confirmations,
					"Confirmed"
				);
			},
			DeployerEvent::Delivery(DeliveryEvent::TransactionFailed { job_id, error }) => {
				tracing::error!(job_id = %truncate_id(job_id), "Transaction failed: {}", error);
			},
			DeployerEvent::Alert(AlertEvent::Dispatched {
				alert_id,
				level,
				title,
			}) => {
				tracing::info!(
					alert_id = %truncate_id(alert_id),
					level = %level,
					title = %title,
					"Alert dispatched"
				);
			},
			DeployerEvent::Alert(AlertEvent::Suppressed { source, title }) => {
				tracing::debug!(source = %source, title = %title, "Alert suppressed");
			},
		}
	}
}
