//! Deployment executor: validation, submission and confirmation wait.
//!
//! The executor turns a validated deployment job into a factory call on
//! chain: it obtains a fee quote, signs and submits the transaction
//! through the provider, then polls for the receipt until the configured
//! confirmation depth is reached or the timeout elapses.

use crate::engine::event_bus::EventBus;
use crate::retry::run_with_retry;
use alloy_primitives::{keccak256, U256};
use deployer_delivery::ChainProvider;
use deployer_pricing::{EstimationError, FeeEstimator};
use deployer_storage::OracleWhitelist;
use deployer_types::{
	current_timestamp, truncate_id, Address, BinaryMarketParams, CopyTradingVaultParams,
	DeliveryEvent, DeployerEvent, DeploymentJob, DeploymentResult, FeeQuote, JobKind, Transaction,
	TransactionHash, TransactionReceipt,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::instrument;

/// Maximum length of a market title.
const TITLE_MAX_LEN: usize = 200;
/// Maximum length of a market description.
const DESCRIPTION_MAX_LEN: usize = 1_000;
/// Maximum length of a vault name.
const VAULT_NAME_MAX_LEN: usize = 100;
/// Fee percentages are expressed in basis points of this total.
const MAX_TOTAL_FEE_BPS: u32 = 10_000;

/// Errors that can occur during deployment execution.
#[derive(Debug, Error)]
pub enum ExecutorError {
	/// Job parameters are invalid. Terminal: never consumes retry budget.
	#[error("Validation failed: {0}")]
	Validation(String),
	/// The fee/gas query failed. Retryable at the queue level.
	#[error(transparent)]
	Estimation(#[from] EstimationError),
	/// The remote rejected or reverted the transaction. Retryable.
	#[error("Submission failed: {0}")]
	Submission(String),
	/// No qualifying confirmation was observed within the timeout. Retryable;
	/// the transaction may still confirm later, so the next attempt re-checks
	/// its receipt before resubmitting.
	#[error("No qualifying confirmation within {waited_secs}s")]
	Timeout { waited_secs: u64 },
}

impl ExecutorError {
	/// Whether the queue may spend retry budget on this failure.
	pub fn is_retryable(&self) -> bool {
		!matches!(self, ExecutorError::Validation(_))
	}
}

/// Configuration for the deployment executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
	/// Chain ID deployment transactions are bound to.
	pub chain_id: u64,
	/// Maximum wall-clock wait for confirmation of one deployment.
	pub timeout: Duration,
	/// Confirmations required before a deployment counts as final.
	pub confirmation_blocks: u64,
	/// Interval between receipt polls.
	pub poll_interval: Duration,
	/// Bounded attempts for the submission RPC itself.
	pub submit_attempts: u32,
	/// Base backoff delay between submission attempts.
	pub submit_retry_delay: Duration,
	/// Factory contract that instantiates binary markets.
	pub market_factory: Address,
	/// Factory contract that instantiates copy-trading vaults.
	pub vault_factory: Address,
}

/// Service that executes deployment jobs against the chain.
///
/// The deployer account behind the provider is a shared, non-reentrant
/// resource; callers run deployments sequentially.
pub struct DeploymentExecutor {
	provider: Arc<dyn ChainProvider>,
	estimator: Arc<FeeEstimator>,
	whitelist: Arc<dyn OracleWhitelist>,
	event_bus: EventBus,
	config: ExecutorConfig,
}

impl DeploymentExecutor {
	/// Creates a new DeploymentExecutor with the given collaborators.
	pub fn new(
		provider: Arc<dyn ChainProvider>,
		estimator: Arc<FeeEstimator>,
		whitelist: Arc<dyn OracleWhitelist>,
		event_bus: EventBus,
		config: ExecutorConfig,
	) -> Self {
		Self {
			provider,
			estimator,
			whitelist,
			event_bus,
			config,
		}
	}

	/// Deploys the contract described by the job.
	///
	/// Updates `job.deployment_tx` and `job.gas_price` as soon as a
	/// transaction is submitted so a later attempt can re-check the
	/// receipt instead of resubmitting after a timeout.
	#[instrument(skip_all, fields(job_id = %truncate_id(&job.id), kind = job.kind.name()))]
	pub async fn deploy(
		&self,
		job: &mut DeploymentJob,
	) -> Result<DeploymentResult, ExecutorError> {
		let started = Instant::now();

		self.validate(&job.kind).await?;

		// A previous attempt may have been mined after its timeout fired;
		// resuming from its receipt avoids a duplicate deployment.
		if let Some(prev_hash) = job.deployment_tx.clone() {
			if let Some(result) = self.resume_previous_attempt(job, &prev_hash, started).await? {
				return Ok(result);
			}
		}

		let probe_tx = self.build_transaction(&job.kind, None);
		// The fee query is the first of the two bounded suspension points;
		// the confirmation poll below is the second.
		let quote = tokio::time::timeout(self.config.timeout, self.estimator.quote(&probe_tx))
			.await
			.map_err(|_| ExecutorError::Timeout {
				waited_secs: self.config.timeout.as_secs(),
			})??;
		let tx = self.build_transaction(&job.kind, Some(&quote));

		let tx_hash = run_with_retry(
			"submit deployment",
			self.config.submit_attempts,
			self.config.submit_retry_delay,
			|| {
				let tx = tx.clone();
				async move { self.provider.submit(tx).await }
			},
		)
		.await
		.map_err(|e| ExecutorError::Submission(e.to_string()))?;

		job.deployment_tx = Some(tx_hash.clone());
		job.gas_price = Some(quote.effective_price());
		self.event_bus
			.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionSubmitted {
				job_id: job.id.clone(),
				tx_hash: tx_hash.clone(),
			}))
			.ok();

		let (receipt, confirmations) = self.wait_for_confirmation(&tx_hash, started).await?;
		self.finish(job, quote.effective_price(), receipt, confirmations, started)
			.await
	}

	/// Validation rules that must hold before submission.
	async fn validate(&self, kind: &JobKind) -> Result<(), ExecutorError> {
		match kind {
			JobKind::BinaryMarket(params) => self.validate_market(params).await,
			JobKind::CopyTradingVault(params) => Self::validate_vault(params),
		}
	}

	async fn validate_market(&self, params: &BinaryMarketParams) -> Result<(), ExecutorError> {
		if params.title.trim().is_empty() {
			return Err(ExecutorError::Validation("title must not be empty".into()));
		}
		if params.title.len() > TITLE_MAX_LEN {
			return Err(ExecutorError::Validation(format!(
				"title exceeds {} characters",
				TITLE_MAX_LEN
			)));
		}
		if params.description.trim().is_empty() {
			return Err(ExecutorError::Validation(
				"description must not be empty".into(),
			));
		}
		if params.description.len() > DESCRIPTION_MAX_LEN {
			return Err(ExecutorError::Validation(format!(
				"description exceeds {} characters",
				DESCRIPTION_MAX_LEN
			)));
		}
		if params.end_time <= current_timestamp() {
			return Err(ExecutorError::Validation(
				"end_time must be in the future".into(),
			));
		}
		if params.oracle.0.len() != 20 {
			return Err(ExecutorError::Validation(
				"oracle address is malformed".into(),
			));
		}
		if params.initial_liquidity.is_zero() {
			return Err(ExecutorError::Validation(
				"initial_liquidity must be positive".into(),
			));
		}

		let whitelisted = self
			.whitelist
			.is_whitelisted(&params.oracle)
			.await
			.map_err(|e| {
				ExecutorError::Submission(format!("Oracle whitelist lookup failed: {}", e))
			})?;
		if !whitelisted {
			return Err(ExecutorError::Validation(format!(
				"oracle {} is not whitelisted",
				params.oracle
			)));
		}

		Ok(())
	}

	fn validate_vault(params: &CopyTradingVaultParams) -> Result<(), ExecutorError> {
		if params.leader.0.len() != 20 {
			return Err(ExecutorError::Validation(
				"leader address is malformed".into(),
			));
		}
		if params.name.trim().is_empty() {
			return Err(ExecutorError::Validation("name must not be empty".into()));
		}
		if params.name.len() > VAULT_NAME_MAX_LEN {
			return Err(ExecutorError::Validation(format!(
				"name exceeds {} characters",
				VAULT_NAME_MAX_LEN
			)));
		}
		if params.performance_fee_bps == 0 || params.management_fee_bps == 0 {
			return Err(ExecutorError::Validation(
				"fees must be strictly positive".into(),
			));
		}
		if params.performance_fee_bps as u32 + params.management_fee_bps as u32 > MAX_TOTAL_FEE_BPS
		{
			return Err(ExecutorError::Validation(
				"performance plus management fee exceeds 100%".into(),
			));
		}
		Ok(())
	}

	/// Builds the factory call for the job kind.
	///
	/// Without a quote the transaction carries no fee fields and serves as
	/// the gas-estimation probe; with a quote it is ready for submission.
	fn build_transaction(&self, kind: &JobKind, quote: Option<&FeeQuote>) -> Transaction {
		let (to, data, value) = match kind {
			JobKind::BinaryMarket(params) => (
				self.config.market_factory.clone(),
				encode_create_market(params),
				params.initial_liquidity,
			),
			JobKind::CopyTradingVault(params) => (
				self.config.vault_factory.clone(),
				encode_create_vault(params),
				U256::ZERO,
			),
		};

		Transaction {
			to: Some(to),
			data,
			value,
			chain_id: self.config.chain_id,
			nonce: None,
			gas_limit: quote.map(|q| q.gas_limit),
			gas_price: None,
			max_fee_per_gas: quote.map(|q| q.max_fee_per_gas),
			max_priority_fee_per_gas: quote.map(|q| q.max_priority_fee_per_gas),
		}
	}

	/// Re-checks the receipt of a previously submitted transaction.
	///
	/// Returns a result when that transaction succeeded (finishing the
	/// confirmation wait from it), `None` when it reverted or was never
	/// mined and resubmission is safe.
	async fn resume_previous_attempt(
		&self,
		job: &DeploymentJob,
		prev_hash: &TransactionHash,
		started: Instant,
	) -> Result<Option<DeploymentResult>, ExecutorError> {
		match self.provider.transaction_receipt(prev_hash).await {
			Ok(Some(receipt)) if receipt.success => {
				tracing::info!(
					tx_hash = %prev_hash,
					"Previous attempt already mined, resuming confirmation wait"
				);
				let (receipt, confirmations) =
					self.wait_for_confirmation(prev_hash, started).await?;
				let gas_price = job.gas_price.unwrap_or_default();
				self.finish(job, gas_price, receipt, confirmations, started)
					.await
					.map(Some)
			},
			Ok(_) => Ok(None),
			// Resubmitting without knowing the previous outcome risks a
			// duplicate deployment; fail the attempt instead.
			Err(e) => Err(ExecutorError::Submission(format!(
				"Could not verify previous attempt {}: {}",
				prev_hash, e
			))),
		}
	}

	/// Polls for the transaction receipt until the confirmation threshold
	/// is reached or the deadline elapses.
	async fn wait_for_confirmation(
		&self,
		tx_hash: &TransactionHash,
		started: Instant,
	) -> Result<(TransactionReceipt, u64), ExecutorError> {
		let deadline = started + self.config.timeout;

		loop {
			match self.provider.transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => {
					if !receipt.success {
						// A mined-but-reverted transaction is a rejection,
						// not a success.
						return Err(ExecutorError::Submission(format!(
							"Transaction {} reverted on-chain",
							tx_hash
						)));
					}
					match self.provider.block_number().await {
						Ok(current_block) => {
							let confirmations =
								current_block.saturating_sub(receipt.block_number) + 1;
							if confirmations >= self.config.confirmation_blocks {
								return Ok((receipt, confirmations));
							}
							tracing::debug!(
								confirmations,
								required = self.config.confirmation_blocks,
								"Waiting for more confirmations"
							);
						},
						Err(e) => {
							tracing::warn!("Block number poll failed: {}", e);
						},
					}
				},
				Ok(None) => {
					tracing::debug!(tx_hash = %tx_hash, "Receipt not yet available");
				},
				Err(e) => {
					// Transient provider errors keep polling until the deadline.
					tracing::warn!("Receipt poll failed: {}", e);
				},
			}

			tokio::time::sleep(self.config.poll_interval).await;
			if Instant::now() >= deadline {
				return Err(ExecutorError::Timeout {
					waited_secs: self.config.timeout.as_secs(),
				});
			}
		}
	}

	/// Assembles the deployment result and publishes the confirmation event.
	async fn finish(
		&self,
		job: &DeploymentJob,
		effective_price: u128,
		receipt: TransactionReceipt,
		confirmations: u64,
		started: Instant,
	) -> Result<DeploymentResult, ExecutorError> {
		let contract_address = self.extract_deployed_address(&receipt)?;
		self.verify_deployed_code(&contract_address).await?;

		self.event_bus
			.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionConfirmed {
				job_id: job.id.clone(),
				tx_hash: receipt.hash.clone(),
				block_number: receipt.block_number,
				confirmations,
			}))
			.ok();

		Ok(DeploymentResult {
			contract_address,
			tx_hash: receipt.hash,
			block_number: receipt.block_number,
			gas_used: receipt.gas_used,
			gas_price: effective_price,
			duration_ms: started.elapsed().as_millis() as u64,
			confirmations,
		})
	}

	/// Confirms that bytecode actually exists at the deployed address.
	///
	/// An address with no code means the factory call succeeded without
	/// instantiating anything, which must not count as a deployment. A
	/// transient lookup failure is logged, not fatal: the receipt already
	/// proved inclusion.
	async fn verify_deployed_code(&self, address: &Address) -> Result<(), ExecutorError> {
		match self.provider.get_code(address).await {
			Ok(code) if code.is_empty() => Err(ExecutorError::Submission(format!(
				"No contract code at deployed address {}",
				address
			))),
			Ok(_) => Ok(()),
			Err(e) => {
				tracing::warn!(address = %address, "Deployed-code check failed: {}", e);
				Ok(())
			},
		}
	}

	/// Extracts the deployed contract address from the receipt.
	///
	/// Direct creations carry it on the receipt itself; factory deployments
	/// surface it as the first indexed topic of the factory's creation event.
	fn extract_deployed_address(
		&self,
		receipt: &TransactionReceipt,
	) -> Result<Address, ExecutorError> {
		if let Some(address) = &receipt.contract_address {
			return Ok(address.clone());
		}

		receipt
			.logs
			.iter()
			.find(|log| {
				log.address == self.config.market_factory
					|| log.address == self.config.vault_factory
			})
			.and_then(|log| log.topics.get(1))
			.map(|topic| Address(topic.0[12..].to_vec()))
			.ok_or_else(|| {
				ExecutorError::Submission(
					"No deployed contract address in receipt".to_string(),
				)
			})
	}
}

/// Computes the 4-byte function selector for a signature.
fn selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}

/// ABI word for an unsigned integer.
fn abi_word_u64(value: u64) -> [u8; 32] {
	let mut word = [0u8; 32];
	word[24..].copy_from_slice(&value.to_be_bytes());
	word
}

/// Encodes `createMarket(bytes32,uint64,address)`.
///
/// The full title and description stay off-chain; the factory receives
/// their digest so the market can be bound to its metadata.
fn encode_create_market(params: &BinaryMarketParams) -> Vec<u8> {
	let metadata_hash = keccak256(format!("{}\n{}", params.title, params.description));

	let mut data = Vec::with_capacity(4 + 32 * 3);
	data.extend_from_slice(&selector("createMarket(bytes32,uint64,address)"));
	data.extend_from_slice(metadata_hash.as_slice());
	data.extend_from_slice(&abi_word_u64(params.end_time));
	data.extend_from_slice(&params.oracle.as_abi_word());
	data
}

/// Encodes `createVault(address,bytes32,uint16,uint16)`.
fn encode_create_vault(params: &CopyTradingVaultParams) -> Vec<u8> {
	let name_hash = keccak256(params.name.as_bytes());

	let mut data = Vec::with_capacity(4 + 32 * 4);
	data.extend_from_slice(&selector("createVault(address,bytes32,uint16,uint16)"));
	data.extend_from_slice(&params.leader.as_abi_word());
	data.extend_from_slice(name_hash.as_slice());
	data.extend_from_slice(&abi_word_u64(params.performance_fee_bps as u64));
	data.extend_from_slice(&abi_word_u64(params.management_fee_bps as u64));
	data
}
