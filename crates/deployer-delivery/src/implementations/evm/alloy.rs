//! Alloy-based EVM implementation of the chain provider.
//!
//! This implementation uses the Alloy library to talk to an EVM-compatible
//! network. The provider is built with nonce, gas and chain-id fillers plus
//! the deployer wallet, so submission signs and sends in one step.

use crate::{ChainProvider, DeliveryError};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address as AlloyAddress, FixedBytes};
use alloy_provider::{
	fillers::{ChainIdFiller, GasFiller, NonceFiller, SimpleNonceManager},
	DynProvider, Provider, ProviderBuilder,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::layers::RetryBackoffLayer;
use async_trait::async_trait;
use deployer_types::{
	Address, FeeData, SecretString, Transaction, TransactionHash, TransactionReceipt,
};

/// Alloy-backed chain provider for a single EVM network.
pub struct AlloyChainProvider {
	/// The filler-equipped provider holding the deployer wallet.
	provider: DynProvider,
	/// Chain ID this provider is connected to.
	chain_id: u64,
}

impl AlloyChainProvider {
	/// Connects to an RPC endpoint with the given deployer key.
	///
	/// The RPC client carries a retry/backoff layer for transient network
	/// errors and rate limits; application-level retries on top of this
	/// are the queue's responsibility.
	pub fn connect(
		rpc_url: &str,
		chain_id: u64,
		private_key: &SecretString,
	) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::Configuration(format!("Invalid RPC URL: {}", e)))?;

		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.parse()
				.map_err(|_| DeliveryError::Configuration("Invalid private key format".to_string()))
		})?;
		let signer = signer.with_chain_id(Some(chain_id));
		let wallet = EthereumWallet::from(signer);

		let retry_layer = RetryBackoffLayer::new(
			5,    // max_retry: retry up to 5 times
			1000, // backoff: initial backoff in milliseconds
			10,   // cups: compute units per second
		);
		let client = RpcClient::builder().layer(retry_layer).http(url);

		let provider = ProviderBuilder::new()
			.filler(NonceFiller::new(SimpleNonceManager::default()))
			.filler(GasFiller)
			.filler(ChainIdFiller::default())
			.wallet(wallet)
			.connect_client(client);

		Ok(Self {
			provider: provider.erased(),
			chain_id,
		})
	}

	/// The chain ID this provider serves.
	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn to_fixed_hash(hash: &TransactionHash) -> Result<FixedBytes<32>, DeliveryError> {
		if hash.0.len() != 32 {
			return Err(DeliveryError::Network(format!(
				"Invalid transaction hash length: {}",
				hash.0.len()
			)));
		}
		Ok(FixedBytes::<32>::from_slice(&hash.0))
	}
}

#[async_trait]
impl ChainProvider for AlloyChainProvider {
	async fn fee_data(&self) -> Result<FeeData, DeliveryError> {
		let gas_price = self
			.provider
			.get_gas_price()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))?;

		// Fee-market estimation is unavailable on pre-EIP-1559 networks;
		// report absent fields rather than failing the whole query.
		let (max_fee_per_gas, max_priority_fee_per_gas) =
			match self.provider.estimate_eip1559_fees().await {
				Ok(estimate) => (
					Some(estimate.max_fee_per_gas),
					Some(estimate.max_priority_fee_per_gas),
				),
				Err(e) => {
					tracing::debug!("Fee-market estimation unavailable: {}", e);
					(None, None)
				},
			};

		Ok(FeeData {
			gas_price,
			max_fee_per_gas,
			max_priority_fee_per_gas,
		})
	}

	async fn estimate_gas(&self, tx: &Transaction) -> Result<u64, DeliveryError> {
		let request: TransactionRequest = tx.clone().into();

		self.provider
			.estimate_gas(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to estimate gas: {}", e)))
	}

	async fn submit(&self, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let request: TransactionRequest = tx.into();

		tracing::debug!(
			chain_id = self.chain_id,
			to = ?request.to,
			value = ?request.value,
			data_len = request.input.input.as_ref().map(|d| d.len()).unwrap_or(0),
			gas_limit = ?request.gas,
			"Sending deployment transaction"
		);

		let pending_tx = self.provider.send_transaction(request).await.map_err(|e| {
			tracing::error!(chain_id = self.chain_id, "Transaction submission failed: {}", e);
			DeliveryError::Network(format!("Failed to send transaction: {}", e))
		})?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(tx_hash = %hex::encode(tx_hash.0), "Transaction submitted");

		Ok(TransactionHash(tx_hash.0.to_vec()))
	}

	async fn transaction_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let tx_hash = Self::to_fixed_hash(hash)?;

		match self.provider.get_transaction_receipt(tx_hash).await {
			Ok(Some(receipt)) => {
				let logs = receipt
					.inner
					.logs()
					.iter()
					.map(|log| deployer_types::Log {
						address: Address(log.address().0.to_vec()),
						topics: log
							.topics()
							.iter()
							.map(|topic| deployer_types::H256(topic.0))
							.collect(),
						data: log.inner.data.data.to_vec(),
					})
					.collect();

				Ok(Some(TransactionReceipt {
					hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
					block_number: receipt.block_number.unwrap_or(0),
					success: receipt.status(),
					gas_used: receipt.gas_used,
					contract_address: receipt
						.contract_address
						.map(|addr: AlloyAddress| Address(addr.0.to_vec())),
					logs,
				}))
			},
			Ok(None) => Ok(None),
			Err(e) => Err(DeliveryError::Network(format!(
				"Failed to get receipt: {}",
				e
			))),
		}
	}

	async fn get_code(&self, address: &Address) -> Result<Vec<u8>, DeliveryError> {
		if address.0.len() != 20 {
			return Err(DeliveryError::Network(format!(
				"Invalid address length: {}",
				address.0.len()
			)));
		}
		let mut addr_bytes = [0u8; 20];
		addr_bytes.copy_from_slice(&address.0);

		let code = self
			.provider
			.get_code_at(AlloyAddress::from(addr_bytes))
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get code: {}", e)))?;

		Ok(code.to_vec())
	}

	async fn block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}
}
