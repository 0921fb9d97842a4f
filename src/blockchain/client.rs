//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint (primary + failovers)
//! - Serve the [`NodeConnector`] capability over alloy providers
//! - Bound every request with the configured timeout

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::Transaction as _;
use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{TransportError, TransportResult};
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::connector::{
    BlockHeader, GasEstimateRequest, NodeConnector, NodeReceipt, NodeTransaction,
};
use crate::blockchain::transaction::SignedTransaction;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::BlockchainConfig;

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// alloy-backed [`NodeConnector`] with failover support.
#[derive(Clone)]
pub struct RpcNodeClient {
    /// List of providers (primary + failovers).
    providers: Vec<SharedProvider>,
    /// Configuration.
    config: BlockchainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
    closed: Arc<AtomicBool>,
}

impl RpcNodeClient {
    /// Build providers for the configured endpoints.
    ///
    /// No request is made here; the chain ID is verified by the caller.
    pub fn new(config: &BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Config(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as SharedProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as SharedProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = providers.len() - 1,
            timeout_secs = config.rpc_timeout_secs,
            "RPC client created"
        );

        Ok(Self {
            providers,
            config: config.clone(),
            timeout_duration,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Run `request` against each provider in turn until one answers.
    ///
    /// A JSON-RPC error response is the node's verdict and is returned as-is;
    /// transport failures and timeouts fall through to the next provider.
    async fn call<T, F, Fut>(&self, method: &'static str, request: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        self.call_on(&self.providers, method, request).await
    }

    /// Run `request` against the primary provider only.
    ///
    /// Used for submissions: a transport failure does not prove the primary
    /// dropped the transaction, and a second node would answer "already known".
    async fn call_primary<T, F, Fut>(&self, method: &'static str, request: F) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let primary = &self.providers[..self.providers.len().min(1)];
        self.call_on(primary, method, request).await
    }

    async fn call_on<T, F, Fut>(
        &self,
        providers: &[SharedProvider],
        method: &'static str,
        request: F,
    ) -> BlockchainResult<T>
    where
        F: Fn(SharedProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BlockchainError::NotAvailable("node connection closed".to_string()));
        }

        let mut last_error = BlockchainError::Rpc(format!("{method}: no RPC providers configured"));
        for (i, provider) in providers.iter().enumerate() {
            match timeout(self.timeout_duration, request(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if e.is_error_resp() => return Err(rpc_error(method, e)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = rpc_error(method, e);
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                    last_error = BlockchainError::Timeout(self.config.rpc_timeout_secs);
                }
            }
        }
        Err(last_error)
    }
}

fn rpc_error(method: &str, e: TransportError) -> BlockchainError {
    BlockchainError::Rpc(format!("{method}: {e}"))
}

#[async_trait]
impl NodeConnector for RpcNodeClient {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        self.call("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
    }

    async fn balance(&self, address: Address, block: Option<u64>) -> BlockchainResult<U256> {
        self.call("eth_getBalance", move |p| async move {
            match block {
                Some(number) => p.get_balance(address).block_id(BlockId::number(number)).await,
                None => p.get_balance(address).await,
            }
        })
        .await
    }

    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64> {
        self.call("eth_getTransactionCount", move |p| async move {
            p.get_transaction_count(address)
                .block_id(BlockId::pending())
                .await
        })
        .await
    }

    async fn estimate_gas(&self, request: &GasEstimateRequest) -> BlockchainResult<u64> {
        let tx = TransactionRequest::default()
            .with_from(request.from)
            .with_to(request.to)
            .with_value(request.value)
            .with_input(request.data.clone());

        self.call("eth_estimateGas", move |p| {
            let tx = tx.clone();
            async move { p.estimate_gas(tx).await }
        })
        .await
    }

    async fn latest_header(&self) -> BlockchainResult<BlockHeader> {
        let block = self
            .call("eth_getBlockByNumber", |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?
            .ok_or_else(|| BlockchainError::Rpc("eth_getBlockByNumber: latest block missing".into()))?;

        Ok(BlockHeader {
            number: block.header.number,
            gas_limit: block.header.gas_limit,
            base_fee_per_gas: block.header.base_fee_per_gas.map(u128::from),
        })
    }

    async fn suggest_gas_price(&self) -> BlockchainResult<u128> {
        self.call("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<()> {
        let raw = tx.encoded();
        self.call_primary("eth_sendRawTransaction", move |p| {
            let raw = raw.clone();
            async move { p.send_raw_transaction(&raw).await.map(|_| ()) }
        })
        .await
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> BlockchainResult<Option<NodeTransaction>> {
        let tx = self
            .call("eth_getTransactionByHash", move |p| async move {
                p.get_transaction_by_hash(hash).await
            })
            .await?;

        Ok(tx.map(|tx| NodeTransaction {
            hash,
            nonce: tx.nonce(),
            to: tx.to(),
        }))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BlockchainResult<Option<NodeReceipt>> {
        let receipt = self
            .call("eth_getTransactionReceipt", move |p| async move {
                p.get_transaction_receipt(hash).await
            })
            .await?;

        Ok(receipt.map(|r| NodeReceipt {
            transaction_hash: r.transaction_hash,
            status: r.status(),
            block_number: r.block_number,
            gas_used: r.gas_used,
            logs: r.inner.logs().to_vec(),
        }))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(rpc_url = %self.config.rpc_url, "RPC client closed");
        }
    }
}

impl std::fmt::Debug for RpcNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcNodeClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
