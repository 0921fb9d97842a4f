//! Transaction lifecycle client.
//!
//! [`TxClient`] is the entry point for callers: it verifies the chain at
//! construction and then exposes sign, broadcast, wait, and lookup
//! operations for one signing account.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use tracing::{Instrument, Span};

use crate::blockchain::broadcast::Broadcaster;
use crate::blockchain::client::RpcNodeClient;
use crate::blockchain::confirmation::ConfirmationPoller;
use crate::blockchain::connector::NodeConnector;
use crate::blockchain::fees::FeeEstimator;
use crate::blockchain::receipt::{ReceiptMapper, TransactionReceipt};
use crate::blockchain::transaction::{SignedTransaction, TransactionSigner, TxIntent};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Account;
use crate::config::schema::ClientConfig;

/// Signing client bound to one account and one chain.
pub struct TxClient {
    node: Arc<dyn NodeConnector>,
    account: Arc<Account>,
    chain_id: u64,
    signer: TransactionSigner,
    broadcaster: Broadcaster,
    mapper: ReceiptMapper,
    poller: ConfirmationPoller,
    span: Span,
}

impl TxClient {
    /// Connect to the configured RPC endpoint.
    pub async fn connect(config: &ClientConfig, account: Arc<Account>) -> BlockchainResult<Self> {
        let node = RpcNodeClient::new(&config.blockchain)?;
        Self::with_connector(Arc::new(node), config, account).await
    }

    /// Build a client over an existing connector.
    ///
    /// Fails when the account cannot sign, or when the configured, account,
    /// and node-reported chain IDs disagree.
    pub async fn with_connector(
        node: Arc<dyn NodeConnector>,
        config: &ClientConfig,
        account: Arc<Account>,
    ) -> BlockchainResult<Self> {
        let expected = config.blockchain.chain_id;
        if expected == 0 {
            return Err(BlockchainError::Config("blockchain.chain_id is not set".into()));
        }

        account.signing_key()?;
        if account.chain_id() != expected {
            return Err(BlockchainError::ChainMismatch {
                expected,
                actual: account.chain_id(),
            });
        }

        let actual = node.chain_id().await.map_err(|e| e.during("get chain id"))?;
        if actual != expected {
            node.close();
            return Err(BlockchainError::ChainMismatch { expected, actual });
        }

        let sender = account.address();
        let estimator = FeeEstimator::new(&config.gas, &config.fees);
        let mapper = ReceiptMapper::new(node.clone(), sender);

        tracing::info!(
            chain_id = actual,
            address = %sender,
            label = account.label().unwrap_or_default(),
            "Connected to chain"
        );

        Ok(Self {
            signer: TransactionSigner::new(node.clone(), estimator, actual),
            broadcaster: Broadcaster::new(node.clone(), sender),
            poller: ConfirmationPoller::new(node.clone(), mapper.clone(), &config.confirmation),
            mapper,
            node,
            account,
            chain_id: actual,
            span: Span::none(),
        })
    }

    /// Run every operation inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn address(&self) -> Address {
        self.account.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Complete `intent` in place and sign it.
    pub async fn sign(&self, intent: &mut TxIntent) -> BlockchainResult<SignedTransaction> {
        self.signer
            .sign(&self.account, intent)
            .instrument(self.span.clone())
            .await
    }

    /// Submit a signed transaction; returns a pending receipt.
    pub async fn broadcast(&self, tx: &SignedTransaction) -> BlockchainResult<TransactionReceipt> {
        self.broadcaster.broadcast(tx).instrument(self.span.clone()).await
    }

    /// Poll until `tx_hash` is mined or the confirmation timeout elapses.
    pub async fn wait_for_confirmation(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        self.poller.wait(tx_hash).instrument(self.span.clone()).await
    }

    /// Receipt for a mined transaction, or `ReceiptNotFound`.
    pub async fn get_receipt(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        self.mapper.fetch(tx_hash).instrument(self.span.clone()).await
    }

    /// Latest balance of `address`.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.balance(address, None).await
    }

    /// Balance of `address` at `block_number`.
    pub async fn get_balance_at(&self, address: Address, block_number: u64) -> BlockchainResult<U256> {
        self.balance(address, Some(block_number)).await
    }

    async fn balance(&self, address: Address, block: Option<u64>) -> BlockchainResult<U256> {
        let balance = self
            .node
            .balance(address, block)
            .instrument(self.span.clone())
            .await
            .map_err(|e| e.during("get balance"))?;
        tracing::debug!(parent: &self.span, address = %address, block, balance = %balance, "Balance fetched");
        Ok(balance)
    }

    /// Release the node connection. Safe to call more than once.
    pub fn close(&self) {
        self.node.close();
    }
}

impl std::fmt::Debug for TxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxClient")
            .field("address", &self.account.address())
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
