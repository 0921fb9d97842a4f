//! Node capability boundary.
//!
//! The engine only ever talks to the network through [`NodeConnector`].
//! [`RpcNodeClient`](crate::blockchain::client::RpcNodeClient) is the
//! production adapter; tests substitute a scripted double.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::Log;
use async_trait::async_trait;

use crate::blockchain::transaction::SignedTransaction;
use crate::blockchain::types::BlockchainResult;

/// The subset of the latest block header the fee policy needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub number: u64,
    pub gas_limit: u64,
    /// Present only on fee-market networks.
    pub base_fee_per_gas: Option<u128>,
}

/// Call parameters for a gas estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasEstimateRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

/// A transaction as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTransaction {
    pub hash: TxHash,
    pub nonce: u64,
    /// `None` for contract creation.
    pub to: Option<Address>,
}

/// A receipt as reported by the node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReceipt {
    pub transaction_hash: TxHash,
    /// Execution outcome flag; only meaningful together with `block_number`.
    pub status: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

/// Abstract JSON-RPC endpoint.
///
/// Implementations must be safe for concurrent use; the engine adds no
/// locking of its own. Dropping a returned future must abort the call.
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn chain_id(&self) -> BlockchainResult<u64>;

    /// Balance at `block`, or at the latest block when `None`.
    async fn balance(&self, address: Address, block: Option<u64>) -> BlockchainResult<U256>;

    /// Nonce including transactions still in the mempool.
    async fn pending_nonce(&self, address: Address) -> BlockchainResult<u64>;

    async fn estimate_gas(&self, request: &GasEstimateRequest) -> BlockchainResult<u64>;

    async fn latest_header(&self) -> BlockchainResult<BlockHeader>;

    async fn suggest_gas_price(&self) -> BlockchainResult<u128>;

    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<()>;

    /// `Ok(None)` when the node does not know the hash.
    async fn transaction_by_hash(&self, hash: TxHash) -> BlockchainResult<Option<NodeTransaction>>;

    /// `Ok(None)` while the transaction is not yet mined.
    async fn transaction_receipt(&self, hash: TxHash) -> BlockchainResult<Option<NodeReceipt>>;

    /// Release the connection. Idempotent.
    fn close(&self);
}
