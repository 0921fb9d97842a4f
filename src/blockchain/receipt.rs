//! Receipt normalization.
//!
//! The node reports execution status as a single flag, which cannot tell
//! "not yet mined" from "mined and reverted". [`TxStatus`] pairs the flag with
//! the presence of a block number to keep the two apart.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::Log;
use serde::Serialize;

use crate::blockchain::connector::{NodeConnector, NodeReceipt, NodeTransaction};
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Broadcast, not yet in a block.
    Pending,
    Success,
    Reverted,
}

impl TxStatus {
    pub fn from_node(status: bool, block_number: Option<u64>) -> Self {
        match (block_number, status) {
            (None, _) => TxStatus::Pending,
            (Some(_), true) => TxStatus::Success,
            (Some(_), false) => TxStatus::Reverted,
        }
    }

    /// Legacy 0/1 encoding. Pending and reverted both map to 0.
    pub fn status_code(self) -> u8 {
        match self {
            TxStatus::Success => 1,
            TxStatus::Pending | TxStatus::Reverted => 0,
        }
    }

    pub fn is_final(self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::Reverted => "reverted",
        };
        f.write_str(s)
    }
}

/// Normalized receipt returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub status: TxStatus,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// Always the connected account.
    pub from: Address,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Provisional receipt handed out at broadcast time.
    pub fn pending(tx_hash: TxHash, from: Address, to: Option<Address>) -> Self {
        Self {
            tx_hash,
            status: TxStatus::Pending,
            block_number: None,
            gas_used: 0,
            from,
            to,
            logs: Vec::new(),
        }
    }

    pub fn status_code(&self) -> u8 {
        self.status.status_code()
    }

    /// Combine a node receipt with its transaction.
    pub fn from_parts(receipt: NodeReceipt, tx: &NodeTransaction, from: Address) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            status: TxStatus::from_node(receipt.status, receipt.block_number),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            from,
            to: tx.to,
            logs: receipt.logs,
        }
    }
}

/// Resolves node receipts into [`TransactionReceipt`]s for one account.
#[derive(Clone)]
pub struct ReceiptMapper {
    node: Arc<dyn NodeConnector>,
    sender: Address,
}

impl ReceiptMapper {
    pub fn new(node: Arc<dyn NodeConnector>, sender: Address) -> Self {
        Self { node, sender }
    }

    /// Look up the transaction behind `receipt` to resolve its recipient.
    pub async fn resolve(&self, receipt: NodeReceipt) -> BlockchainResult<TransactionReceipt> {
        let hash = receipt.transaction_hash;
        let tx = self
            .node
            .transaction_by_hash(hash)
            .await
            .map_err(|e| e.during("get transaction"))?
            .ok_or(BlockchainError::TransactionNotFound(hash))?;

        Ok(TransactionReceipt::from_parts(receipt, &tx, self.sender))
    }

    /// Current receipt for `hash`, or [`BlockchainError::ReceiptNotFound`]
    /// while it is not mined.
    pub async fn fetch(&self, hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        let receipt = self
            .node
            .transaction_receipt(hash)
            .await
            .map_err(|e| e.during("get transaction receipt"))?
            .ok_or(BlockchainError::ReceiptNotFound(hash))?;

        self.resolve(receipt).await
    }
}
