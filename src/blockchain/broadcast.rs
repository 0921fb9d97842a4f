//! Transaction submission.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::blockchain::connector::NodeConnector;
use crate::blockchain::receipt::TransactionReceipt;
use crate::blockchain::transaction::SignedTransaction;
use crate::blockchain::types::BlockchainResult;
use crate::observability::metrics;

/// Sends signed transactions without waiting for inclusion. Never retries.
#[derive(Clone)]
pub struct Broadcaster {
    node: Arc<dyn NodeConnector>,
    sender: Address,
}

impl Broadcaster {
    pub fn new(node: Arc<dyn NodeConnector>, sender: Address) -> Self {
        Self { node, sender }
    }

    /// Submit `tx` and return a pending receipt.
    pub async fn broadcast(&self, tx: &SignedTransaction) -> BlockchainResult<TransactionReceipt> {
        let tx_hash = tx.hash();

        if let Err(e) = self.node.send_transaction(tx).await {
            metrics::record_broadcast("rejected");
            tracing::warn!(tx_hash = %tx_hash, error = %e, "Broadcast rejected");
            return Err(e.during("send transaction"));
        }

        metrics::record_broadcast("accepted");
        tracing::info!(tx_hash = %tx_hash, nonce = tx.nonce(), "Transaction broadcast");

        Ok(TransactionReceipt::pending(tx_hash, self.sender, tx.to()))
    }
}
