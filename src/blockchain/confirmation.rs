//! Confirmation monitoring.
//!
//! ```text
//! waiting ──receipt with block──▶ confirmed
//!    │  ├──────lookup fails for good─▶ failed
//!    │  └──────tx lookup fails──▶ failed
//!    └──────timeout elapses─────▶ timed-out
//! ```
//!
//! Empty receipts and transient lookup errors are "not mined yet" and are
//! retried on the next tick. Any other error ends the wait, as do failures
//! resolving the transaction once a receipt is found.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use tokio::time::{interval_at, timeout, Instant};

use crate::blockchain::connector::NodeConnector;
use crate::blockchain::receipt::{ReceiptMapper, TransactionReceipt};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::config::schema::ConfirmationConfig;
use crate::observability::metrics;

/// Where a confirmation wait stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Waiting,
    Confirmed,
    TimedOut,
    Failed,
}

impl PollState {
    pub fn as_str(self) -> &'static str {
        match self {
            PollState::Waiting => "waiting",
            PollState::Confirmed => "confirmed",
            PollState::TimedOut => "timed_out",
            PollState::Failed => "failed",
        }
    }

    /// Final state for the outcome of a wait.
    pub fn of(result: &BlockchainResult<TransactionReceipt>) -> Self {
        match result {
            Ok(_) => PollState::Confirmed,
            Err(e) if e.is_inconclusive() => PollState::TimedOut,
            Err(_) => PollState::Failed,
        }
    }
}

/// Polls for a receipt at a fixed interval until it is mined or time runs out.
#[derive(Clone)]
pub struct ConfirmationPoller {
    node: Arc<dyn NodeConnector>,
    mapper: ReceiptMapper,
    timeout: Duration,
    interval: Duration,
}

impl ConfirmationPoller {
    pub fn new(node: Arc<dyn NodeConnector>, mapper: ReceiptMapper, config: &ConfirmationConfig) -> Self {
        Self::with_timing(
            node,
            mapper,
            Duration::from_secs(config.timeout_secs()),
            Duration::from_secs(config.interval_secs()),
        )
    }

    pub fn with_timing(
        node: Arc<dyn NodeConnector>,
        mapper: ReceiptMapper,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            node,
            mapper,
            timeout,
            // tokio intervals panic on a zero period.
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for `tx_hash` to be mined.
    ///
    /// The first lookup happens one interval after the call.
    pub async fn wait(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        let started = Instant::now();
        tracing::debug!(
            tx_hash = %tx_hash,
            state = PollState::Waiting.as_str(),
            timeout_secs = self.timeout.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Waiting for confirmation"
        );

        let result = match timeout(self.timeout, self.poll(tx_hash)).await {
            Ok(result) => result,
            Err(_) => Err(BlockchainError::ConfirmationTimeout {
                tx_hash,
                timeout_secs: self.timeout.as_secs(),
            }),
        };

        let state = PollState::of(&result);
        let elapsed = started.elapsed();
        metrics::record_confirmation(state.as_str(), elapsed);

        match &result {
            Ok(receipt) => tracing::info!(
                tx_hash = %tx_hash,
                state = state.as_str(),
                status = %receipt.status,
                block_number = receipt.block_number,
                elapsed_ms = elapsed.as_millis() as u64,
                "Transaction confirmed"
            ),
            Err(e) => tracing::warn!(
                tx_hash = %tx_hash,
                state = state.as_str(),
                error = %e,
                "Confirmation wait ended without a receipt"
            ),
        }

        result
    }

    async fn poll(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        let mut attempts = 0u32;

        loop {
            ticker.tick().await;
            attempts += 1;

            let receipt = match self.node.transaction_receipt(tx_hash).await {
                Ok(Some(r)) if r.block_number.is_some() => r,
                Ok(_) => {
                    tracing::debug!(tx_hash = %tx_hash, attempts, "Transaction pending");
                    continue;
                }
                Err(e) if e.is_retryable() => {
                    tracing::debug!(tx_hash = %tx_hash, attempts, error = %e, "Receipt lookup failed, retrying");
                    continue;
                }
                Err(e) => return Err(e.during("get transaction receipt")),
            };

            return self.mapper.resolve(receipt).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::connector::NodeReceipt;
    use crate::blockchain::receipt::TxStatus;
    use crate::blockchain::testing::{Script, ScriptedNode};
    use alloy::primitives::{address, b256, Address};

    const HASH: TxHash = b256!("0x2222222222222222222222222222222222222222222222222222222222222222");
    const RECIPIENT: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");

    fn poller(node: &Arc<ScriptedNode>, timeout_secs: u64, interval_secs: u64) -> ConfirmationPoller {
        ConfirmationPoller::with_timing(
            node.clone(),
            ReceiptMapper::new(node.clone(), Address::ZERO),
            Duration::from_secs(timeout_secs),
            Duration::from_secs(interval_secs),
        )
    }

    #[test]
    fn test_config_timing() {
        let node = ScriptedNode::new(Script::mainnet());
        let config = ConfirmationConfig {
            timeout_secs: 0,
            interval_secs: 5,
        };
        let poller = ConfirmationPoller::new(
            node.clone(),
            ReceiptMapper::new(node.clone(), Address::ZERO),
            &config,
        );
        assert_eq!(poller.timeout(), Duration::from_secs(300));
        assert_eq!(poller.interval(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_mined_transaction() {
        let node = ScriptedNode::new(Script::mainnet());
        node.mine(HASH, RECIPIENT, true, 9);

        let receipt = poller(&node, 300, 3).wait(HASH).await.unwrap();
        assert_eq!(receipt.status, TxStatus::Success);
        assert_eq!(receipt.to, Some(RECIPIENT));
        assert_eq!(node.call_count("eth_getTransactionReceipt"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_transaction_is_confirmed_not_failed() {
        let node = ScriptedNode::new(Script::mainnet());
        node.mine(HASH, RECIPIENT, false, 9);

        let result = poller(&node, 300, 3).wait(HASH).await;
        assert_eq!(PollState::of(&result), PollState::Confirmed);
        assert_eq!(result.unwrap().status, TxStatus::Reverted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_errors_are_retried() {
        let node = ScriptedNode::new(Script::mainnet());
        node.fail("eth_getTransactionReceipt");

        let waiter = {
            let poller = poller(&node, 300, 3);
            tokio::spawn(async move { poller.wait(HASH).await })
        };

        tokio::time::sleep(Duration::from_secs(10)).await;
        node.recover("eth_getTransactionReceipt");
        node.mine(HASH, RECIPIENT, true, 9);

        let receipt = waiter.await.unwrap().unwrap();
        assert_eq!(receipt.block_number, Some(9));
        assert!(node.call_count("eth_getTransactionReceipt") >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_node_fails_without_waiting_out_timeout() {
        let node = ScriptedNode::new(Script::mainnet());
        node.close();

        let started = Instant::now();
        let result = poller(&node, 300, 3).wait(HASH).await;

        assert_eq!(PollState::of(&result), PollState::Failed);
        let err = result.unwrap_err();
        assert!(!err.is_inconclusive());
        assert!(err.to_string().starts_with("failed to get transaction receipt"));
        assert_eq!(node.call_count("eth_getTransactionReceipt"), 1);
        assert!(started.elapsed() < Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_without_block_keeps_waiting() {
        let node = ScriptedNode::new(Script::mainnet());
        node.edit(|s| {
            s.receipts.insert(
                HASH,
                NodeReceipt {
                    transaction_hash: HASH,
                    status: false,
                    block_number: None,
                    gas_used: 0,
                    logs: Vec::new(),
                },
            );
        });

        let err = poller(&node, 10, 3).wait(HASH).await.unwrap_err();
        assert!(err.is_inconclusive());
        assert_eq!(node.call_count("eth_getTransactionByHash"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_carries_hash() {
        let node = ScriptedNode::new(Script::mainnet());

        let result = poller(&node, 1, 1).wait(HASH).await;
        assert_eq!(PollState::of(&result), PollState::TimedOut);
        match result.unwrap_err() {
            BlockchainError::ConfirmationTimeout { tx_hash, timeout_secs } => {
                assert_eq!(tx_hash, HASH);
                assert_eq!(timeout_secs, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transaction_lookup_failure_is_terminal() {
        let node = ScriptedNode::new(Script::mainnet());
        node.mine(HASH, RECIPIENT, true, 9);
        node.fail("eth_getTransactionByHash");

        let result = poller(&node, 300, 3).wait(HASH).await;
        assert_eq!(PollState::of(&result), PollState::Failed);
        assert!(result.unwrap_err().to_string().starts_with("failed to get transaction"));
        assert_eq!(node.call_count("eth_getTransactionReceipt"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_lookup_after_one_interval() {
        let node = ScriptedNode::new(Script::mainnet());
        let waiter = {
            let poller = poller(&node, 300, 3);
            tokio::spawn(async move { poller.wait(HASH).await })
        };

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(node.call_count("eth_getTransactionReceipt"), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(node.call_count("eth_getTransactionReceipt"), 1);

        waiter.abort();
    }
}
