//! Scripted [`NodeConnector`] for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{hex, Address, TxHash, U256};
use async_trait::async_trait;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::blockchain::connector::{
    BlockHeader, GasEstimateRequest, NodeConnector, NodeReceipt, NodeTransaction,
};
use crate::blockchain::transaction::SignedTransaction;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Account;

/// Anvil's first dev account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn test_account(chain_id: u64) -> Account {
    Account::from_private_key(TEST_PRIVATE_KEY, chain_id).unwrap()
}

/// Uncompressed SEC1 public key of [`TEST_PRIVATE_KEY`].
pub fn test_public_key_hex() -> String {
    let point = test_account(1).public_key().unwrap().to_encoded_point(false);
    hex::encode(point.as_bytes())
}

/// Canned node answers. A `None` header makes header lookups fail.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub chain_id: u64,
    pub balance: U256,
    pub nonce: u64,
    pub gas_estimate: u64,
    pub header: Option<BlockHeader>,
    pub gas_price: u128,
    pub receipts: HashMap<TxHash, NodeReceipt>,
    pub transactions: HashMap<TxHash, NodeTransaction>,
}

impl Script {
    /// Chain 1, nonce 7, a 21000 estimate and a 100 wei base fee.
    pub fn mainnet() -> Self {
        Self {
            chain_id: 1,
            balance: U256::from(10u64).pow(U256::from(18u64)),
            nonce: 7,
            gas_estimate: 21_000,
            header: Some(BlockHeader {
                number: 100,
                gas_limit: 30_000_000,
                base_fee_per_gas: Some(100),
            }),
            gas_price: 12_345,
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct ScriptedNode {
    script: Mutex<Script>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    sent: Mutex<Vec<SignedTransaction>>,
    closed: AtomicBool,
}

impl ScriptedNode {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Self::default()
        })
    }

    /// Make every later call to `method` fail with an RPC error.
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.failing.lock().unwrap().remove(method);
    }

    pub fn edit(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    /// Record a mined receipt and the matching transaction for `hash`.
    pub fn mine(&self, hash: TxHash, to: Address, status: bool, block_number: u64) {
        self.edit(|s| {
            s.receipts.insert(
                hash,
                NodeReceipt {
                    transaction_hash: hash,
                    status,
                    block_number: Some(block_number),
                    gas_used: 21_000,
                    logs: Vec::new(),
                },
            );
            s.transactions.insert(
                hash,
                NodeTransaction {
                    hash,
                    nonce: 0,
                    to: Some(to),
                },
            );
        });
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn enter(&self, method: &'static str) -> BlockchainResult<Script> {
        self.calls.lock().unwrap().push(method);
        if self.is_closed() {
            return Err(BlockchainError::NotAvailable("node connection closed".into()));
        }
        if self.failing.lock().unwrap().contains(method) {
            return Err(BlockchainError::Rpc(format!("{method}: scripted failure")));
        }
        Ok(self.script.lock().unwrap().clone())
    }
}

#[async_trait]
impl NodeConnector for ScriptedNode {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(self.enter("eth_chainId")?.chain_id)
    }

    async fn balance(&self, _address: Address, _block: Option<u64>) -> BlockchainResult<U256> {
        Ok(self.enter("eth_getBalance")?.balance)
    }

    async fn pending_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.enter("eth_getTransactionCount")?.nonce)
    }

    async fn estimate_gas(&self, _request: &GasEstimateRequest) -> BlockchainResult<u64> {
        Ok(self.enter("eth_estimateGas")?.gas_estimate)
    }

    async fn latest_header(&self) -> BlockchainResult<BlockHeader> {
        self.enter("eth_getBlockByNumber")?
            .header
            .ok_or_else(|| BlockchainError::Rpc("eth_getBlockByNumber: no header scripted".into()))
    }

    async fn suggest_gas_price(&self) -> BlockchainResult<u128> {
        Ok(self.enter("eth_gasPrice")?.gas_price)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<()> {
        self.enter("eth_sendRawTransaction")?;
        self.sent.lock().unwrap().push(tx.clone());
        Ok(())
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> BlockchainResult<Option<NodeTransaction>> {
        Ok(self.enter("eth_getTransactionByHash")?.transactions.get(&hash).cloned())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BlockchainResult<Option<NodeReceipt>> {
        Ok(self.enter("eth_getTransactionReceipt")?.receipts.get(&hash).cloned())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
