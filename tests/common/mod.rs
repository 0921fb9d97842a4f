//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use txflow::blockchain::connector::{
    BlockHeader, GasEstimateRequest, NodeConnector, NodeReceipt, NodeTransaction,
};
use txflow::blockchain::types::{BlockchainError, BlockchainResult};
use txflow::blockchain::{Account, SignedTransaction};
use txflow::config::ClientConfig;

/// Anvil's first dev account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn test_account(chain_id: u64) -> Arc<Account> {
    Arc::new(Account::from_private_key(TEST_PRIVATE_KEY, chain_id).unwrap())
}

pub fn test_config(chain_id: u64) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.blockchain.rpc_url = "http://127.0.0.1:8545".to_string();
    config.blockchain.chain_id = chain_id;
    config
}

/// In-memory node with settable chain state.
pub struct FakeNode {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_estimate: u64,
    pub header: BlockHeader,
    pub gas_price: u128,
    pub balance: U256,
    receipts: Mutex<HashMap<TxHash, NodeReceipt>>,
    transactions: Mutex<HashMap<TxHash, NodeTransaction>>,
    sent: Mutex<Vec<SignedTransaction>>,
    receipt_lookups: AtomicUsize,
}

impl FakeNode {
    /// Chain 1 with a 30M gas block and a 100 wei base fee.
    pub fn new() -> Self {
        Self {
            chain_id: 1,
            nonce: 0,
            gas_estimate: 21_000,
            header: BlockHeader {
                number: 1_000,
                gas_limit: 30_000_000,
                base_fee_per_gas: Some(100),
            },
            gas_price: 12_345,
            balance: U256::from(1_000_000_000_000_000_000u128),
            receipts: Mutex::new(HashMap::new()),
            transactions: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            receipt_lookups: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<SignedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn receipt_lookups(&self) -> usize {
        self.receipt_lookups.load(Ordering::SeqCst)
    }

    /// Include every sent transaction in the next block.
    pub fn mine_pending(&self, status: bool) {
        let sent = self.sent();
        let mut receipts = self.receipts.lock().unwrap();
        let mut transactions = self.transactions.lock().unwrap();
        for tx in sent {
            let hash = tx.hash();
            receipts.insert(
                hash,
                NodeReceipt {
                    transaction_hash: hash,
                    status,
                    block_number: Some(self.header.number + 1),
                    gas_used: 21_000,
                    logs: Vec::new(),
                },
            );
            transactions.insert(
                hash,
                NodeTransaction {
                    hash,
                    nonce: tx.nonce(),
                    to: tx.to(),
                },
            );
        }
    }
}

#[async_trait]
impl NodeConnector for FakeNode {
    async fn chain_id(&self) -> BlockchainResult<u64> {
        Ok(self.chain_id)
    }

    async fn balance(&self, _address: Address, _block: Option<u64>) -> BlockchainResult<U256> {
        Ok(self.balance)
    }

    async fn pending_nonce(&self, _address: Address) -> BlockchainResult<u64> {
        Ok(self.nonce + self.sent.lock().unwrap().len() as u64)
    }

    async fn estimate_gas(&self, _request: &GasEstimateRequest) -> BlockchainResult<u64> {
        Ok(self.gas_estimate)
    }

    async fn latest_header(&self) -> BlockchainResult<BlockHeader> {
        Ok(self.header)
    }

    async fn suggest_gas_price(&self) -> BlockchainResult<u128> {
        Ok(self.gas_price)
    }

    async fn send_transaction(&self, tx: &SignedTransaction) -> BlockchainResult<()> {
        let mut sent = self.sent.lock().unwrap();
        if sent.iter().any(|s| s.nonce() == tx.nonce()) {
            return Err(BlockchainError::Rpc("nonce too low".into()));
        }
        sent.push(tx.clone());
        Ok(())
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> BlockchainResult<Option<NodeTransaction>> {
        Ok(self.transactions.lock().unwrap().get(&hash).cloned())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BlockchainResult<Option<NodeReceipt>> {
        self.receipt_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }

    fn close(&self) {}
}

/// Start a JSON-RPC server on an ephemeral port that answers each call with
/// `handler(method, params)`. `Err` becomes a JSON-RPC error object.
pub async fn start_mock_rpc<F>(handler: F) -> SocketAddr
where
    F: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let Some(body) = read_http_body(&mut socket).await else {
                    return;
                };
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let response = answer(&request, handler.as_ref());
                let payload = response.to_string();
                let response_str = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response_str.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn answer<F>(request: &Value, handler: &F) -> Value
where
    F: Fn(&str, &Value) -> Result<Value, String>,
{
    if let Value::Array(batch) = request {
        return Value::Array(batch.iter().map(|r| answer(r, handler)).collect());
    }

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    match handler(method, &params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(message) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32000, "message": message }
        }),
    }
}

async fn read_http_body(socket: &mut tokio::net::TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(buf[header_end..].to_vec())
}
