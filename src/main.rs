//! txflow command-line client.
//!
//! Reads settings from an optional TOML file plus `ETH_*` environment
//! variables and accounts from `ETH_ACCOUNTS`, then runs one lifecycle
//! operation and prints the result as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use clap::{Parser, Subcommand};
use serde_json::json;

use txflow::blockchain::{Account, TxClient, TxIntent};
use txflow::config::{self, ClientConfig};
use txflow::observability::logging;

#[derive(Parser)]
#[command(name = "txflow")]
#[command(about = "Sign, broadcast and track fee-market transactions", long_about = None)]
struct Cli {
    /// TOML configuration file; ETH_* variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Label from ETH_ACCOUNTS to act as (defaults to the first signing account).
    #[arg(short, long)]
    account: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign and broadcast a transaction
    Send {
        #[arg(long)]
        to: Address,
        /// Amount in wei
        #[arg(long, default_value = "0")]
        value: U256,
        /// Hex-encoded call data
        #[arg(long)]
        data: Option<Bytes>,
        #[arg(long)]
        nonce: Option<u64>,
        #[arg(long)]
        gas_limit: Option<u64>,
        /// Legacy gas price in wei
        #[arg(long)]
        gas_price: Option<u128>,
        #[arg(long, requires = "priority_fee")]
        max_fee: Option<u128>,
        #[arg(long, requires = "max_fee")]
        priority_fee: Option<u128>,
        /// Wait for the receipt after broadcasting
        #[arg(long)]
        wait: bool,
    },
    /// Show the balance of an address (defaults to the selected account)
    Balance {
        address: Option<Address>,
        #[arg(long)]
        block: Option<u64>,
    },
    /// Show the receipt of a mined transaction
    Receipt { hash: TxHash },
    /// Wait for a transaction to be mined
    Wait { hash: TxHash },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Loading can warn about ignored ETH_* values before logging is configured.
    let config = tracing::subscriber::with_default(logging::bootstrap_subscriber(), || match &cli.config {
        Some(path) => config::load_config(path),
        None => config::load_from_env(),
    })?;

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("logging disabled: {}", e);
    }

    let account = select_account(&config, cli.account.as_deref())?;
    let client = TxClient::connect(&config, Arc::new(account))
        .await?
        .with_span(tracing::info_span!("txflow", chain_id = config.blockchain.chain_id));

    let result = run(&client, cli.command).await;
    client.close();

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &TxClient, command: Commands) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let output = match command {
        Commands::Send {
            to,
            value,
            data,
            nonce,
            gas_limit,
            gas_price,
            max_fee,
            priority_fee,
            wait,
        } => {
            let mut intent = TxIntent::transfer(to, value);
            intent.data = data.unwrap_or_default();
            intent.nonce = nonce;
            intent.gas_limit = gas_limit;
            intent.gas_price = gas_price;
            intent.max_fee_per_gas = max_fee;
            intent.max_priority_fee_per_gas = priority_fee;

            let signed = client.sign(&mut intent).await?;
            let pending = client.broadcast(&signed).await?;
            let receipt = if wait {
                client.wait_for_confirmation(signed.hash()).await?
            } else {
                pending
            };

            json!({
                "transaction": {
                    "hash": signed.hash(),
                    "kind": signed.kind(),
                    "nonce": signed.nonce(),
                    "gas_limit": signed.gas_limit(),
                    "gas_price": signed.gas_price().map(|p| p.to_string()),
                    "max_fee_per_gas": signed.is_fee_market().then(|| signed.max_fee_per_gas().to_string()),
                    "max_priority_fee_per_gas": signed.max_priority_fee_per_gas().map(|p| p.to_string()),
                },
                "receipt": receipt,
            })
        }
        Commands::Balance { address, block } => {
            let address = address.unwrap_or_else(|| client.address());
            let balance = match block {
                Some(number) => client.get_balance_at(address, number).await?,
                None => client.get_balance(address).await?,
            };
            json!({ "address": address, "block": block, "balance_wei": balance.to_string() })
        }
        Commands::Receipt { hash } => serde_json::to_value(client.get_receipt(hash).await?)?,
        Commands::Wait { hash } => serde_json::to_value(client.wait_for_confirmation(hash).await?)?,
    };
    Ok(output)
}

fn select_account(config: &ClientConfig, label: Option<&str>) -> Result<Account, Box<dyn std::error::Error>> {
    let accounts = Account::load_all_from_env(config.blockchain.chain_id)?;

    let selected = match label {
        Some(label) => accounts.into_iter().find(|a| a.label() == Some(label)),
        None => accounts.into_iter().find(|a| !a.is_read_only()),
    };

    selected.ok_or_else(|| match label {
        Some(label) => format!("account '{}' not found in ETH_ACCOUNTS", label).into(),
        None => "ETH_ACCOUNTS has no signing account".into(),
    })
}
