// src/bin/admin.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, TransactionReceipt, U256};
use rights_policy_manager::{deploy, utils, RightsPolicyManagerTransactor, TransactOpts};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Deploy and administer a RightsPolicyManager contract.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, env = "RPC_URL")]
    rpc_url: String,

    /// Hex private key of the sending account.
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Chain id to sign for. Queried from the node when omitted.
    #[arg(long, env = "CHAIN_ID")]
    chain_id: Option<u64>,

    /// Blocks to wait for after inclusion.
    #[arg(long, default_value_t = 1)]
    confirmations: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy the implementation contract.
    Deploy {
        #[arg(long, value_parser = parse_address)]
        rights_agreement: Address,
        #[arg(long, value_parser = parse_address)]
        rights_authorizer: Address,
    },
    /// Initialize a proxy with its access manager.
    Initialize {
        #[arg(long, env = "CONTRACT_ADDRESS", value_parser = parse_address)]
        contract: Address,
        #[arg(long, value_parser = parse_address)]
        access_manager: Address,
    },
    SetAuthority {
        #[arg(long, env = "CONTRACT_ADDRESS", value_parser = parse_address)]
        contract: Address,
        #[arg(long, value_parser = parse_address)]
        authority: Address,
    },
    /// Point the proxy at a new implementation, optionally calling it with `data`.
    Upgrade {
        #[arg(long, env = "CONTRACT_ADDRESS", value_parser = parse_address)]
        contract: Address,
        #[arg(long, value_parser = parse_address)]
        implementation: Address,
        #[arg(long, default_value = "0x", value_parser = parse_bytes)]
        data: Bytes,
        /// Wei to forward with the upgrade call.
        #[arg(long, value_parser = parse_uint)]
        value: Option<U256>,
    },
    RegisterPolicy {
        #[arg(long, env = "CONTRACT_ADDRESS", value_parser = parse_address)]
        contract: Address,
        #[arg(long, value_parser = parse_uint)]
        proof: U256,
        #[arg(long, value_parser = parse_address)]
        holder: Address,
        #[arg(long, value_parser = parse_address)]
        policy: Address,
        /// Simulate only and print the attestation ids.
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_address(value: &str) -> Result<Address, String> {
    value
        .parse::<Address>()
        .map_err(|_| format!("invalid address {value}"))
}

fn parse_bytes(value: &str) -> Result<Bytes, String> {
    value.parse::<Bytes>().map_err(|e| e.to_string())
}

fn parse_uint(value: &str) -> Result<U256, String> {
    utils::parse_u256(value).map_err(|e| e.to_string())
}

fn summary(receipt: &TransactionReceipt) -> Value {
    json!({
        "transaction_hash": receipt.transaction_hash,
        "block_number": receipt.block_number,
        "gas_used": receipt.gas_used,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let provider = Provider::<Http>::try_from(cli.rpc_url.as_str())?;
    let chain_id = match cli.chain_id {
        Some(id) => id,
        None => provider.get_chainid().await?.as_u64(),
    };
    let wallet = cli
        .private_key
        .parse::<LocalWallet>()
        .context("PRIVATE_KEY is not a valid private key")?
        .with_chain_id(chain_id);
    let sender = wallet.address();
    let client = Arc::new(SignerMiddleware::new(provider, wallet));
    tracing::info!(?sender, chain_id, "signer ready");

    let opts = TransactOpts {
        confirmations: cli.confirmations,
        ..Default::default()
    };

    let output = match cli.command {
        Command::Deploy {
            rights_agreement,
            rights_authorizer,
        } => {
            let deployment = deploy(client, rights_agreement, rights_authorizer, &opts).await?;
            json!({
                "contract": deployment.address,
                "receipt": summary(&deployment.receipt),
            })
        }
        Command::Initialize {
            contract,
            access_manager,
        } => {
            let receipt = RightsPolicyManagerTransactor::new(contract, client)
                .with_opts(opts)
                .initialize(access_manager)
                .await?;
            json!({ "contract": contract, "receipt": summary(&receipt) })
        }
        Command::SetAuthority {
            contract,
            authority,
        } => {
            let receipt = RightsPolicyManagerTransactor::new(contract, client)
                .with_opts(opts)
                .set_authority(authority)
                .await?;
            json!({ "contract": contract, "receipt": summary(&receipt) })
        }
        Command::Upgrade {
            contract,
            implementation,
            data,
            value,
        } => {
            let receipt = RightsPolicyManagerTransactor::new(contract, client)
                .with_opts(TransactOpts { value, ..opts })
                .upgrade_to_and_call(implementation, data)
                .await?;
            json!({ "contract": contract, "receipt": summary(&receipt) })
        }
        Command::RegisterPolicy {
            contract,
            proof,
            holder,
            policy,
            dry_run,
        } => {
            let transactor = RightsPolicyManagerTransactor::new(contract, client).with_opts(opts);
            if dry_run {
                let attestation_ids = transactor
                    .simulate_register_policy(proof, holder, policy)
                    .await?;
                json!({ "contract": contract, "attestation_ids": attestation_ids })
            } else {
                let receipt = transactor.register_policy(proof, holder, policy).await?;
                json!({ "contract": contract, "receipt": summary(&receipt) })
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
