use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use ethers::types::Address;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: Address,
    pub bind_addr: SocketAddr,
    /// First block scanned for `PolicyRegistered` logs when a request does not
    /// say otherwise.
    pub start_block: u64,
    pub private_key: Option<String>,
    pub chain_id: Option<u64>,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

        let rpc_url = required("RPC_URL")?;
        let contract_address = required("CONTRACT_ADDRESS")?
            .parse::<Address>()
            .context("CONTRACT_ADDRESS is not a valid address")?;
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR is not a valid socket address")?;
        let start_block = lookup("START_BLOCK")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("START_BLOCK is not a block number")?
            .unwrap_or(0);
        let chain_id = lookup("CHAIN_ID")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("CHAIN_ID is not a number")?;

        Ok(Self {
            rpc_url,
            contract_address,
            bind_addr,
            start_block,
            private_key: lookup("PRIVATE_KEY"),
            chain_id,
        })
    }
}
