// src/main.rs
use std::sync::Arc;

use anyhow::Result as AnyhowResult;
use ethers::providers::{Http, Middleware, Provider};
use rights_policy_manager::config::Config;
use rights_policy_manager::gateway::{self, AppState};
use rights_policy_manager::{RightsPolicyManagerCaller, RightsPolicyManagerFilterer};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> AnyhowResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let provider = Arc::new(Provider::<Http>::try_from(config.rpc_url.as_str())?);
    let chain_id = provider.get_chainid().await?;
    if let Some(expected) = config.chain_id {
        anyhow::ensure!(
            chain_id.as_u64() == expected,
            "RPC_URL serves chain {chain_id}, expected {expected}"
        );
    }

    let caller = RightsPolicyManagerCaller::new(config.contract_address, provider.clone());
    let version = caller.upgrade_interface_version().await?;
    tracing::info!(
        contract = ?config.contract_address,
        %chain_id,
        %version,
        "connected to RightsPolicyManager"
    );

    let state = AppState {
        caller,
        filterer: RightsPolicyManagerFilterer::new(config.contract_address, provider),
        start_block: config.start_block,
    };
    let app = gateway::router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
