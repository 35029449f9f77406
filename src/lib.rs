// src/lib.rs
use ethers::abi::Abi;
use ethers::contract::abigen;
use ethers::types::Bytes;

abigen!(
    RightsPolicyManager,
    "abi/RightsPolicyManager.json",
    derives(serde::Deserialize, serde::Serialize)
);

pub mod caller;
pub mod client;
pub mod config;
pub mod error;
pub mod filterer;
pub mod gateway;
pub mod transactor;
pub mod utils;

pub use caller::{ActivePolicy, CallOpts, RightsPolicyManagerCaller};
pub use client::RightsPolicyManagerClient;
pub use error::Error;
pub use filterer::{FilterOpts, LogEvent, LogMeta, RightsPolicyManagerFilterer, Subscription};
pub use transactor::{deploy, Deployment, RightsPolicyManagerTransactor, TransactOpts};

/// Interface description and creation bytecode the bindings were generated from.
#[derive(Debug, Clone, Copy)]
pub struct MetaData;

impl MetaData {
    pub fn abi(&self) -> &'static Abi {
        &RIGHTSPOLICYMANAGER_ABI
    }

    pub fn bytecode(&self) -> &'static Bytes {
        &RIGHTSPOLICYMANAGER_BYTECODE
    }
}

pub static METADATA: MetaData = MetaData;
