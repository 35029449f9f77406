// src/error.rs
use ethers::contract::ContractError;
use ethers::providers::Middleware;
use ethers::types::TxHash;

use crate::RightsPolicyManagerErrors;

/// Failure of any contract interaction made through the bindings.
#[derive(Debug, thiserror::Error)]
pub enum Error<M: Middleware> {
    /// The contract reverted with revert data that matches one of its errors.
    #[error("contract reverted: {0:?}")]
    Revert(RightsPolicyManagerErrors),
    #[error(transparent)]
    Contract(ContractError<M>),
    #[error("abi decoding failed: {0}")]
    Abi(#[from] ethers::abi::Error),
    #[error("transaction dropped before inclusion")]
    Dropped,
    #[error("transaction {tx_hash:?} reverted")]
    Reverted { tx_hash: TxHash },
    #[error("event subscription failed: {0}")]
    Subscription(String),
}

impl<M: Middleware> From<ContractError<M>> for Error<M> {
    fn from(err: ContractError<M>) -> Self {
        match err.decode_contract_revert::<RightsPolicyManagerErrors>() {
            Some(revert) => Error::Revert(revert),
            None => Error::Contract(err),
        }
    }
}

impl<M: Middleware> Error<M> {
    /// True for any revert, including revert data that matches none of the
    /// contract's errors.
    pub fn is_revert(&self) -> bool {
        match self {
            Error::Revert(_) | Error::Reverted { .. } => true,
            Error::Contract(err) => err.is_revert(),
            _ => false,
        }
    }

    pub fn revert(&self) -> Option<&RightsPolicyManagerErrors> {
        match self {
            Error::Revert(revert) => Some(revert),
            _ => None,
        }
    }
}
