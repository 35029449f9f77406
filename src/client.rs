// src/client.rs
use std::sync::Arc;

use ethers::providers::Middleware;
use ethers::types::Address;

use crate::{
    CallOpts, RightsPolicyManager, RightsPolicyManagerCaller, RightsPolicyManagerFilterer,
    RightsPolicyManagerTransactor, TransactOpts,
};

/// All three roles bound to the same deployed contract.
#[derive(Debug)]
pub struct RightsPolicyManagerClient<M> {
    pub caller: RightsPolicyManagerCaller<M>,
    pub transactor: RightsPolicyManagerTransactor<M>,
    pub filterer: RightsPolicyManagerFilterer<M>,
}

impl<M> Clone for RightsPolicyManagerClient<M> {
    fn clone(&self) -> Self {
        Self {
            caller: self.caller.clone(),
            transactor: self.transactor.clone(),
            filterer: self.filterer.clone(),
        }
    }
}

impl<M: Middleware> RightsPolicyManagerClient<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self::from_contract(RightsPolicyManager::new(address, client))
    }

    pub fn from_contract(contract: RightsPolicyManager<M>) -> Self {
        Self {
            caller: RightsPolicyManagerCaller::from_contract(contract.clone()),
            transactor: RightsPolicyManagerTransactor::from_contract(contract.clone()),
            filterer: RightsPolicyManagerFilterer::from_contract(contract),
        }
    }

    /// Binds default options to both the caller and the transactor.
    pub fn with_opts(self, call: CallOpts, transact: TransactOpts) -> Self {
        Self {
            caller: self.caller.with_opts(call),
            transactor: self.transactor.with_opts(transact),
            filterer: self.filterer,
        }
    }

    pub fn address(&self) -> Address {
        self.caller.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{MockProvider, Provider};

    #[test]
    fn roles_share_the_contract_address() {
        let (provider, _mock): (Provider<MockProvider>, _) = Provider::mocked();
        let address = Address::repeat_byte(0x42);
        let client = RightsPolicyManagerClient::new(address, Arc::new(provider));

        assert_eq!(client.address(), address);
        assert_eq!(client.transactor.address(), address);
        assert_eq!(client.filterer.address(), address);
    }

    #[test]
    fn opts_reach_each_role() {
        let (provider, _mock) = Provider::mocked();
        let from = Address::repeat_byte(0x01);
        let client = RightsPolicyManagerClient::new(Address::zero(), Arc::new(provider)).with_opts(
            CallOpts {
                from: Some(from),
                ..Default::default()
            },
            TransactOpts {
                confirmations: 3,
                ..Default::default()
            },
        );

        assert_eq!(client.caller.opts().from, Some(from));
        assert_eq!(client.transactor.opts().confirmations, 3);
    }
}
