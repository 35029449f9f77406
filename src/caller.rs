// src/caller.rs
//! Read-only side of the bindings. Every method issues a single `eth_call`
//! and never signs or sends anything.
use std::sync::Arc;

use ethers::abi::{Detokenize, Token};
use ethers::contract::builders::ContractCall;
use ethers::contract::ContractError;
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, TransactionRequest, U256};
use serde::Serialize;

use crate::{Error, RightsPolicyManager};

/// Options applied to every read issued by a caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallOpts {
    /// Block to read at. `None` reads the latest block.
    pub block: Option<BlockId>,
    /// Address reported as `msg.sender` to the contract.
    pub from: Option<Address>,
}

/// Result of `getActivePolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivePolicy {
    pub active: bool,
    pub policy: Address,
}

impl From<(bool, Address)> for ActivePolicy {
    fn from((active, policy): (bool, Address)) -> Self {
        Self { active, policy }
    }
}

#[derive(Debug)]
pub struct RightsPolicyManagerCaller<M> {
    contract: RightsPolicyManager<M>,
    opts: CallOpts,
}

impl<M> Clone for RightsPolicyManagerCaller<M> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
            opts: self.opts,
        }
    }
}

impl<M: Middleware> RightsPolicyManagerCaller<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self::from_contract(RightsPolicyManager::new(address, client))
    }

    pub fn from_contract(contract: RightsPolicyManager<M>) -> Self {
        Self {
            contract,
            opts: CallOpts::default(),
        }
    }

    /// Binds `opts` to every subsequent call.
    pub fn with_opts(mut self, opts: CallOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn opts(&self) -> CallOpts {
        self.opts
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    async fn call<D: Detokenize>(&self, call: ContractCall<M, D>) -> Result<D, Error<M>> {
        let mut call = call;
        if let Some(block) = self.opts.block {
            call = call.block(block);
        }
        if let Some(from) = self.opts.from {
            call = call.from(from);
        }
        let method = call.function.name.clone();
        tracing::trace!(contract = ?self.address(), %method, "eth_call");
        call.call().await.map_err(|err| {
            tracing::debug!(contract = ?self.address(), %method, error = %err, "call failed");
            Error::from(err)
        })
    }

    pub async fn rights_agreement(&self) -> Result<Address, Error<M>> {
        self.call(self.contract.rights_agreement()).await
    }

    pub async fn rights_authorizer(&self) -> Result<Address, Error<M>> {
        self.call(self.contract.rights_authorizer()).await
    }

    pub async fn upgrade_interface_version(&self) -> Result<String, Error<M>> {
        self.call(self.contract.upgrade_interface_version()).await
    }

    /// Current access manager of the contract.
    pub async fn authority(&self) -> Result<Address, Error<M>> {
        self.call(self.contract.authority()).await
    }

    pub async fn get_active_policy(
        &self,
        account: Address,
        asset_id: U256,
    ) -> Result<ActivePolicy, Error<M>> {
        self.call(self.contract.get_active_policy(account, asset_id))
            .await
            .map(ActivePolicy::from)
    }

    /// Every policy registered for `account`, in registration order.
    pub async fn get_policies(&self, account: Address) -> Result<Vec<Address>, Error<M>> {
        self.call(self.contract.get_policies(account)).await
    }

    pub async fn get_policy_authorizer(&self) -> Result<Address, Error<M>> {
        self.call(self.contract.get_policy_authorizer()).await
    }

    pub async fn is_active_policy(
        &self,
        account: Address,
        asset_id: U256,
        policy_address: Address,
    ) -> Result<bool, Error<M>> {
        self.call(self.contract.is_active_policy(account, asset_id, policy_address))
            .await
    }

    /// Selector of the restricted function currently being consumed through the
    /// access manager, or zero when none is.
    pub async fn is_consuming_scheduled_op(&self) -> Result<[u8; 4], Error<M>> {
        self.call(self.contract.is_consuming_scheduled_op()).await
    }

    pub async fn proxiable_uuid(&self) -> Result<[u8; 32], Error<M>> {
        self.call(self.contract.proxiable_uuid()).await
    }

    /// Calls any function of the contract by name with dynamically typed arguments.
    pub async fn call_raw(&self, method: &str, args: &[Token]) -> Result<Vec<Token>, Error<M>> {
        let function = self.contract.abi().function(method)?;
        let data = function.encode_input(args)?;

        let mut request = TransactionRequest::new().to(self.address()).data(data);
        if let Some(from) = self.opts.from {
            request = request.from(from);
        }
        let tx: TypedTransaction = request.into();

        tracing::trace!(contract = ?self.address(), %method, "raw eth_call");
        let output = self
            .contract
            .client()
            .call(&tx, self.opts.block)
            .await
            .map_err(|e| Error::from(ContractError::<M>::from_middleware_error(e)))?;
        Ok(function.decode_output(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::encode;
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::{BlockNumber, Bytes};

    fn caller() -> (RightsPolicyManagerCaller<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let address = Address::repeat_byte(0x42);
        (RightsPolicyManagerCaller::new(address, Arc::new(provider)), mock)
    }

    fn returns(mock: &MockProvider, tokens: &[Token]) {
        mock.push::<Bytes, _>(Bytes::from(encode(tokens))).unwrap();
    }

    #[tokio::test]
    async fn reads_authority() {
        let (caller, mock) = caller();
        let manager = Address::repeat_byte(0x07);
        returns(&mock, &[Token::Address(manager)]);

        assert_eq!(caller.authority().await.unwrap(), manager);
    }

    #[tokio::test]
    async fn decodes_active_policy_pair() {
        let (caller, mock) = caller();
        let policy = Address::repeat_byte(0x99);
        returns(&mock, &[Token::Bool(true), Token::Address(policy)]);

        let active = caller
            .get_active_policy(Address::repeat_byte(0x01), U256::from(7))
            .await
            .unwrap();
        assert_eq!(active, ActivePolicy { active: true, policy });
    }

    #[tokio::test]
    async fn decodes_policy_list() {
        let (caller, mock) = caller();
        let policies = vec![Address::repeat_byte(0x0a), Address::repeat_byte(0x0b)];
        returns(
            &mock,
            &[Token::Array(
                policies.iter().copied().map(Token::Address).collect(),
            )],
        );

        let got = caller.get_policies(Address::repeat_byte(0x01)).await.unwrap();
        assert_eq!(got, policies);
    }

    #[tokio::test]
    async fn decodes_version_string_and_fixed_bytes() {
        let (caller, mock) = caller();
        // responses are served last-in first-out
        returns(&mock, &[Token::FixedBytes(vec![0xab; 32])]);
        returns(&mock, &[Token::String("5.0.0".into())]);

        assert_eq!(caller.upgrade_interface_version().await.unwrap(), "5.0.0");
        assert_eq!(caller.proxiable_uuid().await.unwrap(), [0xab; 32]);
    }

    #[tokio::test]
    async fn raw_call_returns_tokens() {
        let (caller, mock) = caller();
        returns(&mock, &[Token::Bool(false)]);

        let out = caller
            .call_raw(
                "isActivePolicy",
                &[
                    Token::Address(Address::repeat_byte(0x01)),
                    Token::Uint(U256::one()),
                    Token::Address(Address::repeat_byte(0x02)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(out, vec![Token::Bool(false)]);
    }

    #[tokio::test]
    async fn raw_call_rejects_unknown_method() {
        let (caller, _mock) = caller();
        let err = caller.call_raw("renounceOwnership", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Abi(_)));
    }

    #[tokio::test]
    async fn opts_are_kept_on_session() {
        let (caller, _mock) = caller();
        let from = Address::repeat_byte(0x33);
        let session = caller.with_opts(CallOpts {
            block: Some(12u64.into()),
            from: Some(from),
        });
        assert_eq!(session.opts().from, Some(from));
        assert_eq!(session.opts().block, Some(BlockId::from(12u64)));
    }

    #[tokio::test]
    async fn session_opts_reach_eth_call() {
        let (caller, mock) = caller();
        let from = Address::repeat_byte(0x33);
        let block = BlockId::from(12u64);
        let session = caller.with_opts(CallOpts {
            block: Some(block),
            from: Some(from),
        });
        returns(&mock, &[Token::Address(Address::repeat_byte(0x07))]);

        session.authority().await.unwrap();

        let mut expected = session.contract.authority().tx;
        expected.set_from(from);
        mock.assert_request("eth_call", (expected, block)).unwrap();
    }

    #[tokio::test]
    async fn raw_call_honours_session_opts() {
        let (caller, mock) = caller();
        let from = Address::repeat_byte(0x33);
        let block = BlockId::from(12u64);
        let session = caller.with_opts(CallOpts {
            block: Some(block),
            from: Some(from),
        });
        returns(&mock, &[Token::String("5.0.0".into())]);

        session.call_raw("UPGRADE_INTERFACE_VERSION", &[]).await.unwrap();

        let data = session
            .contract
            .abi()
            .function("UPGRADE_INTERFACE_VERSION")
            .unwrap()
            .encode_input(&[])
            .unwrap();
        let expected: TypedTransaction = TransactionRequest::new()
            .to(session.address())
            .data(data)
            .from(from)
            .into();
        mock.assert_request("eth_call", (expected, block)).unwrap();
    }

    #[tokio::test]
    async fn reads_latest_block_without_opts() {
        let (caller, mock) = caller();
        returns(&mock, &[Token::Address(Address::repeat_byte(0x07))]);

        caller.authority().await.unwrap();

        let expected = caller.contract.authority().tx;
        mock.assert_request("eth_call", (expected, BlockId::from(BlockNumber::Latest)))
            .unwrap();
    }
}
