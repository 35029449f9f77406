// src/transactor.rs
//! State-mutating side of the bindings, plus contract deployment.
use std::sync::Arc;

use ethers::abi::{Detokenize, Token};
use ethers::contract::builders::ContractCall;
use ethers::contract::ContractError;
use ethers::providers::{Middleware, PendingTransaction};
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, TxHash, U256, U64};

use crate::{Error, RightsPolicyManager, RightsPolicyManagerClient};

/// Options applied to every transaction sent by a transactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactOpts {
    /// Wei attached to the transaction. Nothing is attached when `None`.
    pub value: Option<U256>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub nonce: Option<U256>,
    /// Blocks to wait for after inclusion before returning the receipt.
    pub confirmations: usize,
}

impl Default for TransactOpts {
    fn default() -> Self {
        Self {
            value: None,
            gas: None,
            gas_price: None,
            nonce: None,
            confirmations: 1,
        }
    }
}

impl TransactOpts {
    fn apply_to_request(&self, mut tx: TransactionRequest) -> TransactionRequest {
        if let Some(value) = self.value {
            tx = tx.value(value);
        }
        if let Some(gas) = self.gas {
            tx = tx.gas(gas);
        }
        if let Some(gas_price) = self.gas_price {
            tx = tx.gas_price(gas_price);
        }
        if let Some(nonce) = self.nonce {
            tx = tx.nonce(nonce);
        }
        tx
    }
}

#[derive(Debug)]
pub struct RightsPolicyManagerTransactor<M> {
    contract: RightsPolicyManager<M>,
    opts: TransactOpts,
}

impl<M> Clone for RightsPolicyManagerTransactor<M> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
            opts: self.opts.clone(),
        }
    }
}

impl<M: Middleware> RightsPolicyManagerTransactor<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self::from_contract(RightsPolicyManager::new(address, client))
    }

    pub fn from_contract(contract: RightsPolicyManager<M>) -> Self {
        Self {
            contract,
            opts: TransactOpts::default(),
        }
    }

    pub fn with_opts(mut self, opts: TransactOpts) -> Self {
        self.opts = opts;
        self
    }

    pub fn opts(&self) -> &TransactOpts {
        &self.opts
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    fn prepare<D: Detokenize>(&self, call: ContractCall<M, D>) -> ContractCall<M, D> {
        let mut call = call;
        if let Some(value) = self.opts.value {
            call.tx.set_value(value);
        }
        if let Some(gas) = self.opts.gas {
            call.tx.set_gas(gas);
        }
        if let Some(gas_price) = self.opts.gas_price {
            call.tx.set_gas_price(gas_price);
        }
        if let Some(nonce) = self.opts.nonce {
            call.tx.set_nonce(nonce);
        }
        call
    }

    async fn send<D: Detokenize>(
        &self,
        call: ContractCall<M, D>,
    ) -> Result<TransactionReceipt, Error<M>> {
        let method = call.function.name.clone();
        tracing::debug!(contract = ?self.address(), %method, "sending transaction");
        let pending = call.send().await.map_err(|err| {
            tracing::warn!(contract = ?self.address(), %method, error = %err, "send failed");
            Error::from(err)
        })?;
        self.wait(pending).await
    }

    async fn wait(
        &self,
        pending: PendingTransaction<'_, M::Provider>,
    ) -> Result<TransactionReceipt, Error<M>> {
        let tx_hash = pending.tx_hash();
        let receipt = pending
            .confirmations(self.opts.confirmations)
            .await
            .map_err(|e| Error::from(ContractError::<M>::ProviderError { e }))?;
        let receipt = settle(tx_hash, receipt)?;
        tracing::info!(
            contract = ?self.address(),
            ?tx_hash,
            block = ?receipt.block_number,
            gas_used = ?receipt.gas_used,
            "transaction confirmed"
        );
        Ok(receipt)
    }

    pub fn build_initialize(&self, access_manager: Address) -> ContractCall<M, ()> {
        self.prepare(self.contract.initialize(access_manager))
    }

    pub fn build_register_policy(
        &self,
        proof: U256,
        holder: Address,
        policy_address: Address,
    ) -> ContractCall<M, Vec<U256>> {
        self.prepare(self.contract.register_policy(proof, holder, policy_address))
    }

    pub fn build_set_authority(&self, new_authority: Address) -> ContractCall<M, ()> {
        self.prepare(self.contract.set_authority(new_authority))
    }

    pub fn build_upgrade_to_and_call(
        &self,
        new_implementation: Address,
        data: Bytes,
    ) -> ContractCall<M, ()> {
        self.prepare(self.contract.upgrade_to_and_call(new_implementation, data))
    }

    /// Initializes the proxy with its access manager. Only succeeds once.
    pub async fn initialize(&self, access_manager: Address) -> Result<TransactionReceipt, Error<M>> {
        self.send(self.build_initialize(access_manager)).await
    }

    pub async fn register_policy(
        &self,
        proof: U256,
        holder: Address,
        policy_address: Address,
    ) -> Result<TransactionReceipt, Error<M>> {
        self.send(self.build_register_policy(proof, holder, policy_address))
            .await
    }

    /// Runs `registerPolicy` as an `eth_call` and returns the attestation ids it
    /// would produce. Nothing is sent.
    pub async fn simulate_register_policy(
        &self,
        proof: U256,
        holder: Address,
        policy_address: Address,
    ) -> Result<Vec<U256>, Error<M>> {
        Ok(self
            .build_register_policy(proof, holder, policy_address)
            .call()
            .await?)
    }

    pub async fn set_authority(&self, new_authority: Address) -> Result<TransactionReceipt, Error<M>> {
        self.send(self.build_set_authority(new_authority)).await
    }

    pub async fn upgrade_to_and_call(
        &self,
        new_implementation: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt, Error<M>> {
        self.send(self.build_upgrade_to_and_call(new_implementation, data))
            .await
    }

    /// Sends a transaction invoking `method` with dynamically typed arguments.
    pub async fn transact_raw(
        &self,
        method: &str,
        args: &[Token],
    ) -> Result<TransactionReceipt, Error<M>> {
        let function = self.contract.abi().function(method)?;
        let data = function.encode_input(args)?;
        let tx = TransactionRequest::new().to(self.address()).data(data);
        tracing::debug!(contract = ?self.address(), %method, "sending raw transaction");
        self.send_request(tx).await
    }

    /// Sends `opts.value` to the contract with empty calldata.
    pub async fn transfer(&self) -> Result<TransactionReceipt, Error<M>> {
        tracing::debug!(contract = ?self.address(), value = ?self.opts.value, "sending plain transfer");
        self.send_request(TransactionRequest::new().to(self.address()))
            .await
    }

    async fn send_request(&self, tx: TransactionRequest) -> Result<TransactionReceipt, Error<M>> {
        let tx = self.opts.apply_to_request(tx);
        let client = self.contract.client();
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| Error::from(ContractError::<M>::from_middleware_error(e)))?;
        self.wait(pending).await
    }
}

/// Turns the outcome of waiting on a pending transaction into a receipt,
/// failing on drops and on-chain reverts.
fn settle<M: Middleware>(
    tx_hash: TxHash,
    receipt: Option<TransactionReceipt>,
) -> Result<TransactionReceipt, Error<M>> {
    let receipt = receipt.ok_or(Error::Dropped)?;
    if receipt.status == Some(U64::zero()) {
        return Err(Error::Reverted { tx_hash });
    }
    Ok(receipt)
}

/// A freshly deployed implementation contract.
#[derive(Debug)]
pub struct Deployment<M> {
    pub address: Address,
    pub receipt: TransactionReceipt,
    pub client: RightsPolicyManagerClient<M>,
}

/// Deploys the bundled bytecode with the given constructor arguments.
///
/// Only `opts.confirmations` is honoured; gas and fees are filled by the
/// middleware.
pub async fn deploy<M: Middleware>(
    client: Arc<M>,
    rights_agreement: Address,
    rights_authorizer: Address,
    opts: &TransactOpts,
) -> Result<Deployment<M>, Error<M>> {
    tracing::info!(?rights_agreement, ?rights_authorizer, "deploying RightsPolicyManager");
    let (contract, receipt) =
        RightsPolicyManager::deploy(client, (rights_agreement, rights_authorizer))?
            .confirmations(opts.confirmations)
            .send_with_receipt()
            .await?;
    let receipt = settle(receipt.transaction_hash, Some(receipt))?;
    let address = contract.address();
    tracing::info!(?address, tx_hash = ?receipt.transaction_hash, "deployed RightsPolicyManager");

    Ok(Deployment {
        address,
        receipt,
        client: RightsPolicyManagerClient::from_contract(contract),
    })
}
