// src/filterer.rs
//! Event log side of the bindings: historical queries, live watches and
//! decoding of individual logs.
use std::marker::PhantomData;
use std::sync::Arc;

use ethers::abi::RawLog;
use ethers::contract::builders::Event;
use ethers::contract::{ContractError, EthLogDecode};
use ethers::providers::Middleware;
use ethers::types::{Address, Filter, Log, ValueOrArray, H256, U256};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    AuthorityUpdatedFilter, Error, InitializedFilter, PolicyRegisteredFilter, RightsPolicyManager,
    RightsPolicyManagerEvents, UpgradedFilter,
};

/// Block range of a log query. `end = None` queries up to the latest block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOpts {
    pub start: u64,
    pub end: Option<u64>,
}

/// Position of a log on chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMeta {
    pub address: Address,
    pub block_number: Option<u64>,
    pub block_hash: Option<H256>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<U256>,
    /// Set when the log was removed by a reorg.
    pub removed: bool,
}

impl From<&Log> for LogMeta {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address,
            block_number: log.block_number.map(|n| n.as_u64()),
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            removed: log.removed.unwrap_or(false),
        }
    }
}

/// A decoded event together with the log it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent<T> {
    pub event: T,
    pub meta: LogMeta,
}

fn decode<D: EthLogDecode>(log: Log) -> Result<LogEvent<D>, ethers::abi::Error> {
    let meta = LogMeta::from(&log);
    let raw = RawLog {
        topics: log.topics,
        data: log.data.to_vec(),
    };
    Ok(LogEvent {
        event: D::decode_log(&raw)?,
        meta,
    })
}

fn address_topics(addresses: &[Address]) -> Option<ValueOrArray<Option<H256>>> {
    if addresses.is_empty() {
        return None;
    }
    Some(ValueOrArray::Array(
        addresses.iter().map(|a| Some(H256::from(*a))).collect(),
    ))
}

/// Handle to a running watch. Dropping it stops the watch.
#[derive(Debug)]
pub struct Subscription<M> {
    handle: Option<JoinHandle<Result<(), String>>>,
    _client: PhantomData<fn() -> M>,
}

impl<M: Middleware> Subscription<M> {
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Waits for the watch to end. Resolves to `Ok` when the sink was closed
    /// or the subscription was cancelled.
    pub async fn err(mut self) -> Result<(), Error<M>> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        match handle.await {
            Ok(result) => result.map_err(Error::Subscription),
            Err(join) if join.is_cancelled() => Ok(()),
            Err(join) => Err(Error::Subscription(join.to_string())),
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
pub struct RightsPolicyManagerFilterer<M> {
    contract: RightsPolicyManager<M>,
}

impl<M> Clone for RightsPolicyManagerFilterer<M> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
        }
    }
}

impl<M: Middleware> RightsPolicyManagerFilterer<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self::from_contract(RightsPolicyManager::new(address, client))
    }

    pub fn from_contract(contract: RightsPolicyManager<M>) -> Self {
        Self { contract }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    async fn query<D: EthLogDecode>(
        &self,
        event: Event<Arc<M>, M, D>,
        opts: FilterOpts,
    ) -> Result<Vec<LogEvent<D>>, Error<M>> {
        let mut event = event.from_block(opts.start);
        if let Some(end) = opts.end {
            event = event.to_block(end);
        }
        let logs = self
            .contract
            .client()
            .get_logs(&event.filter)
            .await
            .map_err(|e| Error::from(ContractError::<M>::from_middleware_error(e)))?;
        tracing::debug!(
            contract = ?self.address(),
            from = opts.start,
            to = ?opts.end,
            count = logs.len(),
            "fetched logs"
        );
        Ok(logs
            .into_iter()
            .map(decode::<D>)
            .collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn filter_authority_updated(
        &self,
        opts: FilterOpts,
    ) -> Result<Vec<LogEvent<AuthorityUpdatedFilter>>, Error<M>> {
        self.query(self.contract.authority_updated_filter(), opts)
            .await
    }

    pub async fn filter_initialized(
        &self,
        opts: FilterOpts,
    ) -> Result<Vec<LogEvent<InitializedFilter>>, Error<M>> {
        self.query(self.contract.initialized_filter(), opts).await
    }

    /// `PolicyRegistered` logs, restricted to `accounts` unless it is empty.
    pub async fn filter_policy_registered(
        &self,
        opts: FilterOpts,
        accounts: &[Address],
    ) -> Result<Vec<LogEvent<PolicyRegisteredFilter>>, Error<M>> {
        let mut event = self.contract.policy_registered_filter();
        if let Some(topic) = address_topics(accounts) {
            event = event.topic1(topic);
        }
        self.query(event, opts).await
    }

    pub async fn filter_upgraded(
        &self,
        opts: FilterOpts,
        implementations: &[Address],
    ) -> Result<Vec<LogEvent<UpgradedFilter>>, Error<M>> {
        let mut event = self.contract.upgraded_filter();
        if let Some(topic) = address_topics(implementations) {
            event = event.topic1(topic);
        }
        self.query(event, opts).await
    }

    pub fn parse_authority_updated(&self, log: Log) -> Result<LogEvent<AuthorityUpdatedFilter>, Error<M>> {
        Ok(decode(log)?)
    }

    pub fn parse_initialized(&self, log: Log) -> Result<LogEvent<InitializedFilter>, Error<M>> {
        Ok(decode(log)?)
    }

    pub fn parse_policy_registered(&self, log: Log) -> Result<LogEvent<PolicyRegisteredFilter>, Error<M>> {
        Ok(decode(log)?)
    }

    pub fn parse_upgraded(&self, log: Log) -> Result<LogEvent<UpgradedFilter>, Error<M>> {
        Ok(decode(log)?)
    }

    /// Decodes any event emitted by the contract.
    pub fn parse_log(&self, log: Log) -> Result<LogEvent<RightsPolicyManagerEvents>, Error<M>> {
        Ok(decode(log)?)
    }
}

impl<M: Middleware + 'static> RightsPolicyManagerFilterer<M> {
    fn watch<D>(&self, filter: Filter, sink: mpsc::Sender<LogEvent<D>>) -> Subscription<M>
    where
        D: EthLogDecode + Send + 'static,
    {
        let client = self.contract.client();
        let contract = self.address();
        let handle = tokio::spawn(async move {
            let mut stream = client.watch(&filter).await.map_err(|e| e.to_string())?;
            let id = stream.id;
            tracing::debug!(?contract, %id, "log watch installed");
            let result = loop {
                tokio::select! {
                    _ = sink.closed() => {
                        tracing::debug!(?contract, %id, "log sink closed");
                        break Ok(());
                    }
                    log = stream.next() => {
                        let Some(log) = log else { break Ok(()) };
                        match decode::<D>(log) {
                            Ok(item) => {
                                if sink.send(item).await.is_err() {
                                    tracing::debug!(?contract, %id, "log sink closed");
                                    break Ok(());
                                }
                            }
                            Err(err) => break Err(err.to_string()),
                        }
                    }
                }
            };
            if let Err(err) = client.uninstall_filter(id).await {
                tracing::debug!(?contract, %id, error = %err, "failed to uninstall log filter");
            }
            result
        });
        Subscription {
            handle: Some(handle),
            _client: PhantomData,
        }
    }

    pub fn watch_authority_updated(
        &self,
        start: u64,
        sink: mpsc::Sender<LogEvent<AuthorityUpdatedFilter>>,
    ) -> Subscription<M> {
        let event = self.contract.authority_updated_filter().from_block(start);
        self.watch(event.filter, sink)
    }

    pub fn watch_initialized(
        &self,
        start: u64,
        sink: mpsc::Sender<LogEvent<InitializedFilter>>,
    ) -> Subscription<M> {
        let event = self.contract.initialized_filter().from_block(start);
        self.watch(event.filter, sink)
    }

    pub fn watch_policy_registered(
        &self,
        start: u64,
        sink: mpsc::Sender<LogEvent<PolicyRegisteredFilter>>,
        accounts: &[Address],
    ) -> Subscription<M> {
        let mut event = self.contract.policy_registered_filter().from_block(start);
        if let Some(topic) = address_topics(accounts) {
            event = event.topic1(topic);
        }
        self.watch(event.filter, sink)
    }

    pub fn watch_upgraded(
        &self,
        start: u64,
        sink: mpsc::Sender<LogEvent<UpgradedFilter>>,
        implementations: &[Address],
    ) -> Subscription<M> {
        let mut event = self.contract.upgraded_filter().from_block(start);
        if let Some(topic) = address_topics(implementations) {
            event = event.topic1(topic);
        }
        self.watch(event.filter, sink)
    }
}
