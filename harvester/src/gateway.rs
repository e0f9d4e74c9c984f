//! Capability boundary towards the ledger.
//!
//! Everything the harvester reads from or writes to the chain goes through [`LedgerGateway`].
//! The binary talks JSON-RPC over HTTP (see `utils::evm_rpc::RpcGateway`); tests plug in
//! in-memory ledgers or mocks.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::{types::TransactionReceipt, utils::error::HarvesterResult};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Executes a read-only contract call against the latest block and returns the raw return data
    async fn call(&self, to: Address, data: Vec<u8>) -> HarvesterResult<Vec<u8>>;

    /// Next usable nonce of `address`, pending transactions included
    async fn nonce(&self, address: Address) -> HarvesterResult<u64>;

    /// The network's current gas price estimate in wei
    async fn gas_price(&self) -> HarvesterResult<u128>;

    async fn chain_id(&self) -> HarvesterResult<u64>;

    /// Submits a signed, EIP-2718 encoded transaction and returns its hash
    async fn send_raw_transaction(&self, raw: Vec<u8>) -> HarvesterResult<B256>;

    /// `None` while the transaction is not included yet
    async fn receipt(&self, hash: B256) -> HarvesterResult<Option<TransactionReceipt>>;

    /// `false` once the ledger has forgotten the transaction (evicted from the mempool)
    async fn transaction_known(&self, hash: B256) -> HarvesterResult<bool>;
}
