//! Ethereum JSON-RPC client backing the `LedgerGateway` capability

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::{gateway::LedgerGateway, types::TransactionReceipt};

use super::{
    common::{
        bytes_to_hex, hex_to_bytes, quantity_to_u128, quantity_to_u64, string_to_hash,
    },
    error::{HarvesterError, HarvesterResult},
};

/// Error object of a JSON-RPC response
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC response envelope. `result` stays raw so that a `null` result can mean "not found".
#[derive(Clone, Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    pub error: Option<RpcErrorObject>,
}

impl RpcResponse {
    /// Extracts the result as `T`, or the node's error
    pub fn into_result<T: DeserializeOwned>(self) -> HarvesterResult<T> {
        if let Some(error) = self.error {
            return Err(HarvesterError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }
        serde_json::from_value(self.result).map_err(|err| {
            HarvesterError::DecodingError(format!("Could not decode the RPC result: {}", err))
        })
    }
}

/// Receipt as returned by `eth_getTransactionReceipt`
#[derive(Clone, Debug, Deserialize)]
pub struct RpcReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,

    /// "0x1" on success, "0x0" on failure. Absent on pre-Byzantium chains.
    pub status: Option<String>,

    #[serde(rename = "blockNumber")]
    pub block_number: String,

    #[serde(rename = "blockHash")]
    pub block_hash: String,

    #[serde(rename = "gasUsed")]
    pub gas_used: String,
}

impl TryFrom<RpcReceipt> for TransactionReceipt {
    type Error = HarvesterError;

    fn try_from(value: RpcReceipt) -> Result<Self, Self::Error> {
        let status = match value.status.as_deref() {
            Some(status) => quantity_to_u64(status)? == 1,
            None => {
                return Err(HarvesterError::DecodingError(
                    "The receipt does not carry a status field.".to_string(),
                ))
            }
        };

        Ok(Self {
            transaction_hash: string_to_hash(&value.transaction_hash)?,
            status,
            block_number: quantity_to_u64(&value.block_number)?,
            block_hash: string_to_hash(&value.block_hash)?,
            gas_used: quantity_to_u128(&value.gas_used)?,
        })
    }
}

/// HTTP JSON-RPC gateway
pub struct RpcGateway {
    client: reqwest::Client,
    url: String,
    request_id: AtomicU64,
}

impl RpcGateway {
    pub fn new<S: Into<String>>(url: S, timeout: Duration) -> HarvesterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| HarvesterError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    /// Performs a single JSON-RPC request
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> HarvesterResult<T> {
        let args = json!({
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "jsonrpc": "2.0",
            "params": params,
            "method": method
        });
        debug!(method, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&args)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| HarvesterError::Transport(format!("{}: {}", method, err)))?;

        let decoded_response: RpcResponse = response.json().await.map_err(|err| {
            HarvesterError::DecodingError(format!(
                "Could not decode {} response: {}",
                method, err
            ))
        })?;

        decoded_response.into_result()
    }
}

#[async_trait]
impl LedgerGateway for RpcGateway {
    async fn call(&self, to: Address, data: Vec<u8>) -> HarvesterResult<Vec<u8>> {
        let result: String = self
            .request(
                "eth_call",
                json!([{ "to": to.to_string(), "data": bytes_to_hex(&data) }, "latest"]),
            )
            .await?;
        hex_to_bytes(&result)
    }

    async fn nonce(&self, address: Address) -> HarvesterResult<u64> {
        let result: String = self
            .request(
                "eth_getTransactionCount",
                json!([address.to_string(), "pending"]),
            )
            .await?;
        quantity_to_u64(&result)
    }

    async fn gas_price(&self) -> HarvesterResult<u128> {
        let result: String = self.request("eth_gasPrice", json!([])).await?;
        quantity_to_u128(&result)
    }

    async fn chain_id(&self) -> HarvesterResult<u64> {
        let result: String = self.request("eth_chainId", json!([])).await?;
        quantity_to_u64(&result)
    }

    async fn send_raw_transaction(&self, raw: Vec<u8>) -> HarvesterResult<B256> {
        let result: String = self
            .request("eth_sendRawTransaction", json!([bytes_to_hex(&raw)]))
            .await
            .map_err(|err| HarvesterError::Submission(err.to_string()))?;
        string_to_hash(&result)
    }

    async fn receipt(&self, hash: B256) -> HarvesterResult<Option<TransactionReceipt>> {
        let result: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        result.map(TransactionReceipt::try_from).transpose()
    }

    async fn transaction_known(&self, hash: B256) -> HarvesterResult<bool> {
        let result: Value = self
            .request("eth_getTransactionByHash", json!([hash.to_string()]))
            .await?;
        Ok(!result.is_null())
    }
}
