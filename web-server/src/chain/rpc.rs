// web-server/src/chain/rpc.rs
use alloy_primitives::{keccak256, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{decode_hex, ChainClient, ChainError, Log, TransactionReceipt};

const STAKED_BALANCE_SIGNATURE: &str = "stakedBalanceOf(address)";

/// Ethereum JSON-RPC client. Created once at startup and shared.
pub struct JsonRpcChainClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    from: String,
    to: Option<String>,
    status: Option<String>,
    #[serde(default)]
    logs: Vec<Log>,
}

impl From<RpcReceipt> for TransactionReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            from: receipt.from,
            to: receipt.to,
            // pre-byzantium receipts carry no status and are treated as failed
            success: receipt.status.as_deref() == Some("0x1"),
            logs: receipt.logs,
        }
    }
}

impl JsonRpcChainClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!("rpc {} (id {})", method, id);
        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }
}

/// Calldata for `stakedBalanceOf(account)`
pub(crate) fn staked_balance_calldata(account: &str) -> Result<String, ChainError> {
    let account = decode_hex(account).map_err(ChainError::InvalidResponse)?;
    if account.len() != 20 {
        return Err(ChainError::InvalidResponse("account is not 20 bytes".to_string()));
    }

    let selector = keccak256(STAKED_BALANCE_SIGNATURE.as_bytes());
    let mut calldata = Vec::with_capacity(4 + 32);
    calldata.extend_from_slice(&selector.as_slice()[..4]);
    calldata.extend_from_slice(&[0u8; 12]);
    calldata.extend_from_slice(&account);
    Ok(format!("0x{}", hex::encode(calldata)))
}

fn decode_uint256(value: &str) -> Result<U256, ChainError> {
    let bytes = decode_hex(value).map_err(ChainError::InvalidResponse)?;
    if bytes.len() != 32 {
        return Err(ChainError::InvalidResponse(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    U256::try_from_be_slice(&bytes)
        .ok_or_else(|| ChainError::InvalidResponse("value does not fit in uint256".to_string()))
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, ChainError> {
        let receipt: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        Ok(receipt.map(TransactionReceipt::from))
    }

    async fn staked_balance_of(&self, contract: &str, account: &str) -> Result<U256, ChainError> {
        let data = staked_balance_calldata(account)?;
        let result: Option<String> = self
            .call("eth_call", json!([{ "to": contract, "data": data }, "latest"]))
            .await?;

        let result = result.ok_or_else(|| ChainError::InvalidResponse("empty eth_call result".to_string()))?;
        decode_uint256(&result)
    }
}
