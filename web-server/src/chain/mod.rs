// web-server/src/chain/mod.rs
pub mod events;
pub mod rpc;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use events::{find_payment_event, EventDecode, PaymentEvent};
pub use rpc::JsonRpcChainClient;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

/// A log emitted during transaction execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Log {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

/// The parts of a transaction receipt the payment check needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub from: String,
    /// `None` for contract creation
    pub to: Option<String>,
    pub success: bool,
    pub logs: Vec<Log>,
}

/// Read-only view of the blockchain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Receipt of a mined transaction, `None` if unknown or still pending
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, ChainError>;

    /// `stakedBalanceOf(account)` on the staking contract
    async fn staked_balance_of(&self, contract: &str, account: &str) -> Result<U256, ChainError>;
}

/// Decode `0x`-prefixed hex
pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>, String> {
    let raw = value
        .strip_prefix("0x")
        .ok_or_else(|| format!("missing 0x prefix in `{}`", value))?;
    hex::decode(raw).map_err(|e| e.to_string())
}
