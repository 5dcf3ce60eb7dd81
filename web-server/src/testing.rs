// web-server/src/testing.rs
//! Fixtures shared by unit and integration tests: deterministic wallets,
//! hand-built receipts and an in-memory chain.

use alloy_primitives::{eip191_hash_message, U256};
use async_trait::async_trait;
use common::{AuthConfig, ChainConfig, Config, PaymentConfig, ServerConfig};
use dashmap::DashMap;
use k256::ecdsa::SigningKey;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::auth::signature::public_key_to_address;
use crate::chain::events::payment_done_topic;
use crate::chain::{ChainClient, ChainError, Log, TransactionReceipt};

pub const TEST_PAYMENT_CONTRACT: &str = "0x02278441aa8acf07e9c1aea074d3a36e1dd4f4fd";
pub const TEST_STAKING_CONTRACT: &str = "0x3333333333333333333333333333333333333333";
pub const TEST_FIXED_AMOUNT: u64 = 1_000;

/// Deterministic wallet. `seed` must be non-zero.
pub fn test_signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).expect("seed must produce a valid scalar")
}

pub fn address_of(key: &SigningKey) -> String {
    public_key_to_address(key.verifying_key())
}

/// `personal_sign` as a wallet performs it, with `v` in 27/28 form
pub fn sign_personal_message(key: &SigningKey, message: &str) -> String {
    let digest = eip191_hash_message(message.as_bytes());
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(digest.as_slice())
        .expect("signing a 32-byte digest");

    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

/// A `PaymentDone(payer, amount)` log emitted by `emitter`
pub fn payment_done_log(emitter: &str, payer: &str, amount: U256) -> Log {
    let payer = hex::decode(payer.trim_start_matches("0x")).expect("payer must be hex");
    let mut payer_topic = vec![0u8; 12];
    payer_topic.extend_from_slice(&payer);

    Log {
        address: emitter.to_string(),
        topics: vec![
            format!("0x{}", hex::encode(payment_done_topic())),
            format!("0x{}", hex::encode(payer_topic)),
        ],
        data: format!("0x{}", hex::encode(amount.to_be_bytes::<32>())),
    }
}

/// Successful receipt of a call to `to`; with a payer it carries the payment event
pub fn payment_receipt(tx_hash: &str, to: &str, payer: Option<&str>, amount: U256) -> TransactionReceipt {
    let logs = payer
        .map(|payer| vec![payment_done_log(to, payer, amount)])
        .unwrap_or_default();

    TransactionReceipt {
        transaction_hash: tx_hash.to_string(),
        from: payer.unwrap_or("0x0000000000000000000000000000000000000000").to_string(),
        to: Some(to.to_string()),
        success: true,
        logs,
    }
}

/// Chain client backed by maps the test fills in
#[derive(Default)]
pub struct FakeChainClient {
    receipts: DashMap<String, TransactionReceipt>,
    staked: DashMap<String, U256>,
    unavailable: AtomicBool,
    receipt_calls: AtomicUsize,
}

impl FakeChainClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_receipt(&self, receipt: TransactionReceipt) {
        self.receipts
            .insert(receipt.transaction_hash.to_ascii_lowercase(), receipt);
    }

    pub fn set_staked_balance(&self, account: &str, amount: U256) {
        self.staked.insert(account.to_ascii_lowercase(), amount);
    }

    /// Make every call fail as if the node were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn receipt_calls(&self) -> usize {
        self.receipt_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ChainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "node unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, ChainError> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .receipts
            .get(&tx_hash.to_ascii_lowercase())
            .map(|receipt| receipt.clone()))
    }

    async fn staked_balance_of(&self, _contract: &str, account: &str) -> Result<U256, ChainError> {
        self.check_available()?;
        Ok(self
            .staked
            .get(&account.to_ascii_lowercase())
            .map(|amount| *amount)
            .unwrap_or(U256::ZERO))
    }
}

/// A valid configuration pointing at the test contracts
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        auth: AuthConfig {
            session_secret: "test-session-secret".to_string(),
            session_ttl_days: 7,
            cookie_secure: false,
            cleanup_interval_secs: 3600,
            nonce_rate_limit_per_minute: 100,
        },
        chain: ChainConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            rpc_timeout_secs: 5,
            payment_contract: TEST_PAYMENT_CONTRACT.to_string(),
            staking_contract: TEST_STAKING_CONTRACT.to_string(),
            token_address: None,
        },
        payment: PaymentConfig {
            fixed_amount: TEST_FIXED_AMOUNT.to_string(),
            min_staked_amount: "100".to_string(),
            require_payment_event: false,
        },
    }
}
