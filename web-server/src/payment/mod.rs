// web-server/src/payment/mod.rs
pub mod staking;

use alloy_primitives::U256;
use common::models::{Payment, PaymentStatus, User};
use common::{is_valid_tx_hash, normalize_address, ConfigurationError, PaymentError};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::{find_payment_event, ChainClient, EventDecode, PaymentEvent, TransactionReceipt};
use crate::error::ServiceError;
use crate::store::{PaymentUpsert, Store};

pub use staking::{StakingService, StakingStatus};

/// Parse a configured wei amount
pub fn parse_amount(field: &'static str, value: &str) -> Result<U256, ConfigurationError> {
    U256::from_str_radix(value, 10).map_err(|e| ConfigurationError::Invalid {
        field,
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct PaymentVerifierSettings {
    pub payment_contract: String,
    pub required_amount: U256,
    /// Fail verification when the receipt has no decodable PaymentDone event
    pub require_payment_event: bool,
    pub rpc_timeout: Duration,
}

/// Result of a successful confirmation
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub payment: Payment,
    /// The hash was already CONFIRMED and the chain was not queried
    pub already_confirmed: bool,
}

/// Confirms on-chain payments and grants app access
pub struct PaymentVerifier {
    store: Arc<dyn Store>,
    chain: Arc<dyn ChainClient>,
    settings: PaymentVerifierSettings,
}

impl PaymentVerifier {
    pub fn new(store: Arc<dyn Store>, chain: Arc<dyn ChainClient>, settings: PaymentVerifierSettings) -> Self {
        let settings = PaymentVerifierSettings {
            payment_contract: normalize_address(&settings.payment_contract),
            ..settings
        };
        Self { store, chain, settings }
    }

    pub fn payment_contract(&self) -> &str {
        &self.settings.payment_contract
    }

    pub fn required_amount(&self) -> U256 {
        self.settings.required_amount
    }

    /// Verify `tx_hash` as a payment by `user`.
    ///
    /// Failed checks against the receipt are recorded as FAILED rows; a payer
    /// mismatch or an unreachable node leaves the store untouched.
    pub async fn verify_payment(&self, user: &User, tx_hash: &str) -> Result<PaymentConfirmation, ServiceError> {
        if !is_valid_tx_hash(tx_hash) {
            return Err(PaymentError::InvalidTxHash.into());
        }
        let tx_hash = tx_hash.to_ascii_lowercase();

        if let Some(existing) = self.store.find_payment(&tx_hash).await? {
            if existing.is_confirmed() {
                if existing.user_id != user.id {
                    tracing::warn!("User {} submitted {} already confirmed for another user", user.id, tx_hash);
                    return Err(PaymentError::PayerMismatch.into());
                }
                tracing::debug!("Payment {} already confirmed", tx_hash);
                // repairs a flag write that failed after the row was confirmed
                self.store.set_access(&user.id, true).await?;
                return Ok(PaymentConfirmation {
                    payment: existing,
                    already_confirmed: true,
                });
            }
            // PENDING or FAILED rows are verified again
        }

        let event = match self.check_receipt(&tx_hash).await {
            Ok(event) => event,
            Err(e) if e.is_recorded() => {
                tracing::warn!("Payment {} rejected: {}", tx_hash, e);
                self.store
                    .upsert_payment(PaymentUpsert {
                        tx_hash: tx_hash.clone(),
                        user_id: user.id,
                        amount: "0".to_string(),
                        status: PaymentStatus::Failed,
                    })
                    .await?;
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(event) = &event {
            if event.payer != user.address {
                tracing::warn!("Payment {} was made by {}, not {}", tx_hash, event.payer, user.address);
                return Err(PaymentError::PayerMismatch.into());
            }
        }

        let amount = event
            .as_ref()
            .map(|event| event.amount.to_string())
            .unwrap_or_else(|| "0".to_string());
        let payment = self
            .store
            .upsert_payment(PaymentUpsert {
                tx_hash: tx_hash.clone(),
                user_id: user.id,
                amount,
                status: PaymentStatus::Confirmed,
            })
            .await?;

        // a concurrent confirmation by another account won the row
        if payment.user_id != user.id {
            return Err(PaymentError::PayerMismatch.into());
        }

        self.store.set_access(&user.id, true).await?;
        tracing::info!("Payment {} confirmed for user {} ({} wei)", tx_hash, user.id, payment.amount);

        Ok(PaymentConfirmation {
            payment,
            already_confirmed: false,
        })
    }

    /// Most recent confirmed payment of `user`
    pub async fn confirmed_payment_for(&self, user: &User) -> Result<Option<Payment>, ServiceError> {
        Ok(self.store.latest_confirmed_payment(&user.id).await?)
    }

    async fn fetch_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, PaymentError> {
        match tokio::time::timeout(self.settings.rpc_timeout, self.chain.transaction_receipt(tx_hash)).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(e)) => {
                tracing::error!("Failed to fetch receipt for {}: {}", tx_hash, e);
                Err(PaymentError::UpstreamUnavailable)
            }
            Err(_) => {
                tracing::error!("Timed out fetching receipt for {}", tx_hash);
                Err(PaymentError::UpstreamUnavailable)
            }
        }
    }

    /// Check the receipt and return the decoded payment event, if any
    async fn check_receipt(&self, tx_hash: &str) -> Result<Option<PaymentEvent>, PaymentError> {
        let receipt = self
            .fetch_receipt(tx_hash)
            .await?
            .ok_or(PaymentError::TransactionNotFound)?;

        if !receipt.success {
            return Err(PaymentError::TransactionFailed);
        }

        let destination = receipt.to.as_deref().map(normalize_address);
        if destination.as_deref() != Some(self.settings.payment_contract.as_str()) {
            return Err(PaymentError::WrongDestination);
        }

        let event = match find_payment_event(&receipt.logs, &self.settings.payment_contract) {
            EventDecode::Decoded(event) => event,
            EventDecode::Failure(reason) if self.settings.require_payment_event => {
                return Err(PaymentError::PaymentEventMissing(reason));
            }
            EventDecode::Failure(reason) => {
                tracing::warn!("Accepting {} without a payment event: {}", tx_hash, reason);
                return Ok(None);
            }
        };

        if self.settings.require_payment_event && event.amount < self.settings.required_amount {
            return Err(PaymentError::InsufficientAmount {
                paid: event.amount.to_string(),
                required: self.settings.required_amount.to_string(),
            });
        }

        Ok(Some(event))
    }
}
