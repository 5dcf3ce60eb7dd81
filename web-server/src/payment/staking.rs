// web-server/src/payment/staking.rs
use alloy_primitives::U256;
use common::models::User;
use common::{normalize_address, PaymentError, StakingState};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::ChainClient;
use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingStatus {
    pub state: StakingState,
    pub staked_amount: U256,
    pub min_staked_amount: U256,
}

/// Reads a user's stake from the staking contract
pub struct StakingService {
    chain: Arc<dyn ChainClient>,
    staking_contract: String,
    min_staked_amount: U256,
    rpc_timeout: Duration,
}

impl StakingService {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        staking_contract: &str,
        min_staked_amount: U256,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            staking_contract: normalize_address(staking_contract),
            min_staked_amount,
            rpc_timeout,
        }
    }

    pub async fn staking_status(&self, user: &User) -> Result<StakingStatus, ServiceError> {
        let lookup = self.chain.staked_balance_of(&self.staking_contract, &user.address);
        let staked_amount = match tokio::time::timeout(self.rpc_timeout, lookup).await {
            Ok(Ok(amount)) => amount,
            Ok(Err(e)) => {
                tracing::error!("Failed to read stake of {}: {}", user.address, e);
                return Err(PaymentError::UpstreamUnavailable.into());
            }
            Err(_) => {
                tracing::error!("Timed out reading stake of {}", user.address);
                return Err(PaymentError::UpstreamUnavailable.into());
            }
        };

        let state = if staked_amount >= self.min_staked_amount {
            StakingState::HasStaked
        } else {
            StakingState::WaitingForStaking
        };

        Ok(StakingStatus {
            state,
            staked_amount,
            min_staked_amount: self.min_staked_amount,
        })
    }
}
