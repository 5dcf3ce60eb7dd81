// web-server/src/state.rs
use common::{Config, ConfigurationError};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, SessionManager};
use crate::chain::ChainClient;
use crate::gate::AccessGate;
use crate::payment::{parse_amount, PaymentVerifier, PaymentVerifierSettings, StakingService};
use crate::store::Store;

/// Services shared by all workers, registered as `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub sessions: Arc<SessionManager>,
    pub auth: Arc<AuthService>,
    pub payments: Arc<PaymentVerifier>,
    pub staking: Arc<StakingService>,
    pub gate: Arc<AccessGate>,
}

impl AppState {
    /// Wire the services together. Fails on configuration the services cannot use.
    pub fn build(
        config: Config,
        store: Arc<dyn Store>,
        chain: Arc<dyn ChainClient>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let required_amount = parse_amount("payment.fixed_amount", &config.payment.fixed_amount)?;
        let min_staked_amount = parse_amount("payment.min_staked_amount", &config.payment.min_staked_amount)?;
        let rpc_timeout = Duration::from_secs(config.chain.rpc_timeout_secs);

        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            &config.auth.session_secret,
            config.auth.session_ttl_days,
        )?);
        let auth = Arc::new(AuthService::new(store.clone(), sessions.clone()));
        let payments = Arc::new(PaymentVerifier::new(
            store.clone(),
            chain.clone(),
            PaymentVerifierSettings {
                payment_contract: config.chain.payment_contract.clone(),
                required_amount,
                require_payment_event: config.payment.require_payment_event,
                rpc_timeout,
            },
        ));
        let staking = Arc::new(StakingService::new(
            chain,
            &config.chain.staking_contract,
            min_staked_amount,
            rpc_timeout,
        ));
        let gate = Arc::new(AccessGate::new(sessions.clone(), payments.clone()));

        Ok(Self {
            config: Arc::new(config),
            store,
            sessions,
            auth,
            payments,
            staking,
            gate,
        })
    }
}
