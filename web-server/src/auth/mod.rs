// web-server/src/auth/mod.rs
pub mod session;
pub mod signature;

use common::models::{Session, User};
use common::{is_valid_address, normalize_address, AuthError};
use std::sync::Arc;

use crate::error::ServiceError;
use crate::store::Store;
use crate::utils::token::generate_nonce;

pub use session::SessionManager;
pub use signature::recover_signer;

/// The text a wallet signs to prove control of `address`.
///
/// Must stay byte-for-byte stable: any change invalidates outstanding challenges.
pub fn auth_message(nonce: &str, address: &str) -> String {
    format!(
        "Sign this message to authenticate with your wallet.\n\
         \n\
         Address: {}\n\
         Nonce: {}\n\
         \n\
         This request will not trigger a blockchain transaction or cost any gas fees.",
        address, nonce
    )
}

/// A freshly issued sign-in challenge
#[derive(Debug, Clone)]
pub struct NonceChallenge {
    pub user: User,
    pub nonce: String,
    pub message: String,
}

/// Nonce issuance and signature verification
pub struct AuthService {
    store: Arc<dyn Store>,
    sessions: Arc<SessionManager>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, sessions: Arc<SessionManager>) -> Self {
        Self { store, sessions }
    }

    /// Issue a new challenge for `address`, replacing any earlier one
    pub async fn issue_nonce(&self, address: &str) -> Result<NonceChallenge, ServiceError> {
        if !is_valid_address(address) {
            return Err(AuthError::InvalidAddress.into());
        }
        let address = normalize_address(address);
        let nonce = generate_nonce();

        let (user, created) = self.store.upsert_user_nonce(&address, &nonce).await?;
        if created {
            tracing::info!("Registered new user {} for {}", user.id, address);
        }

        let message = auth_message(&nonce, &address);
        Ok(NonceChallenge { user, nonce, message })
    }

    /// Check `signature` against the outstanding challenge and open a session.
    ///
    /// At most one call succeeds per issued nonce.
    pub async fn verify_signature(
        &self,
        address: &str,
        signature: &str,
    ) -> Result<(User, Session), ServiceError> {
        if !is_valid_address(address) {
            return Err(AuthError::InvalidAddress.into());
        }
        let address = normalize_address(address);

        let user = self
            .store
            .find_user_by_address(&address)
            .await?
            .ok_or(AuthError::NoNonce)?;
        let nonce = user.nonce.clone().ok_or(AuthError::NoNonce)?;

        let message = auth_message(&nonce, &address);
        let recovered = match recover_signer(&message, signature) {
            Ok(recovered) => recovered,
            Err(e) => {
                tracing::warn!("Unusable signature for {}: {}", address, e);
                return Err(AuthError::SignatureInvalid.into());
            }
        };
        if recovered != address {
            tracing::warn!("Signature for {} was made by {}", address, recovered);
            return Err(AuthError::SignatureInvalid.into());
        }

        // a concurrent verification or a newer nonce got there first
        if !self.store.consume_nonce(&address, &nonce).await? {
            tracing::warn!("Nonce for {} was already consumed or replaced", address);
            return Err(AuthError::NoNonce.into());
        }

        let session = self.sessions.create_session(user.id).await?;
        tracing::info!("Wallet {} signed in", address);

        let user = User { nonce: None, ..user };
        Ok((user, session))
    }
}
