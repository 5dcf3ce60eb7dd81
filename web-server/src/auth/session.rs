// web-server/src/auth/session.rs
use chrono::{Duration, SubsecRound, Utc};
use common::models::{Session, User};
use common::{generate_session_token, validate_session_token, AuthError, ConfigurationError};
use jsonwebtoken::errors::ErrorKind;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::store::Store;

/// Issues, resolves and revokes session tokens.
///
/// A session is valid only when the token verifies against the secret, is
/// unexpired, and a matching session row still exists.
pub struct SessionManager {
    store: Arc<dyn Store>,
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn Store>, secret: &str, ttl_days: i64) -> Result<Self, ConfigurationError> {
        let ttl = Duration::try_days(ttl_days).ok_or_else(|| ConfigurationError::Invalid {
            field: "auth.session_ttl_days",
            reason: format!("{} days is out of range", ttl_days),
        })?;

        Ok(Self {
            store,
            secret: secret.as_bytes().to_vec(),
            ttl,
        })
    }

    /// Validity window of newly issued sessions
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<Session, ServiceError> {
        let now = Utc::now().trunc_subsecs(0);
        // token exp has second precision, the row must match it exactly
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| ServiceError::Internal(format!("session expiry overflows with ttl {}", self.ttl)))?;
        let session_id = Uuid::new_v4();

        let token = generate_session_token(&user_id, &session_id, now, expires_at, &self.secret)
            .map_err(|e| ServiceError::Internal(format!("failed to sign session token: {}", e)))?;

        let session = Session {
            id: session_id,
            user_id,
            token,
            created_at: now,
            expires_at,
        };
        self.store.insert_session(session.clone()).await?;

        tracing::info!("Created session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Resolve a token to its user, or `None` when any check fails
    pub async fn resolve_session(&self, token: &str) -> Result<Option<User>, ServiceError> {
        let claims = match validate_session_token(token, &self.secret) {
            Ok(claims) => claims,
            Err(e) => {
                if matches!(e.kind(), ErrorKind::ExpiredSignature) && self.store.delete_session(token).await? {
                    tracing::debug!("Removed session of expired token");
                } else {
                    tracing::debug!("Rejected session token: {}", e);
                }
                return Ok(None);
            }
        };

        let session = match self.store.find_session(token).await? {
            Some(session) => session,
            None => {
                tracing::debug!("No session row for token of user {}", claims.user_id);
                return Ok(None);
            }
        };

        if session.is_expired() {
            tracing::debug!("Session {} expired, removing", session.id);
            self.store.delete_session(token).await?;
            return Ok(None);
        }

        if session.user_id != claims.user_id
            || session.id != claims.session_id
            || session.expires_at != claims.expires_at
        {
            tracing::warn!("Session {} does not match its token claims", session.id);
            return Ok(None);
        }

        Ok(self.store.find_user_by_id(&session.user_id).await?)
    }

    /// Like `resolve_session`, but a missing session is `Unauthorized`
    pub async fn require_session(&self, token: Option<&str>) -> Result<User, ServiceError> {
        let token = token.ok_or(AuthError::Unauthorized)?;
        self.resolve_session(token)
            .await?
            .ok_or_else(|| AuthError::Unauthorized.into())
    }

    /// Remove the session row. Unknown tokens are not an error.
    pub async fn destroy_session(&self, token: &str) -> Result<(), ServiceError> {
        if self.store.delete_session(token).await? {
            tracing::info!("Session destroyed");
        } else {
            tracing::debug!("Attempt to destroy non-existent session");
        }
        Ok(())
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<usize, ServiceError> {
        Ok(self.store.delete_expired_sessions(Utc::now()).await?)
    }
}
