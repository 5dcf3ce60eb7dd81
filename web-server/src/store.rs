// web-server/src/store.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::models::{Payment, PaymentStatus, Session, User};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("storage failure: {0}")]
    Internal(String),
}

/// Values written by a payment upsert
#[derive(Debug, Clone)]
pub struct PaymentUpsert {
    pub tx_hash: String,
    pub user_id: Uuid,
    pub amount: String,
    pub status: PaymentStatus,
}

/// Persistence for users, sessions and payments.
///
/// Every method is a single atomic step; callers never hold locks across calls.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create the user if needed and replace any outstanding nonce
    async fn upsert_user_nonce(&self, address: &str, nonce: &str) -> Result<(User, bool), StoreError>;

    async fn find_user_by_address(&self, address: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>, StoreError>;

    /// Clear the nonce only if it still equals `expected`. Returns whether it was cleared.
    async fn consume_nonce(&self, address: &str, expected: &str) -> Result<bool, StoreError>;

    async fn set_access(&self, user_id: &Uuid, has_access: bool) -> Result<(), StoreError>;

    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Returns whether a session was removed
    async fn delete_session(&self, token: &str) -> Result<bool, StoreError>;

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    async fn find_payment(&self, tx_hash: &str) -> Result<Option<Payment>, StoreError>;

    async fn latest_confirmed_payment(&self, user_id: &Uuid) -> Result<Option<Payment>, StoreError>;

    /// Insert or update by transaction hash. A CONFIRMED row is returned unchanged.
    async fn upsert_payment(&self, upsert: PaymentUpsert) -> Result<Payment, StoreError>;
}

/// In-process store backed by sharded concurrent maps
#[derive(Default)]
pub struct MemoryStore {
    // address -> user
    users: DashMap<String, User>,
    // user id -> address
    user_ids: DashMap<Uuid, String>,
    // token -> session
    sessions: DashMap<String, Session>,
    // tx hash -> payment
    payments: DashMap<String, Payment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_user_nonce(&self, address: &str, nonce: &str) -> Result<(User, bool), StoreError> {
        let mut created = false;
        let user = self
            .users
            .entry(address.to_string())
            .and_modify(|user| user.nonce = Some(nonce.to_string()))
            .or_insert_with(|| {
                created = true;
                let user = User::new(address.to_string(), Some(nonce.to_string()));
                // indexed before the address entry is released
                self.user_ids.insert(user.id, user.address.clone());
                user
            })
            .value()
            .clone();

        Ok((user, created))
    }

    async fn find_user_by_address(&self, address: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(address).map(|entry| entry.value().clone()))
    }

    async fn find_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>, StoreError> {
        let address = match self.user_ids.get(user_id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        self.find_user_by_address(&address).await
    }

    async fn consume_nonce(&self, address: &str, expected: &str) -> Result<bool, StoreError> {
        // get_mut holds the shard write lock for the compare and the clear
        match self.users.get_mut(address) {
            Some(mut user) if user.nonce.as_deref() == Some(expected) => {
                user.nonce = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_access(&self, user_id: &Uuid, has_access: bool) -> Result<(), StoreError> {
        let address = self
            .user_ids
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::UserNotFound(*user_id))?;

        match self.users.get_mut(&address) {
            Some(mut user) => {
                user.has_access = has_access;
                Ok(())
            }
            None => Err(StoreError::UserNotFound(*user_id)),
        }
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        self.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(token).map(|entry| entry.value().clone()))
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn find_payment(&self, tx_hash: &str) -> Result<Option<Payment>, StoreError> {
        Ok(self.payments.get(tx_hash).map(|entry| entry.value().clone()))
    }

    async fn latest_confirmed_payment(&self, user_id: &Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .iter()
            .filter(|entry| entry.user_id == *user_id && entry.is_confirmed())
            .max_by_key(|entry| entry.created_at)
            .map(|entry| entry.value().clone()))
    }

    async fn upsert_payment(&self, upsert: PaymentUpsert) -> Result<Payment, StoreError> {
        let now = Utc::now();

        let payment = match self.payments.entry(upsert.tx_hash.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                // a non-confirmed row belongs to whoever last submitted it
                if existing.status != PaymentStatus::Confirmed {
                    existing.user_id = upsert.user_id;
                    existing.status = upsert.status;
                    if upsert.status == PaymentStatus::Confirmed {
                        existing.amount = upsert.amount;
                    }
                    existing.updated_at = now;
                }
                existing.clone()
            }
            Entry::Vacant(vacant) => vacant
                .insert(Payment {
                    id: Uuid::new_v4(),
                    tx_hash: upsert.tx_hash,
                    user_id: upsert.user_id,
                    amount: upsert.amount,
                    status: upsert.status,
                    created_at: now,
                    updated_at: now,
                })
                .value()
                .clone(),
        };

        Ok(payment)
    }
}
