// Common Crate - utils.rs
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};
use serde::{Serialize, Deserialize};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

/// Setup tracing for consistent logging, honouring `RUST_LOG` when set
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,       // user id
    pub jti: String,       // session id, keeps tokens unique per login
    pub exp: usize,        // expiration time
    pub iat: usize,        // issued at time
}

/// Identity carried by a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokenData {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Sign a session token. `expires_at` must be the same instant stored on the session row.
pub fn generate_session_token(
    user_id: &Uuid,
    session_id: &Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        jti: session_id.to_string(),
        iat: issued_at.timestamp().max(0) as usize,
        exp: expires_at.timestamp().max(0) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret)
    )
}

/// Check signature and expiry of a session token and extract its identity
pub fn validate_session_token(token: &str, secret: &[u8]) -> Result<SessionTokenData, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation
    )?;

    let user_id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| jsonwebtoken::errors::ErrorKind::InvalidSubject)?;
    let session_id = Uuid::parse_str(&token_data.claims.jti)
        .map_err(|_| jsonwebtoken::errors::ErrorKind::InvalidToken)?;
    let expires_at = Utc
        .timestamp_opt(token_data.claims.exp as i64, 0)
        .single()
        .ok_or(jsonwebtoken::errors::ErrorKind::ExpiredSignature)?;

    Ok(SessionTokenData { user_id, session_id, expires_at })
}

/// `0x` followed by exactly 40 hex digits, any letter case
pub fn is_valid_address(address: &str) -> bool {
    is_prefixed_hex(address, 40)
}

/// `0x` followed by exactly 64 hex digits, any letter case
pub fn is_valid_tx_hash(hash: &str) -> bool {
    is_prefixed_hex(hash, 64)
}

pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}

fn is_prefixed_hex(value: &str, digits: usize) -> bool {
    match value.strip_prefix("0x") {
        Some(rest) => rest.len() == digits && rest.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
