// web-server/src/gate.rs
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use common::models::{Payment, User};
use common::AuthError;
use futures_util::future::LocalBoxFuture;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::error::ServiceError;
use crate::payment::PaymentVerifier;
use crate::state::AppState;

/// Cookie carrying the session token
pub const SESSION_COOKIE_NAME: &str = "auth_session";

/// What a request is allowed to see
#[derive(Debug, Clone)]
pub enum AccessStatus {
    Unauthenticated,
    /// Signed in, no confirmed payment yet
    Unpaid(User),
    Granted { user: User, payment: Payment },
}

/// Combines session resolution with the payment check
pub struct AccessGate {
    sessions: Arc<SessionManager>,
    payments: Arc<PaymentVerifier>,
}

impl AccessGate {
    pub fn new(sessions: Arc<SessionManager>, payments: Arc<PaymentVerifier>) -> Self {
        Self { sessions, payments }
    }

    pub async fn check(&self, token: Option<&str>) -> Result<AccessStatus, ServiceError> {
        let user = match token {
            Some(token) => self.sessions.resolve_session(token).await?,
            None => None,
        };
        let user = match user {
            Some(user) => user,
            None => return Ok(AccessStatus::Unauthenticated),
        };

        match self.payments.confirmed_payment_for(&user).await? {
            Some(payment) => Ok(AccessStatus::Granted { user, payment }),
            None => Ok(AccessStatus::Unpaid(user)),
        }
    }

    /// 401 without a session, 402 without a confirmed payment
    pub async fn require_access(&self, token: Option<&str>) -> Result<(User, Payment), ServiceError> {
        match self.check(token).await? {
            AccessStatus::Unauthenticated => Err(AuthError::Unauthorized.into()),
            AccessStatus::Unpaid(user) => {
                tracing::debug!("User {} has not paid", user.id);
                Err(ServiceError::PaymentRequired)
            }
            AccessStatus::Granted { user, payment } => Ok((user, payment)),
        }
    }
}

fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, ServiceError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ServiceError::Configuration("application state is not registered".to_string()))
}

/// Extractor for handlers that need a signed-in user
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = session_token(req);

        Box::pin(async move {
            let user = state?.sessions.require_session(token.as_deref()).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}

/// Extractor for handlers behind the payment wall
#[derive(Debug, Clone)]
pub struct PaidUser {
    pub user: User,
    pub payment: Payment,
}

impl FromRequest for PaidUser {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = session_token(req);

        Box::pin(async move {
            let (user, payment) = state?.gate.require_access(token.as_deref()).await?;
            Ok(PaidUser { user, payment })
        })
    }
}

/// Session cookie living as long as the session itself
pub fn session_cookie(token: &str, max_age: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, token.to_string())
        .path("/")
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age.num_seconds()))
        .finish()
}

/// Cookie instructing the browser to drop the session cookie
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .secure(secure)
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    cookie.make_removal();
    cookie
}
