// web-server/src/api/auth.rs
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use common::{
    AuthStatusResponse, LogoutResponse, MeResponse, NonceRequest, NonceResponse, UserSummary,
    VerifyRequest, VerifyResponse,
};

use crate::error::ServiceError;
use crate::gate::{removal_cookie, session_cookie, AuthenticatedUser, SESSION_COOKIE_NAME};
use crate::state::AppState;

fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE_NAME).map(|c| c.value().to_string())
}

// Issue a sign-in challenge for a wallet
#[post("/nonce")]
pub async fn nonce(
    state: web::Data<AppState>,
    body: web::Json<NonceRequest>,
) -> Result<HttpResponse, ServiceError> {
    let challenge = state.auth.issue_nonce(&body.address).await?;

    Ok(HttpResponse::Ok().json(NonceResponse {
        message: challenge.message,
        nonce: challenge.nonce,
    }))
}

// Verify the signed challenge and start a session
#[post("/verify")]
pub async fn verify(
    state: web::Data<AppState>,
    body: web::Json<VerifyRequest>,
) -> Result<HttpResponse, ServiceError> {
    let (user, session) = state
        .auth
        .verify_signature(&body.address, &body.signature)
        .await?;

    let cookie = session_cookie(
        &session.token,
        state.sessions.ttl(),
        state.config.auth.cookie_secure,
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(VerifyResponse {
        success: true,
        address: user.address,
    }))
}

#[get("/me")]
pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse::from(&user))
}

// Never fails: an unusable session just reports as signed out
#[get("/status")]
pub async fn status(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let user = match session_token(&req) {
        Some(token) => match state.sessions.resolve_session(&token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Failed to resolve session for status check: {}", e);
                None
            }
        },
        None => None,
    };

    let response = match user {
        Some(user) => AuthStatusResponse {
            is_authenticated: true,
            is_logged_in: user.has_access,
            user: Some(UserSummary {
                id: user.id,
                address: user.address,
            }),
        },
        None => AuthStatusResponse {
            is_authenticated: false,
            is_logged_in: false,
            user: None,
        },
    };

    HttpResponse::Ok().json(response)
}

// Always clears the cookie, even if the session row could not be removed
#[post("/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(token) = session_token(&req) {
        if let Err(e) = state.sessions.destroy_session(&token).await {
            tracing::error!("Failed to destroy session on logout: {}", e);
        }
    }

    HttpResponse::Ok()
        .cookie(removal_cookie(state.config.auth.cookie_secure))
        .json(LogoutResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        })
}
