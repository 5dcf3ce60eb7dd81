// web-server/src/api/mod.rs
pub mod app;
pub mod auth;
pub mod payment;
pub mod staking;

use actix_web::{get, web, HttpResponse, Responder};
use serde_json::json;

use crate::error::ServiceError;

/// Paths whose requests count against the per-IP sign-in limit
pub const RATE_LIMITED_PATHS: [&str; 2] = ["/api/auth/nonce", "/api/auth/verify"];

#[get("")]
pub async fn api_index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Wallet Payment Gate API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // malformed bodies surface as InvalidRequest instead of actix's plain-text 400
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ServiceError::InvalidRequest(err.to_string()).into());

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .service(api_index)
            .service(
                web::scope("/auth")
                    .service(auth::nonce)
                    .service(auth::verify)
                    .service(auth::me)
                    .service(auth::status)
                    .service(auth::logout),
            )
            .service(
                web::scope("/payment")
                    .service(payment::initiate)
                    .service(payment::confirm)
                    .service(payment::status)
                    .service(payment::check),
            )
            .service(web::scope("/staking").service(staking::status))
            .service(app::app),
    );
}
