// Web Server - main.rs
use actix::Actor;
use actix_web::{web, App, HttpServer};
use common::{setup_tracing, Config};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use web_server::api;
use web_server::chain::JsonRpcChainClient;
use web_server::middleware::RateLimiter;
use web_server::session_janitor::SessionJanitor;
use web_server::state::AppState;
use web_server::store::MemoryStore;

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    tracing::error!("Startup failed: {}", e);
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    setup_tracing();

    // Missing or malformed configuration stops the server before it binds
    let config = Config::load().map_err(startup_error)?;
    let server_addr = config.server.addr.clone();

    let chain = JsonRpcChainClient::new(
        &config.chain.rpc_url,
        Duration::from_secs(config.chain.rpc_timeout_secs),
    )
    .map_err(startup_error)?;

    let rate_limit = config.auth.nonce_rate_limit_per_minute;
    let cleanup_interval = config.auth.cleanup_interval_secs;

    let state = AppState::build(config, Arc::new(MemoryStore::new()), Arc::new(chain))
        .map_err(startup_error)?;

    let _janitor = SessionJanitor::new(state.sessions.clone())
        .with_cleanup_interval(cleanup_interval)
        .start();

    let limiter = RateLimiter::new(
        api::RATE_LIMITED_PATHS.iter().map(|p| p.to_string()).collect(),
        rate_limit,
    );

    tracing::info!("Starting Web Server on {}", server_addr);

    let state_data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(limiter.clone())
            .configure(api::configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
