// web-server/src/session_janitor.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, ResponseFuture};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionManager;

/// Actor message: remove expired sessions now, returning how many were removed
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredSessions;

/// Periodically purges expired session rows so the store does not grow unbounded
pub struct SessionJanitor {
    sessions: Arc<SessionManager>,
    cleanup_interval: Duration,
}

impl SessionJanitor {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            cleanup_interval: Duration::from_secs(3600),
        }
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = Duration::from_secs(interval_seconds);
        self
    }
}

async fn run_cleanup(sessions: Arc<SessionManager>) -> usize {
    match sessions.cleanup_expired_sessions().await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!("Cleaned up {} expired sessions", removed);
            }
            removed
        }
        Err(e) => {
            tracing::error!("Session cleanup failed: {}", e);
            0
        }
    }
}

impl Actor for SessionJanitor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "SessionJanitor started, cleaning every {}s",
            self.cleanup_interval.as_secs()
        );

        ctx.run_interval(self.cleanup_interval, |act, _ctx| {
            actix::spawn(run_cleanup(act.sessions.clone()));
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("SessionJanitor stopped");
    }
}

impl Handler<CleanupExpiredSessions> for SessionJanitor {
    type Result = ResponseFuture<usize>;

    fn handle(&mut self, _msg: CleanupExpiredSessions, _ctx: &mut Self::Context) -> Self::Result {
        Box::pin(run_cleanup(self.sessions.clone()))
    }
}
