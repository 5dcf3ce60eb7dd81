// web-server/src/middleware/rate_limiter.rs
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{header, StatusCode},
    Error, HttpResponse, ResponseError,
};
use common::ErrorResponse;
use dashmap::DashMap;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use thiserror::Error;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
#[error("rate limit exceeded")]
struct RateLimitExceeded;

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, RATE_LIMIT_WINDOW.as_secs().to_string()))
            .json(ErrorResponse {
                error: "Rate limit exceeded. Please try again later.".to_string(),
                kind: "RateLimited".to_string(),
            })
    }
}

/// Sliding one-minute window per client IP over a set of path prefixes.
///
/// Clients are keyed by the socket peer address. Forwarded headers are
/// client-controlled and never consulted.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Arc<Vec<String>>,
    max_per_window: usize,
    hits: Arc<DashMap<String, Vec<Instant>>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_per_minute: usize) -> Self {
        Self {
            paths: Arc::new(paths),
            max_per_window: max_per_minute,
            hits: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn applies_to(&self, path: &str) -> bool {
        self.paths.iter().any(|p| path.starts_with(p.as_str()))
    }

    fn client_ip(req: &ServiceRequest) -> String {
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        let now = Instant::now();
        let limited = {
            let mut entry = self.hits.entry(ip.to_string()).or_default();

            entry.retain(|time| now.duration_since(*time) < RATE_LIMIT_WINDOW);
            if entry.len() >= self.max_per_window {
                true
            } else {
                entry.push(now);
                false
            }
        };

        // entry guard must be dropped before sweeping the whole map
        self.sweep_if_due(now);
        limited
    }

    fn sweep_if_due(&self, now: Instant) {
        let due = match self.last_sweep.lock() {
            Ok(mut last) if now.duration_since(*last) >= RATE_LIMIT_WINDOW => {
                *last = now;
                true
            }
            _ => false,
        };
        if due {
            self.purge_stale(now);
        }
    }

    /// Drop clients with no hits left inside the window
    fn purge_stale(&self, now: Instant) {
        self.hits.retain(|_, times| {
            times.retain(|time| now.duration_since(*time) < RATE_LIMIT_WINDOW);
            !times.is_empty()
        });
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.limiter.applies_to(req.path()) {
            let ip = RateLimiter::client_ip(&req);

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP {} on {}", ip, req.path());
                return Box::pin(async { Err(RateLimitExceeded.into()) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, try_call_service, TestRequest};
    use actix_web::{web, App};
    use std::net::SocketAddr;

    #[test]
    fn test_window_counts_per_ip() {
        let limiter = RateLimiter::new(vec!["/limited".to_string()], 2);

        assert!(!limiter.is_rate_limited("1.1.1.1"));
        assert!(!limiter.is_rate_limited("1.1.1.1"));
        assert!(limiter.is_rate_limited("1.1.1.1"));
        assert!(!limiter.is_rate_limited("2.2.2.2"));
    }

    #[actix_web::test]
    async fn test_only_configured_paths_limited() {
        let app = init_service(
            App::new()
                .wrap(RateLimiter::new(vec!["/limited".to_string()], 1))
                .route("/limited", web::get().to(HttpResponse::Ok))
                .route("/open", web::get().to(HttpResponse::Ok)),
        )
        .await;

        for _ in 0..3 {
            let resp = call_service(&app, TestRequest::get().uri("/open").to_request()).await;
            assert!(resp.status().is_success());
        }

        let first = call_service(&app, TestRequest::get().uri("/limited").to_request()).await;
        assert!(first.status().is_success());

        let second = try_call_service(&app, TestRequest::get().uri("/limited").to_request()).await;
        let err = second.err().expect("second request should be limited");
        assert_eq!(err.as_response_error().status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_forwarded_headers_do_not_change_client() {
        let limiter = RateLimiter::new(vec!["/limited".to_string()], 1);
        let app = init_service(
            App::new()
                .wrap(limiter.clone())
                .route("/limited", web::get().to(HttpResponse::Ok)),
        )
        .await;
        let peer: SocketAddr = "10.0.0.1:40000".parse().unwrap();

        let mut successes = 0;
        for i in 0..20 {
            let req = TestRequest::get()
                .uri("/limited")
                .peer_addr(peer)
                .insert_header(("x-forwarded-for", format!("203.0.113.{}", i)))
                .insert_header(("forwarded", format!("for=198.51.100.{}", i)))
                .to_request();
            if try_call_service(&app, req).await.is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(limiter.hits.len(), 1);

        // a different socket is a different client
        let other: SocketAddr = "10.0.0.2:40000".parse().unwrap();
        let resp = call_service(&app, TestRequest::get().uri("/limited").peer_addr(other).to_request()).await;
        assert!(resp.status().is_success());
    }

    #[test]
    fn test_stale_clients_purged() {
        let limiter = RateLimiter::new(vec!["/limited".to_string()], 5);
        for i in 0..10 {
            assert!(!limiter.is_rate_limited(&format!("10.0.1.{}", i)));
        }
        assert_eq!(limiter.hits.len(), 10);

        limiter.purge_stale(Instant::now());
        assert_eq!(limiter.hits.len(), 10);

        limiter.purge_stale(Instant::now() + RATE_LIMIT_WINDOW);
        assert!(limiter.hits.is_empty());
    }
}
