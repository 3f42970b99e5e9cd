//! Fixed-window rate limiting middleware.
//!
//! A deliberately simple policy for login brute-force deterrence: per-client
//! counters in a fixed window, reset lazily on the first request after the
//! window expires. The burst-at-window-boundary weakness of fixed windows is
//! an accepted tradeoff. Counters live in process memory, so multi-instance
//! deployments need a shared store in front of this.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_rate_limited;

/// Fraction of checks that trigger a sweep of expired client entries.
const SWEEP_PROBABILITY: f64 = 0.01;

struct Window {
    count: u32,
    reset_at: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { limit: u32, remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Fixed-window request counter keyed by client identity.
///
/// One constructor, two instances: a strict limiter for auth endpoints and
/// a lenient one for general API traffic.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    message: String,
    clients: RwLock<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, message: impl Into<String>) -> Self {
        Self {
            max_requests,
            window,
            message: message.into(),
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Message returned to clients that exceed the limit.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Counts a request from `client` against the current window.
    pub fn check(&self, client: &str) -> RateDecision {
        let now = Instant::now();
        let mut clients = self.clients.write().expect("rate limiter lock poisoned");

        // Opportunistic garbage collection of expired entries. Entries for
        // clients that never return can linger until a sweep happens to run.
        if rand::random::<f64>() < SWEEP_PROBABILITY {
            clients.retain(|_, w| now < w.reset_at);
        }

        let window = clients.entry(client.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        // Lazy reset on the first request after expiry
        if now >= window.reset_at {
            window.count = 0;
            window.reset_at = now + self.window;
        }

        window.count += 1;

        if window.count > self.max_requests {
            let retry_after_secs = window
                .reset_at
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            RateDecision::Limited { retry_after_secs }
        } else {
            RateDecision::Allowed {
                limit: self.max_requests,
                remaining: self.max_requests - window.count,
            }
        }
    }
}

/// Strict limiter for credential-handling endpoints.
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state.auth_limiter, "auth", req, next).await
}

/// Lenient limiter for the general API surface.
pub async fn api_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state.api_limiter, "api", req, next).await
}

async fn enforce(
    limiter: &RateLimiter,
    scope: &'static str,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_ip(&req);

    match limiter.check(&client) {
        RateDecision::Limited { retry_after_secs } => {
            record_rate_limited(scope);
            tracing::warn!(
                client = %client,
                scope = scope,
                retry_after_secs = retry_after_secs,
                "Rate limit exceeded"
            );

            let mut response = ApiError::RateLimited {
                retry_after_secs,
                message: limiter.message().to_string(),
            }
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        RateDecision::Allowed { limit, remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert(HeaderName::from_static("x-ratelimit-limit"), value);
            }
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert(HeaderName::from_static("x-ratelimit-remaining"), value);
            }
            response
        }
    }
}

/// Resolves the client identity: forwarded headers first (the service is
/// expected to sit behind a proxy), then the socket peer address.
fn client_ip(req: &Request<Body>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn limiter(max: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(
            max,
            Duration::from_millis(window_ms),
            "Too many requests, please try again later.",
        )
    }

    #[test]
    fn test_limit_boundary() {
        let limiter = limiter(5, 60_000);

        for i in 1..=5 {
            match limiter.check("10.0.0.1") {
                RateDecision::Allowed { limit, remaining } => {
                    assert_eq!(limit, 5);
                    assert_eq!(remaining, 5 - i);
                }
                RateDecision::Limited { .. } => panic!("request {} should be allowed", i),
            }
        }

        match limiter.check("10.0.0.1") {
            RateDecision::Limited { retry_after_secs } => {
                assert!(retry_after_secs >= 1);
                assert!(retry_after_secs <= 60);
            }
            RateDecision::Allowed { .. } => panic!("6th request should be limited"),
        }
    }

    #[test]
    fn test_window_resets_lazily() {
        let limiter = limiter(2, 50);

        limiter.check("10.0.0.1");
        limiter.check("10.0.0.1");
        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateDecision::Limited { .. }
        ));

        sleep(Duration::from_millis(60));

        // First request after expiry starts a fresh window
        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateDecision::Allowed { remaining: 1, .. }
        ));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60_000);

        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateDecision::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("10.0.0.1"),
            RateDecision::Limited { .. }
        ));
        assert!(matches!(
            limiter.check("10.0.0.2"),
            RateDecision::Allowed { .. }
        ));
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let limiter = limiter(1, 100);
        limiter.check("10.0.0.1");
        match limiter.check("10.0.0.1") {
            RateDecision::Limited { retry_after_secs } => assert_eq!(retry_after_secs, 1),
            RateDecision::Allowed { .. } => panic!("should be limited"),
        }
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "198.51.100.2");
    }

    #[test]
    fn test_client_ip_unknown_without_peer() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), "unknown");
    }
}
