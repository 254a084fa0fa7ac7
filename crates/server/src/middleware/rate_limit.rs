//! Sliding-window rate limiting keyed by client IP.
//!
//! One [`RateLimiter`] instance lives in application state and every inbound
//! request passes through [`enforce`] as the outermost layer, before
//! authentication, so unauthenticated flooding is throttled too.
//!
//! Per key, the limiter keeps the timestamps of requests inside the trailing
//! window. `admit` prunes expired timestamps, rejects at the cap, and
//! records the new request - atomically per key, via the map's entry lock,
//! so two racing requests cannot both slip under the cap at the boundary.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::error::AppError;
use crate::state::AppState;

/// Admissions between lazy sweeps of stale keys.
const EVICTION_INTERVAL: u64 = 1024;

/// Sliding-window request limiter.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: DashMap<IpAddr, VecDeque<Instant>>,
    admissions: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter admitting at most `max_requests` per key in any
    /// trailing `window`.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
            admissions: AtomicU64::new(0),
        }
    }

    /// Decide whether a request from `key` at `now` is admitted.
    ///
    /// Prunes timestamps older than the window, then either rejects (at or
    /// above the cap) or records `now` and admits. Prune-check-record runs
    /// under the per-key entry lock as one unit.
    pub fn admit(&self, key: IpAddr, now: Instant) -> bool {
        // Periodically drop keys whose windows have fully drained, so the
        // map does not grow without bound across distinct clients.
        if self.admissions.fetch_add(1, Ordering::Relaxed) % EVICTION_INTERVAL == 0 {
            self.evict_stale(now);
        }

        let mut entry = self.windows.entry(key).or_default();
        let timestamps = entry.value_mut();

        while timestamps
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            timestamps.pop_front();
        }

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Remove keys with no timestamps left inside the window.
    fn evict_stale(&self, now: Instant) {
        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&t| now.duration_since(t) < self.window)
        });
    }

    /// Number of tracked keys (for tests and diagnostics).
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Middleware applying the limiter to every request.
///
/// Rejections surface as 429 with a retry-later message.
pub async fn enforce(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_ip(&req);

    if !state.rate_limiter().admit(key, Instant::now()) {
        tracing::warn!(client = %key, "request rejected by rate limiter");
        return AppError::RateExceeded.into_response();
    }

    next.run(req).await
}

/// Best-effort client IP: proxy headers first, then the socket address.
///
/// Requests with no derivable address share one bucket rather than being
/// exempted from limiting.
fn client_ip(req: &Request) -> IpAddr {
    let headers = req.headers();

    // X-Forwarded-For: first IP in the chain.
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return ip;
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return addr.ip();
    }

    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_sliding_window_cap_and_recovery() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();

        // Three requests at t=0 admit.
        assert!(limiter.admit(key(1), t0));
        assert!(limiter.admit(key(1), t0));
        assert!(limiter.admit(key(1), t0));

        // A fourth at t=1 is rejected.
        assert!(!limiter.admit(key(1), t0 + Duration::from_secs(1)));

        // A fifth at t=61 admits: the window has slid past the first burst.
        assert!(limiter.admit(key(1), t0 + Duration::from_secs(61)));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(limiter.admit(key(1), t0));
        assert!(!limiter.admit(key(1), t0));
        assert!(limiter.admit(key(2), t0));
    }

    #[test]
    fn test_rejected_request_is_not_recorded() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(limiter.admit(key(1), t0));
        assert!(limiter.admit(key(1), t0));
        // Rejections at t=5 must not extend the window.
        assert!(!limiter.admit(key(1), t0 + Duration::from_secs(5)));
        assert!(!limiter.admit(key(1), t0 + Duration::from_secs(5)));
        // At t=10 the two admitted requests have expired.
        assert!(limiter.admit(key(1), t0 + Duration::from_secs(10)));
    }

    #[test]
    fn test_stale_keys_are_evicted() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        let t0 = Instant::now();

        for last in 1..=8 {
            assert!(limiter.admit(key(last), t0));
        }
        assert_eq!(limiter.tracked_keys(), 8);

        limiter.evict_stale(t0 + Duration::from_secs(2));
        assert_eq!(limiter.tracked_keys(), 0);
    }
}
