//! Per-key token-bucket rate limiting for the sensitive account routes.
//!
//! Each key (the client IP) owns its own bucket behind its own mutex. The
//! outer `DashMap` is only touched to find or lazily create that bucket, so
//! unrelated clients never wait on each other's critical section.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::{
    clock::{Clock, SystemClock},
    error::ApiError,
};

/// Static bucket parameters for one protected route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub capacity: u32,
    /// Tokens added per `interval`.
    pub refill: u32,
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill: 5,
            interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Refills from elapsed time, then deducts `cost` if the bucket can cover it.
    /// `tokens` stays within `[0, capacity]` on every path.
    fn try_take(&mut self, cost: f64, config: &RateLimitConfig, now: Instant) -> bool {
        let capacity = f64::from(config.capacity);
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        let refilled = elapsed * f64::from(config.refill) / config.interval.as_secs_f64();

        self.tokens = (self.tokens + refilled).min(capacity);
        self.last_refill = now;

        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }
}

/// Token-bucket limiter keyed by an arbitrary string.
///
/// Constructed explicitly and injected through `AppState`. There is no global
/// bucket map.
pub struct RateLimiter<C: Clock = SystemClock> {
    config: RateLimitConfig,
    buckets: DashMap<String, Arc<Mutex<Bucket>>>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Attempts to take `cost` tokens from `key`'s bucket.
    ///
    /// An unseen key starts with a full bucket. A denied attempt leaves the
    /// token count as refilled, never lower.
    pub fn try_consume(&self, key: &str, cost: u32) -> bool {
        let bucket = self.bucket_for(key);
        // The per-key lock covers refill and deduction together, so concurrent
        // callers on the same key cannot both observe the same refill.
        let mut bucket = bucket.lock().unwrap_or_else(|e| e.into_inner());
        bucket.try_take(f64::from(cost), &self.config, self.clock.now())
    }

    /// Tokens currently available to `key`, without refilling. Unseen keys report full capacity.
    pub fn available(&self, key: &str) -> f64 {
        match self.buckets.get(key) {
            Some(bucket) => bucket.lock().unwrap_or_else(|e| e.into_inner()).tokens,
            None => f64::from(self.config.capacity),
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_for(&self, key: &str) -> Arc<Mutex<Bucket>> {
        if let Some(existing) = self.buckets.get(key) {
            return Arc::clone(existing.value());
        }
        let capacity = f64::from(self.config.capacity);
        let now = self.clock.now();
        // The shard guard from `entry` is released at the end of this statement,
        // before the caller takes the bucket's own lock.
        Arc::clone(
            self.buckets
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Bucket::full(capacity, now))))
                .value(),
        )
    }
}

/// RateLimiters
///
/// One limiter per protected route. Cloned cheaply into the middleware state.
#[derive(Clone)]
pub struct RateLimiters {
    pub login: Arc<RateLimiter>,
    pub register: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn new(login: RateLimitConfig, register: RateLimitConfig) -> Self {
        Self {
            login: Arc::new(RateLimiter::new(login)),
            register: Arc::new(RateLimiter::new(register)),
        }
    }

    /// Returns the limiter guarding `method path`, if that route is rate limited.
    pub fn for_route(&self, method: &Method, path: &str) -> Option<&RateLimiter> {
        if *method != Method::POST {
            return None;
        }
        match path.trim_end_matches('/') {
            "/auth/login" => Some(self.login.as_ref()),
            "/auth/register" => Some(self.register.as_ref()),
            _ => None,
        }
    }
}

/// Client identity used as the bucket key.
///
/// Keyed by peer IP only. Clients sharing a NAT or proxy share a bucket; this
/// is accepted rather than worked around with spoofable forwarding headers.
pub fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// rate_limit_middleware
///
/// First gate of the request chain. Only the routes returned by
/// [`RateLimiters::for_route`] are metered; everything else passes untouched.
/// A denial is a 429 and nothing downstream runs.
pub async fn rate_limit_middleware(
    State(limiters): State<RateLimiters>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = limiters.for_route(request.method(), request.uri().path()) {
        let key = client_key(&request);
        if !limiter.try_consume(&key, 1) {
            tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            return ApiError::RateLimited.into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;

    fn limiter() -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        (
            RateLimiter::with_clock(RateLimitConfig::default(), clock.clone()),
            clock,
        )
    }

    #[test]
    fn five_immediate_calls_pass_then_sixth_fails() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.try_consume("10.0.0.1", 1));
        }
        clock.advance(Duration::from_millis(500));
        assert!(!limiter.try_consume("10.0.0.1", 1));
    }

    #[test]
    fn bucket_refills_after_interval() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.try_consume("10.0.0.1", 1));
        }
        assert!(!limiter.try_consume("10.0.0.1", 1));

        clock.advance(Duration::from_secs(60));
        assert!(limiter.try_consume("10.0.0.1", 1));
        // Refill is capped at capacity: four more, then empty again.
        for _ in 0..4 {
            assert!(limiter.try_consume("10.0.0.1", 1));
        }
        assert!(!limiter.try_consume("10.0.0.1", 1));
    }

    #[test]
    fn partial_refill_is_proportional() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.try_consume("k", 1));
        }
        // 5 tokens per 60s means one token every 12s.
        clock.advance(Duration::from_secs(11));
        assert!(!limiter.try_consume("k", 1));
        clock.advance(Duration::from_secs(2));
        assert!(limiter.try_consume("k", 1));
    }

    #[test]
    fn long_idle_never_overfills() {
        let (limiter, clock) = limiter();
        assert!(limiter.try_consume("k", 1));
        clock.advance(Duration::from_secs(3600));
        assert!(limiter.try_consume("k", 1));
        assert!(limiter.available("k") <= 5.0);
        assert_eq!(limiter.available("k"), 4.0);
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter();
        for _ in 0..5 {
            assert!(limiter.try_consume("a", 1));
        }
        assert!(!limiter.try_consume("a", 1));
        assert!(limiter.try_consume("b", 1));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn denied_cost_does_not_mutate_tokens() {
        let (limiter, _clock) = limiter();
        assert!(limiter.try_consume("k", 3));
        assert!(!limiter.try_consume("k", 3));
        assert_eq!(limiter.available("k"), 2.0);
        assert!(!limiter.try_consume("k", 6));
        assert_eq!(limiter.available("k"), 2.0);
    }

    #[test]
    fn concurrent_consumers_never_exceed_capacity() {
        let limiter = Arc::new(RateLimiter::with_clock(
            RateLimitConfig::default(),
            ManualClock::default(),
        ));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || limiter.try_consume("shared", 1))
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 5);
        assert_eq!(limiter.available("shared"), 0.0);
    }

    #[test]
    fn only_account_routes_are_metered() {
        let limiters = RateLimiters::new(RateLimitConfig::default(), RateLimitConfig::default());
        assert!(limiters.for_route(&Method::POST, "/auth/login").is_some());
        assert!(limiters.for_route(&Method::POST, "/auth/register/").is_some());
        assert!(limiters.for_route(&Method::GET, "/auth/login").is_none());
        assert!(limiters.for_route(&Method::POST, "/posts").is_none());
    }
}
