//! Fixed-window request ceiling keyed by client IP.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tracing::warn;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    hits: u32,
}

#[derive(Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Arc<DashMap<String, Window>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Drops every window that has fully elapsed.
    pub fn cleanup(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.opened_at) < self.window);
    }

    /// Runs `cleanup` at most once per window length.
    fn maybe_sweep(&self, now: Instant) {
        // another request is already sweeping
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last) >= self.window {
            *last = now;
            drop(last);
            self.cleanup(now);
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Counts a hit for `key`; false once the window's budget is spent.
    pub fn check(&self, key: &str, now: Instant) -> bool {
        // must not hold an entry guard while sweeping
        self.maybe_sweep(now);
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            opened_at: now,
            hits: 0,
        });
        if now.saturating_duration_since(entry.opened_at) >= self.window {
            *entry = Window {
                opened_at: now,
                hits: 0,
            };
        }
        if entry.hits >= self.max_requests {
            return false;
        }
        entry.hits += 1;
        true
    }
}

pub async fn limit_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".into());

    if !state.limiter.check(&key, Instant::now()) {
        warn!(client = %key, "rate limit exceeded");
        return ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests from this IP, please try again later",
        )
        .with_details("Request limit exceeded")
        .into_response();
    }
    next.run(req).await
}
