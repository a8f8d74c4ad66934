//! Fixed-window rate limiter
//!
//! Admits up to `limit` calls per window. The window opens at the first
//! call after the previous one has run out; when the quota is spent, callers
//! wait (holding the lock) for the window to close and then start a new one.
//!
//! Compared with the token bucket this lets a whole window's quota through
//! at once and then stalls for the rest of the window.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use super::RateLimiter;
use crate::error::{Error, Result};

#[derive(Debug)]
struct WindowState {
    /// Calls left in the current window
    remaining: u32,
    /// Start of the current window
    started: Instant,
}

/// `limit` calls per `window`
#[derive(Debug)]
pub struct FixedWindow {
    window: Duration,
    limit: u32,
    state: Mutex<WindowState>,
}

impl FixedWindow {
    /// Create a limiter with a fresh window starting now
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        if limit == 0 || window.is_zero() {
            return Err(Error::config("rate limiter window and limit must be positive"));
        }
        Ok(Self {
            window,
            limit,
            state: Mutex::new(WindowState {
                remaining: limit,
                started: Instant::now(),
            }),
        })
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Calls admitted per window
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Calls left in the current window, without rolling it over
    pub async fn remaining(&self) -> u32 {
        self.state.lock().await.remaining
    }

    fn roll_over(&self, state: &mut WindowState) {
        let now = Instant::now();
        if now.saturating_duration_since(state.started) >= self.window {
            state.started = now;
            state.remaining = self.limit;
        }
    }

    fn restart(&self, state: &mut WindowState) {
        state.started = Instant::now();
        state.remaining = self.limit;
    }
}

#[async_trait]
impl RateLimiter for FixedWindow {
    async fn acquire(&self) {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        if state.remaining == 0 {
            let closes = state.started + self.window;
            tracing::debug!(
                "rate limiter: window quota spent, waiting {:?}",
                closes.saturating_duration_since(Instant::now())
            );
            sleep_until(closes).await;
            self.restart(&mut state);
        }
        state.remaining -= 1;
    }

    async fn acquire_cancellable(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            guard = self.state.lock() => guard,
        };
        self.roll_over(&mut state);
        if state.remaining == 0 {
            let closes = state.started + self.window;
            tracing::debug!(
                "rate limiter: window quota spent, waiting {:?}",
                closes.saturating_duration_since(Instant::now())
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = sleep_until(closes) => {}
            }
            self.restart(&mut state);
        }
        state.remaining -= 1;
        Ok(())
    }
}
