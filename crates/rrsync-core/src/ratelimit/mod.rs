// # Token bucket rate limiter
//
// Gates every outbound call to a record store. The bucket holds up to
// `burst` tokens and earns one per `period`; each admitted call spends one.
//
// ## Acquire
//
// - bucket not empty: spend a token, return immediately
// - bucket empty: credit the tokens earned since the refill reference time
//   (at most `burst`) and spend one if any were earned
// - still empty: wait until the next token is due, holding the lock, and
//   hand that token straight to the caller
//
// Holding the lock across the wait serializes admission under contention:
// waiters are released one period apart, in lock order.
//
// ## Cancellation
//
// `acquire_cancellable` gives up on cancellation while waiting for either the
// lock or the next token. A cancelled wait leaves the bucket untouched: no
// token is spent and the refill reference does not move.
//
// Time is read from `tokio::time`, so tests can run on a paused clock.
//
// `FixedWindow` is the alternative: a fixed number of calls per window,
// matching how the registrar counts its quota.

mod window;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

pub use window::FixedWindow;

/// Admission control for outbound store calls
///
/// One limiter is shared by everything talking to the same endpoint.
#[async_trait]
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    /// Wait until a call may be issued
    async fn acquire(&self);

    /// Wait until a call may be issued, giving up on cancellation
    ///
    /// A cancelled wait must not consume capacity.
    async fn acquire_cancellable(&self, cancel: &CancellationToken) -> Result<()>;
}

#[derive(Debug)]
struct BucketState {
    /// Tokens currently available (0..=burst)
    tokens: u32,
    /// Instant up to which earned tokens have been credited
    refill_ref: Instant,
}

/// Token bucket shared by all callers of one remote endpoint
///
/// Construct it once and hand an `Arc<TokenBucket>` to everything that
/// talks to the same endpoint.
#[derive(Debug)]
pub struct TokenBucket {
    /// Interval between tokens
    period: Duration,
    /// Bucket size; 1 means no bursts
    burst: u32,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket of `burst` tokens earning one token per `period`
    pub fn new(burst: u32, period: Duration) -> Result<Self> {
        if burst == 0 || period.is_zero() {
            return Err(Error::config("rate limiter burst and period must be positive"));
        }
        Ok(Self {
            period,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                refill_ref: Instant::now(),
            }),
        })
    }

    /// Create a bucket earning `rate` tokens per second
    pub fn per_second(rate: u32, burst: u32) -> Result<Self> {
        if rate == 0 {
            return Err(Error::config("rate limiter rate must be positive"));
        }
        Self::new(burst, Duration::from_secs(1) / rate)
    }

    /// Interval between tokens
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Bucket size
    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Tokens currently in the bucket, without crediting earned ones
    pub async fn available(&self) -> u32 {
        self.state.lock().await.tokens
    }

    /// Wait until a call may be issued
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        if self.take(&mut state) {
            return;
        }

        let wait_until = state.refill_ref + self.period;
        tracing::debug!(
            "rate limiter: bucket empty, waiting {:?}",
            wait_until.saturating_duration_since(Instant::now())
        );
        sleep_until(wait_until).await;
        state.refill_ref = wait_until;
    }

    /// Wait until a call may be issued, giving up on cancellation
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires (or has already fired)
    /// before a token is obtained.
    pub async fn acquire_cancellable(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            guard = self.state.lock() => guard,
        };
        if self.take(&mut state) {
            return Ok(());
        }

        let wait_until = state.refill_ref + self.period;
        tracing::debug!(
            "rate limiter: bucket empty, waiting {:?}",
            wait_until.saturating_duration_since(Instant::now())
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = sleep_until(wait_until) => {}
        }
        state.refill_ref = wait_until;
        Ok(())
    }

    /// Credit earned tokens if the bucket is empty, then try to spend one
    fn take(&self, state: &mut BucketState) -> bool {
        if state.tokens == 0 {
            let now = Instant::now();
            let elapsed = now.saturating_duration_since(state.refill_ref);
            let period = self.period.as_nanos();
            let earned = elapsed.as_nanos() / period;
            if earned > 0 {
                // bounded by burst
                state.tokens = earned.min(u128::from(self.burst)) as u32;
                // the reference moves by every elapsed period, credited or not
                let leftover = elapsed.as_nanos() % period;
                state.refill_ref = now - Duration::from_nanos(leftover as u64);
            }
        }
        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        TokenBucket::acquire(self).await
    }

    async fn acquire_cancellable(&self, cancel: &CancellationToken) -> Result<()> {
        TokenBucket::acquire_cancellable(self, cancel).await
    }
}
