// ABOUTME: Two-window request quota with minimum spacing for outbound provider calls
// ABOUTME: Cancellation-aware acquire, server usage reconciliation, and lock-free status snapshots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiter
//!
//! Every outbound call passes through [`RateLimiter::acquire`]. The limiter
//! tracks a short window (100 requests per 15 minutes for Strava) and a long
//! window (1000 per day), each reset once its window has elapsed, plus a
//! minimum spacing between any two permitted calls.
//!
//! Both counters and the last-call timestamp live in one mutex-guarded state
//! so the quota check and the increment happen as a single critical section.
//! The lock is released before any wait. [`RateLimiter::status`] reads atomic
//! snapshots and never touches that mutex.
//!
//! Time comes from an injectable [`Clock`], which lets tests drive window
//! resets with [`ManualClock`] instead of real sleeps.

use async_trait::async_trait;
use fitness_core::constants::api_provider_limits::strava;
use fitness_core::errors::provider::{ProviderError, ProviderResult};
use fitness_core::CancellationToken;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of monotonic time and sleeping for the limiter
#[async_trait]
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test clock whose `sleep` advances time instantly
///
/// Every requested sleep is recorded so tests can assert how long the
/// limiter would have blocked.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    inner: Mutex<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Clock frozen at the current instant
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            inner: Mutex::new(ManualClockState::default()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.elapsed += duration;
    }

    /// Total time elapsed since construction
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed
    }

    /// Sleeps requested so far, in order
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sleeps
            .clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

/// Quota configuration for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per short window
    pub short_quota: u32,
    /// Short window length
    pub short_window: Duration,
    /// Requests allowed per long window
    pub long_quota: u32,
    /// Long window length
    pub long_window: Duration,
    /// Minimum gap between two permitted calls
    pub min_spacing: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::strava()
    }
}

impl RateLimitConfig {
    /// Strava's published application limits
    #[must_use]
    pub const fn strava() -> Self {
        Self {
            short_quota: strava::RATE_LIMIT_15MIN,
            short_window: Duration::from_secs(strava::RATE_LIMIT_15MIN_WINDOW_SECS),
            long_quota: strava::RATE_LIMIT_DAILY,
            long_window: Duration::from_secs(strava::RATE_LIMIT_DAILY_WINDOW_SECS),
            min_spacing: Duration::from_millis(strava::MIN_REQUEST_SPACING_MS),
        }
    }

    /// Same quotas with a different minimum spacing
    #[must_use]
    pub const fn with_min_spacing(mut self, min_spacing: Duration) -> Self {
        self.min_spacing = min_spacing;
        self
    }
}

/// Remaining quota as of the last acquire or reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Calls left in the short window
    pub short_remaining: u32,
    /// Short window quota
    pub short_quota: u32,
    /// Calls left in the long window
    pub long_remaining: u32,
    /// Long window quota
    pub long_quota: u32,
}

#[derive(Debug)]
struct Window {
    quota: u32,
    length: Duration,
    used: u32,
    started_at: Instant,
}

impl Window {
    const fn new(quota: u32, length: Duration, now: Instant) -> Self {
        Self {
            quota,
            length,
            used: 0,
            started_at: now,
        }
    }

    fn roll(&mut self, now: Instant) {
        if now.saturating_duration_since(self.started_at) >= self.length {
            self.used = 0;
            self.started_at = now;
        }
    }

    const fn exhausted(&self) -> bool {
        self.used >= self.quota
    }

    fn until_reset(&self, now: Instant) -> Duration {
        (self.started_at + self.length).saturating_duration_since(now)
    }
}

#[derive(Debug)]
struct LimiterState {
    short: Window,
    long: Window,
    last_call: Option<Instant>,
}

/// Shared limiter for one provider application
///
/// Cheap to share behind an `Arc`; every task issuing requests for the same
/// credentials must use the same instance.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
    short_used: AtomicU32,
    long_used: AtomicU32,
}

impl RateLimiter {
    /// Limiter driven by the system clock
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Limiter driven by the given clock
    #[must_use]
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            state: Mutex::new(LimiterState {
                short: Window::new(config.short_quota, config.short_window, now),
                long: Window::new(config.long_quota, config.long_window, now),
                last_call: None,
            }),
            config,
            clock,
            short_used: AtomicU32::new(0),
            long_used: AtomicU32::new(0),
        }
    }

    /// Configured quotas
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until a call is permitted, then count it
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if `cancel` fires before or while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> ProviderResult<()> {
        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            let Some(wait) = self.try_acquire() else {
                return Ok(());
            };

            debug!(wait_ms = wait.as_millis(), "rate limiter waiting");
            tokio::select! {
                () = cancel.cancelled() => return Err(ProviderError::Cancelled),
                () = self.clock.sleep(wait) => {}
            }
        }
    }

    /// Check quota and spacing; count the call when permitted, otherwise return the wait
    fn try_acquire(&self) -> Option<Duration> {
        let mut state = self.lock_state();
        let now = self.clock.now();
        state.short.roll(now);
        state.long.roll(now);

        let spacing_wait = state.last_call.map_or(Duration::ZERO, |last| {
            (last + self.config.min_spacing).saturating_duration_since(now)
        });
        let short_wait = if state.short.exhausted() {
            state.short.until_reset(now)
        } else {
            Duration::ZERO
        };
        let long_wait = if state.long.exhausted() {
            state.long.until_reset(now)
        } else {
            Duration::ZERO
        };

        let wait = spacing_wait.max(short_wait).max(long_wait);
        if !wait.is_zero() {
            return Some(wait);
        }

        state.short.used += 1;
        state.long.used += 1;
        state.last_call = Some(now);
        self.publish(&state);
        None
    }

    /// Replace local counters with provider-reported usage
    ///
    /// The provider's numbers are authoritative: they include calls made by
    /// other processes sharing the same application credentials.
    pub fn reconcile_from_server(&self, used_short: u32, used_daily: u32) {
        let mut state = self.lock_state();
        let now = self.clock.now();
        state.short.roll(now);
        state.long.roll(now);
        if state.short.used != used_short || state.long.used != used_daily {
            debug!(
                local_short = state.short.used,
                local_daily = state.long.used,
                used_short,
                used_daily,
                "reconciling rate limiter with provider usage"
            );
        }
        state.short.used = used_short;
        state.long.used = used_daily;
        self.publish(&state);
    }

    /// Remaining quota snapshot; never blocks on the acquire path
    #[must_use]
    pub fn status(&self) -> RateLimitStatus {
        let short_used = self.short_used.load(Ordering::Acquire);
        let long_used = self.long_used.load(Ordering::Acquire);
        RateLimitStatus {
            short_remaining: self.config.short_quota.saturating_sub(short_used),
            short_quota: self.config.short_quota,
            long_remaining: self.config.long_quota.saturating_sub(long_used),
            long_quota: self.config.long_quota,
        }
    }

    fn publish(&self, state: &LimiterState) {
        self.short_used.store(state.short.used, Ordering::Release);
        self.long_used.store(state.long.used, Ordering::Release);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tiny_config() -> RateLimitConfig {
        RateLimitConfig {
            short_quota: 2,
            short_window: Duration::from_secs(60),
            long_quota: 3,
            long_window: Duration::from_secs(600),
            min_spacing: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_spacing_is_enforced_between_calls() {
        let clock = Arc::new(ManualClock::new());
        let config = tiny_config().with_min_spacing(Duration::from_millis(250));
        let limiter = RateLimiter::with_clock(config, clock.clone());
        let cancel = CancellationToken::new();

        limiter.acquire(&cancel).await.unwrap();
        limiter.acquire(&cancel).await.unwrap();
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
    }

    #[tokio::test]
    async fn test_long_window_blocks_after_short_resets() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(tiny_config(), clock.clone());
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            limiter.acquire(&cancel).await.unwrap();
        }
        // Third call waited for the short window; the fourth waits for the day window
        limiter.acquire(&cancel).await.unwrap();
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(60), Duration::from_secs(540)]
        );
    }

    #[test]
    fn test_status_reflects_reconciled_usage() {
        let limiter = RateLimiter::with_clock(tiny_config(), Arc::new(ManualClock::new()));
        limiter.reconcile_from_server(1, 2);
        let status = limiter.status();
        assert_eq!(status.short_remaining, 1);
        assert_eq!(status.long_remaining, 1);
    }
}
