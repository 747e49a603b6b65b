// ABOUTME: Integration tests for the multi-window rate limiter
// ABOUTME: Quota exhaustion with a manual clock, reconciliation, cancellation, and concurrent callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use fitness_providers::{
    CancellationToken, ManualClock, ProviderError, RateLimitConfig, RateLimiter, SystemClock,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn strava_without_spacing() -> RateLimitConfig {
    RateLimitConfig::strava().with_min_spacing(Duration::ZERO)
}

#[tokio::test]
async fn test_101st_call_waits_for_short_window_reset() {
    let clock = Arc::new(ManualClock::new());
    let limiter = RateLimiter::with_clock(strava_without_spacing(), clock.clone());
    let cancel = CancellationToken::new();

    for _ in 0..100 {
        limiter.acquire(&cancel).await.unwrap();
    }
    assert!(clock.sleeps().is_empty());
    assert_eq!(limiter.status().short_remaining, 0);

    limiter.acquire(&cancel).await.unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(15 * 60)]);
    assert_eq!(clock.elapsed(), Duration::from_secs(15 * 60));
    let status = limiter.status();
    assert_eq!(status.short_remaining, 99);
    assert_eq!(status.long_remaining, 1000 - 101);
}

#[tokio::test]
async fn test_partial_window_waits_only_for_remainder() {
    let clock = Arc::new(ManualClock::new());
    let limiter = RateLimiter::with_clock(strava_without_spacing(), clock.clone());
    let cancel = CancellationToken::new();

    for _ in 0..100 {
        limiter.acquire(&cancel).await.unwrap();
    }
    clock.advance(Duration::from_secs(600));
    limiter.acquire(&cancel).await.unwrap();

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(300)]);
}

#[tokio::test]
async fn test_server_usage_overrides_local_count() {
    let clock = Arc::new(ManualClock::new());
    let limiter = RateLimiter::with_clock(strava_without_spacing(), clock.clone());
    let cancel = CancellationToken::new();

    limiter.acquire(&cancel).await.unwrap();
    // Another process already spent the short window
    limiter.reconcile_from_server(100, 250);

    let status = limiter.status();
    assert_eq!(status.short_remaining, 0);
    assert_eq!(status.long_remaining, 750);

    limiter.acquire(&cancel).await.unwrap();
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(15 * 60)]);
}

#[tokio::test]
async fn test_reconcile_can_lower_local_count() {
    let clock = Arc::new(ManualClock::new());
    let limiter = RateLimiter::with_clock(strava_without_spacing(), clock.clone());
    let cancel = CancellationToken::new();

    for _ in 0..100 {
        limiter.acquire(&cancel).await.unwrap();
    }
    limiter.reconcile_from_server(10, 10);
    limiter.acquire(&cancel).await.unwrap();

    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_already_cancelled_token_fails_fast() {
    let limiter = RateLimiter::with_clock(strava_without_spacing(), Arc::new(ManualClock::new()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = limiter.acquire(&cancel).await;
    assert!(matches!(result, Err(ProviderError::Cancelled)));
    assert_eq!(limiter.status().short_remaining, 100);
}

#[tokio::test]
async fn test_cancel_interrupts_window_wait() {
    let config = RateLimitConfig {
        short_quota: 1,
        short_window: Duration::from_secs(3600),
        long_quota: 10,
        long_window: Duration::from_secs(86_400),
        min_spacing: Duration::ZERO,
    };
    let limiter = Arc::new(RateLimiter::with_clock(config, Arc::new(SystemClock)));
    let cancel = CancellationToken::new();
    limiter.acquire(&cancel).await.unwrap();

    let waiter = {
        let limiter = Arc::clone(&limiter);
        let cancel = cancel.clone();
        tokio::spawn(async move { limiter.acquire(&cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    // Status stays readable while a caller is parked in acquire
    assert_eq!(limiter.status().short_remaining, 0);
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("acquire did not observe cancellation")
        .unwrap();
    assert!(matches!(result, Err(ProviderError::Cancelled)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_never_exceed_quota() {
    let config = RateLimitConfig {
        short_quota: 5,
        short_window: Duration::from_secs(3600),
        long_quota: 100,
        long_window: Duration::from_secs(86_400),
        min_spacing: Duration::ZERO,
    };
    let limiter = Arc::new(RateLimiter::with_clock(config, Arc::new(SystemClock)));
    let cancel = CancellationToken::new();
    let granted = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            let cancel = cancel.clone();
            let granted = Arc::clone(&granted);
            tokio::spawn(async move {
                let result = limiter.acquire(&cancel).await;
                if result.is_ok() {
                    granted.fetch_add(1, Ordering::SeqCst);
                }
                result
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(granted.load(Ordering::SeqCst), 5);

    cancel.cancel();
    let mut cancelled = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), Err(ProviderError::Cancelled)) {
            cancelled += 1;
        }
    }
    assert_eq!(cancelled, 3);
    assert_eq!(limiter.status().short_remaining, 0);
}
