// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory fixed-window rate limiter keyed by user id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rolechat_config::model::RateLimitConfig;
use rolechat_core::{RateDecision, RateLimiter, RolechatError};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Expired windows are swept once every this many decisions.
const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    used: u32,
}

/// Allows `max_turns` turns per user per `window`.
///
/// State lives only in this process; a restart resets every window.
/// Users whose window has expired are forgotten on the next sweep.
#[derive(Debug)]
pub struct FixedWindowRateLimiter {
    max_turns: u32,
    window: Duration,
    enabled: bool,
    windows: DashMap<i64, Window>,
    decisions: AtomicU64,
}

impl FixedWindowRateLimiter {
    pub fn new(max_turns: u32, window: Duration) -> Self {
        Self {
            max_turns,
            window,
            enabled: true,
            windows: DashMap::new(),
            decisions: AtomicU64::new(0),
        }
    }

    /// A limiter that allows everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(u32::MAX, Duration::from_secs(1))
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        if config.enabled {
            Self::new(config.max_turns, Duration::from_secs(config.window_secs))
        } else {
            Self::disabled()
        }
    }

    fn decide(&self, user_id: i64, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::Allow;
        }

        // Must run before `entry` takes a shard lock.
        if (self.decisions.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0 {
            self.evict_expired(now);
        }

        let mut entry = self.windows.entry(user_id).or_insert(Window {
            started: now,
            used: 0,
        });
        let window = entry.value_mut();

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.used = 0;
        }

        if window.used < self.max_turns {
            window.used += 1;
            RateDecision::Allow
        } else {
            let retry_after = self.window.saturating_sub(now.duration_since(window.started));
            debug!(user_id, retry_after_ms = retry_after.as_millis() as u64, "rate limit hit");
            RateDecision::Deny { retry_after }
        }
    }

    fn evict_expired(&self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, w| now.duration_since(w.started) < self.window);
        let evicted = before.saturating_sub(self.windows.len());
        trace!(evicted, "rate limit windows swept");
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn acquire(&self, user_id: i64) -> Result<RateDecision, RolechatError> {
        Ok(self.decide(user_id, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn denies_after_budget_and_resets_with_window() {
        let limiter = FixedWindowRateLimiter::new(2, Duration::from_secs(60));
        assert_eq!(limiter.acquire(1).await.unwrap(), RateDecision::Allow);
        assert_eq!(limiter.acquire(1).await.unwrap(), RateDecision::Allow);
        match limiter.acquire(1).await.unwrap() {
            RateDecision::Deny { retry_after } => assert_eq!(retry_after, Duration::from_secs(60)),
            RateDecision::Allow => panic!("third turn should be denied"),
        }

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.acquire(1).await.unwrap(), RateDecision::Allow);
    }

    #[tokio::test]
    async fn users_have_separate_windows() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.acquire(1).await.unwrap(), RateDecision::Allow);
        assert_eq!(limiter.acquire(2).await.unwrap(), RateDecision::Allow);
        assert!(matches!(
            limiter.acquire(1).await.unwrap(),
            RateDecision::Deny { .. }
        ));
    }

    #[tokio::test]
    async fn disabled_allows_everything() {
        let limiter = FixedWindowRateLimiter::from_config(&RateLimitConfig {
            enabled: false,
            ..Default::default()
        });
        for _ in 0..100 {
            assert_eq!(limiter.acquire(1).await.unwrap(), RateDecision::Allow);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expired_windows_are_evicted() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        for user in 0..10 {
            limiter.acquire(user).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.acquire(100).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        limiter.evict_expired(Instant::now());
        assert_eq!(limiter.windows.len(), 1);
        assert!(limiter.windows.contains_key(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn cycling_user_ids_does_not_grow_without_bound() {
        let limiter = FixedWindowRateLimiter::new(1, Duration::from_secs(60));
        for user in 0..100 {
            limiter.acquire(user).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(61)).await;

        // Decision 256 sweeps the first batch.
        for user in 1000..1256 {
            limiter.acquire(user).await.unwrap();
        }
        assert_eq!(limiter.windows.len(), 256);
        assert!(!limiter.windows.contains_key(&0));
    }
}
