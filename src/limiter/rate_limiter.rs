//! Permit-based rate limiter
//!
//! Every outbound call acquires one permit first. A permit is held for a
//! fixed delay after it is granted and then released by a timer task, so
//! the number of calls started inside any window is bounded by the
//! limiter's capacity.

use crate::config::RateLimitConfig;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Meters call admission to a fixed rate
///
/// Two modes are supported:
///
/// | Mode | Capacity | Release delay | Cadence |
/// |------|----------|---------------|---------|
/// | Uniform | 1 | `time_unit / rps` | evenly spaced |
/// | Burst | `rps` | `time_unit` | burst, then wait |
///
/// Admission is FIFO: the underlying tokio semaphore queues waiters fairly.
#[derive(Debug)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    release_delay: Duration,
    next_caller: AtomicU64,
    waiting: AtomicUsize,
}

impl RateLimiter {
    /// Creates a limiter from the rate limit configuration
    ///
    /// An `rps` of zero is treated as one.
    pub fn new(config: &RateLimitConfig) -> Self {
        let rps = config.rps.max(1);
        let time_unit = Duration::from_millis(config.time_unit_ms);

        let (capacity, release_delay) = if config.uniform_distribution {
            (1, time_unit / rps)
        } else {
            (rps as usize, time_unit)
        };

        tracing::debug!(
            "Rate limiter: capacity {}, release delay {:?} (uniform: {})",
            capacity,
            release_delay,
            config.uniform_distribution
        );

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            release_delay,
            next_caller: AtomicU64::new(0),
            waiting: AtomicUsize::new(0),
        }
    }

    /// Suspends until a permit is available, then returns
    ///
    /// The permit is released automatically once the release delay has
    /// elapsed. This never fails and has no timeout.
    pub async fn acquire(&self) {
        let caller = self.next_caller.fetch_add(1, Ordering::Relaxed);
        let guard = WaitingGuard::enter(&self.waiting);
        tracing::trace!(
            "[Caller {}] About to acquire permit. Number waiting: {}",
            caller,
            guard.count_at_entry
        );

        let acquired = self.semaphore.clone().acquire_owned().await;
        drop(guard);
        let waiting = self.waiting.load(Ordering::Relaxed);

        // The semaphore is never closed while the limiter is alive
        let Ok(permit) = acquired else {
            tracing::warn!("[Caller {}] Rate limiter closed, admitting without a permit", caller);
            return;
        };

        tracing::trace!(
            "[Caller {}] Permit acquired. Number waiting: {}",
            caller,
            waiting
        );

        let delay = self.release_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            drop(permit);
            tracing::trace!("[Caller {}] Permit released", caller);
        });
    }

    /// Maximum number of permits outstanding at once
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How long each permit is held before release
    pub fn release_delay(&self) -> Duration {
        self.release_delay
    }

    /// Permits that could be granted right now without waiting
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Callers currently suspended in [`RateLimiter::acquire`]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }
}

/// Counts a caller as waiting until dropped, including when the
/// `acquire` future is cancelled mid-wait
struct WaitingGuard<'a> {
    waiting: &'a AtomicUsize,
    count_at_entry: usize,
}

impl<'a> WaitingGuard<'a> {
    fn enter(waiting: &'a AtomicUsize) -> Self {
        let count_at_entry = waiting.fetch_add(1, Ordering::Relaxed) + 1;
        Self {
            waiting,
            count_at_entry,
        }
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn create_config(rps: u32, time_unit_ms: u64, uniform: bool) -> RateLimitConfig {
        RateLimitConfig {
            rps,
            time_unit_ms,
            uniform_distribution: uniform,
        }
    }

    #[test]
    fn test_uniform_mode_parameters() {
        let limiter = RateLimiter::new(&create_config(4, 1000, true));
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(limiter.release_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_burst_mode_parameters() {
        let limiter = RateLimiter::new(&create_config(5, 2000, false));
        assert_eq!(limiter.capacity(), 5);
        assert_eq!(limiter.release_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_rps_treated_as_one() {
        let limiter = RateLimiter::new(&create_config(0, 1000, false));
        assert_eq!(limiter.capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uniform_spacing() {
        let limiter = RateLimiter::new(&create_config(4, 1000, true));
        let start = Instant::now();

        let mut grants = Vec::new();
        for _ in 0..5 {
            limiter.acquire().await;
            grants.push(start.elapsed());
            // Never more than one permit outstanding
            assert_eq!(limiter.available_permits(), 0);
        }

        assert_eq!(grants[0], Duration::ZERO);
        for pair in grants.windows(2) {
            let spacing = pair[1] - pair[0];
            assert!(spacing >= Duration::from_millis(250), "spacing {:?}", spacing);
            assert!(spacing < Duration::from_millis(260), "spacing {:?}", spacing);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_wait() {
        let limiter = RateLimiter::new(&create_config(3, 1000, false));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));
        assert_eq!(limiter.available_permits(), 0);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1010));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permits_released_after_delay() {
        let limiter = RateLimiter::new(&create_config(2, 500, false));

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.available_permits(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(limiter.available_permits(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_stops_waiting() {
        let limiter = RateLimiter::new(&create_config(1, 1000, false));
        limiter.acquire().await;

        let result =
            tokio::time::timeout(Duration::from_millis(10), limiter.acquire()).await;
        assert!(result.is_err());
        assert_eq!(limiter.waiting(), 0);

        limiter.acquire().await;
        assert_eq!(limiter.waiting(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_admission() {
        let limiter = Arc::new(RateLimiter::new(&create_config(1, 100, true)));
        let order = Arc::new(Mutex::new(Vec::new()));

        let waiters = (0..4).map(|i| {
            let limiter = Arc::clone(&limiter);
            let order = Arc::clone(&order);
            async move {
                limiter.acquire().await;
                order.lock().unwrap().push(i);
            }
        });
        futures_util::future::join_all(waiters).await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
