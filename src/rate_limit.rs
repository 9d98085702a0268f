//! Sliding-window action rate limiter
//!
//! Bounds how many actions the agent can issue per second. Timestamps come
//! from the monotonic clock, so wall-clock adjustments cannot widen or
//! collapse the window.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Shared, internally synchronized rate limiter.
///
/// One critical section per call keeps the window invariant intact when the
/// watchdog and the main action loop admit concurrently.
pub struct RateLimiter {
    max_per_second: usize,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_per_second: usize) -> Self {
        Self {
            max_per_second,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Try to admit one action. Rejected attempts are not recorded, so a
    /// burst of denials cannot extend the lockout.
    pub fn admit(&self) -> bool {
        let now = Instant::now();
        let mut window = self.window.lock().unwrap();

        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) > WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.max_per_second {
            tracing::warn!(
                max_per_second = self.max_per_second,
                "action rate limit exceeded"
            );
            return false;
        }

        window.push_back(now);
        true
    }

    /// Clear the window (session restart)
    pub fn reset(&self) {
        self.window.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            assert!(limiter.admit());
        }
        assert!(!limiter.admit());
    }

    #[test]
    fn test_window_recovers_after_one_second() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.admit());
        assert!(limiter.admit());
        assert!(!limiter.admit());

        std::thread::sleep(Duration::from_millis(1100));
        // Eviction alone frees the window, no reset() needed
        assert!(limiter.admit());
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.admit());
        for _ in 0..10 {
            assert!(!limiter.admit());
        }
        std::thread::sleep(Duration::from_millis(1100));
        assert!(limiter.admit());
    }

    #[test]
    fn test_reset_clears_window() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.admit());
        assert!(!limiter.admit());
        limiter.reset();
        assert!(limiter.admit());
    }

    #[test]
    fn test_concurrent_admission_respects_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(10));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..10).filter(|_| limiter.admit()).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
    }
}
