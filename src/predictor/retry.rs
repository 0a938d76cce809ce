use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Retry with exponential backoff.
///
/// With the defaults (3 attempts, 1s base, ×2) a persistently failing call is
/// tried three times with 1s then 2s in between. No sleep follows the last
/// attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Factor applied to the delay after each further failure
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based), or
    /// `None` if that attempt was the last one.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.powi(attempt as i32 - 1);
        let nanos = (self.base_delay.as_nanos() as f64 * factor).round();
        Some(Duration::from_nanos(nanos as u64))
    }

    /// Run `op` until it succeeds or the attempt budget is spent, returning
    /// the last error in the latter case.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => match self.delay_after(attempt) {
                    Some(delay) => {
                        warn!(
                            "{} failed (attempt {}/{}): {}; retrying in {:?}",
                            label, attempt, self.max_attempts, e, delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(
                            "{} failed after {} attempt(s): {}",
                            label, attempt, e
                        );
                        return Err(e);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_schedule_is_one_then_two_seconds() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_after(1), Some(Duration::from_millis(1000)));
        assert_eq!(p.delay_after(2), Some(Duration::from_millis(2000)));
        assert_eq!(p.delay_after(3), None);
    }

    #[test]
    fn single_attempt_never_waits() {
        let p = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(p.delay_after(1), None);
    }

    #[test]
    fn custom_multiplier() {
        let p = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            multiplier: 3.0,
        };
        assert_eq!(p.delay_after(1), Some(Duration::from_millis(100)));
        assert_eq!(p.delay_after(2), Some(Duration::from_millis(300)));
        assert_eq!(p.delay_after(3), Some(Duration::from_millis(900)));
        assert_eq!(p.delay_after(4), None);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_failure_uses_full_budget_and_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let c = calls.clone();
        let result: Result<(), String> = RetryPolicy::default()
            .run("test op", move |_| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            })
            .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(3100), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let start = tokio::time::Instant::now();
        let result: Result<u32, String> = RetryPolicy::default()
            .run("test op", |attempt| async move {
                if attempt < 2 {
                    Err("flaky".to_string())
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1100), "elapsed {:?}", elapsed);
    }
}
