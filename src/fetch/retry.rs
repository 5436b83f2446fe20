use crate::config::FetchConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter for transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            jitter: Duration::from_millis(250),
        }
    }

    /// Retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    /// A server-provided Retry-After wins over the computed backoff, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        let delay = match retry_after {
            Some(server) => server.min(self.max_delay),
            None => backoff,
        };
        if self.jitter.is_zero() {
            return delay;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

/// Rate limiting, temporary blocks and server errors are worth another attempt.
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || status == 403 || (500..=599).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.delay_for(1, None), Duration::from_millis(500));
        assert_eq!(p.delay_for(2, None), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3, None), Duration::from_millis(2000));
        assert_eq!(p.delay_for(4, None), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let p = policy();
        assert_eq!(p.delay_for(1, Some(Duration::from_secs(2))), Duration::from_secs(2));
        assert_eq!(p.delay_for(1, Some(Duration::from_secs(60))), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let mut p = policy();
        p.jitter = Duration::from_millis(100);
        let d = p.delay_for(1, None);
        assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(600));
    }

    #[test]
    fn test_transient_statuses() {
        for s in [429, 403, 500, 502, 503] {
            assert!(is_transient_status(s), "{s}");
        }
        for s in [200, 304, 400, 404, 410] {
            assert!(!is_transient_status(s), "{s}");
        }
    }
}
