use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Seconds the upstream asked us to back off for, `DEFAULT_RETRY_AFTER` if it didn't say.
pub fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

// tracks the 429 waits of a single request
pub struct RateControl {
    waited: Duration,
    max_wait: Duration,
    attempts: u32,
}

impl RateControl {
    pub fn new(max_wait: Duration) -> Self {
        Self {
            waited: Duration::ZERO,
            max_wait,
            attempts: 0,
        }
    }

    /// Sleeps for `delay` unless that would push the total past the budget.
    /// Returns `false` without sleeping once the budget is spent.
    pub async fn wait(&mut self, delay: Duration) -> bool {
        let total = self.waited.checked_add(delay);
        if total.map_or(true, |total| total > self.max_wait) {
            return false;
        }
        self.attempts += 1;
        log::warn!(
            "rate limited, waiting {}s (retry #{})",
            delay.as_secs_f32(),
            self.attempts
        );
        tokio::time::sleep(delay).await;
        self.waited += delay;
        true
    }

    pub fn waited(&self) -> Duration {
        self.waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(retry_after(&headers), Duration::from_secs(2));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_is_bounded() {
        let mut rate = RateControl::new(Duration::from_secs(3));
        assert!(rate.wait(Duration::from_secs(2)).await);
        assert!(rate.wait(Duration::from_secs(1)).await);
        assert!(!rate.wait(Duration::from_secs(1)).await);
        assert_eq!(rate.waited(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn absurd_retry_after_is_refused() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("18446744073709551615"));
        let delay = retry_after(&headers);
        assert_eq!(delay, Duration::from_secs(u64::MAX));

        let mut rate = RateControl::new(Duration::from_secs(600));
        assert!(rate.wait(Duration::from_secs(1)).await);
        assert!(!rate.wait(delay).await);
        assert_eq!(rate.waited(), Duration::from_secs(1));
    }
}
