//! Randomized pauses between requests

use std::time::Duration;

use tokio::time::sleep;
use tracing::trace;

use crate::infrastructure::config::DelayRange;

/// Sleeps a uniformly random duration in `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    min: Duration,
    max: Duration,
}

impl Pacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max { Self { min, max } } else { Self { min: max, max: min } }
    }

    /// No pauses at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        let spread = (self.max - self.min).as_millis() as u64;
        if spread == 0 {
            return self.min;
        }
        self.min + Duration::from_millis(fastrand::u64(0..=spread))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        trace!("Pausing for {:?}", delay);
        sleep(delay).await;
    }
}

impl From<DelayRange> for Pacer {
    fn from(range: DelayRange) -> Self {
        Self::new(range.min(), range.max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_stays_in_range() {
        let pacer = Pacer::from(DelayRange::new(700, 1300));
        for _ in 0..200 {
            let delay = pacer.next_delay();
            assert!(delay >= Duration::from_millis(700));
            assert!(delay <= Duration::from_millis(1300));
        }
    }

    #[test]
    fn test_inverted_range_is_normalized() {
        let pacer = Pacer::new(Duration::from_millis(50), Duration::from_millis(10));
        let delay = pacer.next_delay();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_none_does_not_sleep() {
        let started = std::time::Instant::now();
        Pacer::none().pause().await;
        assert_eq!(Pacer::none().next_delay(), Duration::ZERO);
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
