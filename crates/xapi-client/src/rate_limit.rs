//! Minimum-spacing rate limiter for the command channel.
//!
//! The server enforces a minimum interval between commands; exceeding it gets
//! the connection dropped. [`RateLimiter::acquire`] suspends the caller until
//! the interval since the previous exchange has elapsed, and
//! [`RateLimiter::stamp`] records completion of the exchange, success or
//! failure, because a failed round trip still consumed a request slot.
//!
//! The stamp is taken after the full send+receive, not after the send, so the
//! spacing is measured from completion of the prior exchange.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive command exchanges.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
        }
    }

    /// Wait until the minimum interval since the previous stamp has elapsed.
    ///
    /// Returns immediately if no exchange has completed yet.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
    }

    /// Record completion of an exchange.
    pub fn stamp(&mut self) {
        self.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_acquire_returns_immediately() {
        let mut limiter = RateLimiter::new(Duration::from_millis(200));
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_acquire_waits_out_the_interval() {
        let mut limiter = RateLimiter::new(Duration::from_millis(200));
        limiter.acquire().await;
        limiter.stamp();

        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn partial_elapse_only_waits_the_remainder() {
        let mut limiter = RateLimiter::new(Duration::from_millis(200));
        limiter.stamp();
        tokio::time::advance(Duration::from_millis(150)).await;

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_already_elapsed_does_not_wait() {
        let mut limiter = RateLimiter::new(Duration::from_millis(200));
        limiter.stamp();
        tokio::time::advance(Duration::from_millis(250)).await;

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
