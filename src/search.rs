//! Catalog search capability.
//!
//! [`TrackSearch`] is the only way the resolver talks to the remote catalog.
//! The Spotify client implements it for real runs; tests script it.
//! [`RateLimitedSearch`] wraps any implementation with a shared
//! [`RateLimiter`] so parallel resolutions stay within the endpoint's limits.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::models::CandidateTrack;

// ============================================================================
// Capability
// ============================================================================

/// Kind of catalog object to search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Track,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchKind::Track => "track",
        }
    }
}

/// Failure of a single search call.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The catalog answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Free-text, relevance-ranked catalog search.
pub trait TrackSearch {
    /// Return up to `limit` candidates for `query`, best first.
    /// An empty vector means the catalog had nothing.
    fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, SearchError>;
}

impl<T: TrackSearch + ?Sized> TrackSearch for &T {
    fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, SearchError> {
        (**self).search(query, kind, limit)
    }
}

impl<T: TrackSearch + ?Sized> TrackSearch for Arc<T> {
    fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, SearchError> {
        (**self).search(query, kind, limit)
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Enforces a minimum interval between requests, with adaptive backoff on
/// failures.
pub struct RateLimiter {
    name: String,
    last_request: Option<Instant>,
    current_interval: Duration,
    base_interval: Duration,
    max_interval: Duration,
    success_count: u32,
    successes_to_reduce: u32,
}

impl RateLimiter {
    /// * `name` — label for log messages (e.g. "spotify")
    /// * `base_interval` — minimum time between requests
    /// * `max_interval` — upper bound after repeated failures
    /// * `successes_to_reduce` — consecutive successes before halving the
    ///   interval (0 disables the reduction)
    pub fn new(
        name: &str,
        base_interval: Duration,
        max_interval: Duration,
        successes_to_reduce: u32,
    ) -> Self {
        RateLimiter {
            name: name.to_string(),
            last_request: None,
            current_interval: base_interval,
            base_interval,
            max_interval,
            success_count: 0,
            successes_to_reduce,
        }
    }

    /// Max interval = 16× base, reduce after 10 successes.
    pub fn from_millis(name: &str, millis: u64) -> Self {
        let base = Duration::from_millis(millis);
        Self::new(name, base, base * 16, 10)
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Sleep if not enough time has elapsed since the last request.
    /// Must be called *before* making a request.
    pub fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.current_interval {
                let wait_time = self.current_interval - elapsed;
                tracing::debug!(
                    "[{}] rate limiting: waiting {:.2}s",
                    self.name,
                    wait_time.as_secs_f64()
                );
                thread::sleep(wait_time);
            }
        }
        self.last_request = Some(Instant::now());
    }

    /// After enough consecutive successes the interval is halved (down to the base).
    pub fn report_success(&mut self) {
        if self.successes_to_reduce == 0 {
            return;
        }

        self.success_count += 1;

        if self.success_count >= self.successes_to_reduce
            && self.current_interval > self.base_interval
        {
            self.current_interval = (self.current_interval / 2).max(self.base_interval);
            tracing::debug!(
                "[{}] rate limit reduced to {:.2}s after {} successes",
                self.name,
                self.current_interval.as_secs_f64(),
                self.success_count
            );
            self.success_count = 0;
        }
    }

    /// Doubles the interval (up to max).
    pub fn report_failure(&mut self) {
        let doubled = if self.current_interval.is_zero() {
            Duration::from_millis(100)
        } else {
            self.current_interval * 2
        };
        self.current_interval = doubled.min(self.max_interval);
        tracing::debug!(
            "[{}] rate limit increased to {:.2}s due to error",
            self.name,
            self.current_interval.as_secs_f64()
        );
        self.success_count = 0;
    }
}

/// A [`TrackSearch`] whose calls all pass through one shared [`RateLimiter`].
/// Safe to share across worker threads when `S` is `Sync`.
pub struct RateLimitedSearch<S> {
    inner: S,
    limiter: Mutex<RateLimiter>,
}

impl<S: TrackSearch> RateLimitedSearch<S> {
    pub fn new(inner: S, limiter: RateLimiter) -> Self {
        Self {
            inner,
            limiter: Mutex::new(limiter),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn with_limiter(&self, f: impl FnOnce(&mut RateLimiter)) {
        // A poisoned limiter only means another worker panicked mid-update
        let mut guard = self.limiter.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard);
    }
}

impl<S: TrackSearch> TrackSearch for RateLimitedSearch<S> {
    fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, SearchError> {
        self.with_limiter(RateLimiter::wait_if_needed);
        let result = self.inner.search(query, kind, limit);
        match &result {
            Ok(_) => self.with_limiter(RateLimiter::report_success),
            Err(_) => self.with_limiter(RateLimiter::report_failure),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
    }

    impl TrackSearch for Flaky {
        fn search(
            &self,
            _query: &str,
            _kind: SearchKind,
            _limit: usize,
        ) -> Result<Vec<CandidateTrack>, SearchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Ok(Vec::new())
            } else {
                Err(SearchError::Transport("reset".to_string()))
            }
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut limiter = RateLimiter::new(
            "test",
            Duration::from_millis(100),
            Duration::from_millis(300),
            2,
        );
        limiter.report_failure();
        assert_eq!(limiter.current_interval(), Duration::from_millis(200));
        limiter.report_failure();
        assert_eq!(limiter.current_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_successes_reduce_to_base() {
        let mut limiter = RateLimiter::new(
            "test",
            Duration::from_millis(100),
            Duration::from_millis(1600),
            2,
        );
        limiter.report_failure();
        limiter.report_failure();
        assert_eq!(limiter.current_interval(), Duration::from_millis(400));
        limiter.report_success();
        limiter.report_success();
        assert_eq!(limiter.current_interval(), Duration::from_millis(200));
        limiter.report_success();
        limiter.report_success();
        assert_eq!(limiter.current_interval(), Duration::from_millis(100));
        limiter.report_success();
        limiter.report_success();
        assert_eq!(limiter.current_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_max_interval_caps_backoff() {
        let mut limiter = RateLimiter::from_millis("test", 0);
        limiter.report_failure();
        assert_eq!(limiter.current_interval(), Duration::ZERO);
    }

    #[test]
    fn test_rate_limited_search_passes_results_through() {
        let search = RateLimitedSearch::new(
            Flaky {
                calls: AtomicUsize::new(0),
            },
            RateLimiter::from_millis("test", 0),
        );
        assert!(search.search("q", SearchKind::Track, 5).is_ok());
        assert!(matches!(
            search.search("q", SearchKind::Track, 5),
            Err(SearchError::Transport(_))
        ));
        assert_eq!(search.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_search_error_display() {
        let err = SearchError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 429: rate limited");
    }
}
