//! Retry and backoff policy for one logical API call.
//!
//! [`RetryState`] owns the attempt counter. The dispatcher classifies each
//! physical attempt into an [`AttemptOutcome`] and asks the state for the
//! next [`Decision`]. All retry causes draw from the same attempt budget.

use std::time::Duration;

use reqwest::{header::HeaderMap, StatusCode};

use crate::ClientOptions;

const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// What a single attempt produced, reduced to what the policy needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx response.
    Success,
    /// The transport could not connect or the request timed out.
    ConnectFailed,
    /// 429 or 403, with whichever rate-limit hints were present.
    RateLimited {
        retry_after: Option<Duration>,
        /// Epoch seconds from `X-RateLimit-Reset`.
        reset_at: Option<u64>,
    },
    NotFound,
    ServerError(StatusCode),
    /// Any other non-2xx status.
    Unexpected(StatusCode),
}

impl AttemptOutcome {
    /// Classifies a response by status code and rate-limit headers.
    pub fn classify(status: StatusCode, headers: &HeaderMap) -> Self {
        if status.is_success() {
            return Self::Success;
        }
        match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => Self::RateLimited {
                retry_after: header_u64(headers, reqwest::header::RETRY_AFTER.as_str())
                    .map(Duration::from_secs),
                reset_at: header_u64(headers, X_RATELIMIT_RESET),
            },
            StatusCode::NOT_FOUND => Self::NotFound,
            status if status.is_server_error() => Self::ServerError(status),
            status => Self::Unexpected(status),
        }
    }
}

/// Integer header value; anything unparseable counts as absent.
fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// What the dispatcher should do after an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Hand the response to the caller.
    Accept,
    /// Fail with [`crate::GitHubError::NotFound`] without retrying.
    NotFound,
    /// Wait, then issue the next attempt.
    Retry { wait: Duration },
    /// Budget spent; fail with [`crate::GitHubError::MaxRetriesExceeded`].
    Exhausted,
}

/// Attempt bookkeeping for one logical call.
#[derive(Clone, Debug)]
pub struct RetryState {
    attempt: u32,
    max_attempts: u32,
    backoff_base: Duration,
}

impl RetryState {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            attempt: 0,
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    pub fn from_options(options: &ClientOptions) -> Self {
        Self::new(options.max_attempts, options.backoff_base())
    }

    /// Zero-based index of the attempt currently in flight.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `backoff_base * 2^attempt`, with no jitter.
    pub fn backoff(&self) -> Duration {
        let multiplier = 1u32 << self.attempt.min(16);
        self.backoff_base.saturating_mul(multiplier)
    }

    /// Consumes the current attempt and decides what happens next.
    ///
    /// `now` is the current time in epoch seconds, used to turn
    /// `X-RateLimit-Reset` into a wait.
    pub fn next(&mut self, outcome: &AttemptOutcome, now: u64) -> Decision {
        let wait = match outcome {
            AttemptOutcome::Success => return Decision::Accept,
            AttemptOutcome::NotFound => return Decision::NotFound,
            AttemptOutcome::RateLimited {
                retry_after: Some(wait),
                ..
            } => *wait,
            AttemptOutcome::RateLimited {
                reset_at: Some(reset_at),
                ..
            } => Duration::from_secs(reset_at.saturating_sub(now)),
            AttemptOutcome::RateLimited { .. } => Duration::ZERO,
            AttemptOutcome::ConnectFailed
            | AttemptOutcome::ServerError(_)
            | AttemptOutcome::Unexpected(_) => self.backoff(),
        };

        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            Decision::Exhausted
        } else {
            Decision::Retry { wait }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{
        header::{HeaderMap, HeaderValue, RETRY_AFTER},
        StatusCode,
    };

    use super::{AttemptOutcome, Decision, RetryState};
    use crate::ClientOptions;

    fn default_state() -> RetryState {
        RetryState::from_options(&ClientOptions::default())
    }

    fn rate_limited(retry_after: Option<u64>, reset_at: Option<u64>) -> AttemptOutcome {
        AttemptOutcome::RateLimited {
            retry_after: retry_after.map(Duration::from_secs),
            reset_at,
        }
    }

    #[test]
    fn three_server_errors_wait_two_then_four_then_exhaust() {
        let mut state = default_state();
        let outcome = AttemptOutcome::ServerError(StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            state.next(&outcome, 0),
            Decision::Retry {
                wait: Duration::from_secs(2)
            }
        );
        assert_eq!(
            state.next(&outcome, 0),
            Decision::Retry {
                wait: Duration::from_secs(4)
            }
        );
        assert_eq!(state.next(&outcome, 0), Decision::Exhausted);
        assert_eq!(state.attempt(), state.max_attempts());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let mut state = default_state();
        assert_eq!(state.backoff(), Duration::from_secs(2));
        state.next(&AttemptOutcome::ConnectFailed, 0);
        assert_eq!(state.backoff(), Duration::from_secs(4));
        state.next(&AttemptOutcome::ConnectFailed, 0);
        assert_eq!(state.backoff(), Duration::from_secs(8));
    }

    #[test]
    fn unexpected_status_uses_backoff() {
        let mut state = default_state();
        assert_eq!(
            state.next(&AttemptOutcome::Unexpected(StatusCode::IM_A_TEAPOT), 0),
            Decision::Retry {
                wait: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn not_found_short_circuits_without_consuming_budget() {
        let mut state = default_state();
        assert_eq!(state.next(&AttemptOutcome::NotFound, 0), Decision::NotFound);
        assert_eq!(state.attempt(), 0);
    }

    #[test]
    fn success_is_accepted() {
        let mut state = default_state();
        state.next(&AttemptOutcome::ConnectFailed, 0);
        assert_eq!(state.next(&AttemptOutcome::Success, 0), Decision::Accept);
        assert_eq!(state.attempt(), 1);
    }

    #[test]
    fn retry_after_wins_over_reset() {
        let mut state = default_state();
        assert_eq!(
            state.next(&rate_limited(Some(1), Some(1_000)), 10),
            Decision::Retry {
                wait: Duration::from_secs(1)
            }
        );
        assert_eq!(state.attempt(), 1);
    }

    #[test]
    fn reset_in_future_waits_until_reset() {
        let mut state = default_state();
        assert_eq!(
            state.next(&rate_limited(None, Some(1_030)), 1_000),
            Decision::Retry {
                wait: Duration::from_secs(30)
            }
        );
    }

    #[test]
    fn reset_in_past_waits_zero() {
        let mut state = default_state();
        assert_eq!(
            state.next(&rate_limited(None, Some(900)), 1_000),
            Decision::Retry {
                wait: Duration::ZERO
            }
        );
    }

    #[test]
    fn rate_limit_without_hints_retries_immediately() {
        let mut state = default_state();
        assert_eq!(
            state.next(&rate_limited(None, None), 0),
            Decision::Retry {
                wait: Duration::ZERO
            }
        );
    }

    #[test]
    fn rate_limits_share_the_attempt_budget() {
        let mut state = default_state();
        let outcome = rate_limited(Some(0), None);
        assert!(matches!(state.next(&outcome, 0), Decision::Retry { .. }));
        assert!(matches!(
            state.next(&AttemptOutcome::ConnectFailed, 0),
            Decision::Retry { .. }
        ));
        assert_eq!(state.next(&outcome, 0), Decision::Exhausted);
    }

    #[test]
    fn zero_max_attempts_still_allows_one() {
        let mut state = RetryState::new(0, Duration::from_millis(1));
        assert_eq!(state.max_attempts(), 1);
        assert_eq!(
            state.next(&AttemptOutcome::ConnectFailed, 0),
            Decision::Exhausted
        );
    }

    #[test]
    fn classify_maps_statuses() {
        let empty = HeaderMap::new();
        assert_eq!(
            AttemptOutcome::classify(StatusCode::OK, &empty),
            AttemptOutcome::Success
        );
        assert_eq!(
            AttemptOutcome::classify(StatusCode::NO_CONTENT, &empty),
            AttemptOutcome::Success
        );
        assert_eq!(
            AttemptOutcome::classify(StatusCode::NOT_FOUND, &empty),
            AttemptOutcome::NotFound
        );
        assert_eq!(
            AttemptOutcome::classify(StatusCode::BAD_GATEWAY, &empty),
            AttemptOutcome::ServerError(StatusCode::BAD_GATEWAY)
        );
        assert_eq!(
            AttemptOutcome::classify(StatusCode::BAD_REQUEST, &empty),
            AttemptOutcome::Unexpected(StatusCode::BAD_REQUEST)
        );
        assert_eq!(
            AttemptOutcome::classify(StatusCode::FORBIDDEN, &empty),
            rate_limited(None, None)
        );
    }

    #[test]
    fn classify_reads_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("1"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));

        assert_eq!(
            AttemptOutcome::classify(StatusCode::TOO_MANY_REQUESTS, &headers),
            rate_limited(Some(1), Some(1_700_000_000))
        );
    }

    #[test]
    fn classify_ignores_unparseable_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("42"));

        assert_eq!(
            AttemptOutcome::classify(StatusCode::FORBIDDEN, &headers),
            rate_limited(None, Some(42))
        );
    }
}
