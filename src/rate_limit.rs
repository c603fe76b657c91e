//! Rate limit window tracking.
//!
//! Every response carries the server's quota state in three headers. The
//! tracker keeps the most recent window per resource client, and
//! [`RateLimitInfo::should_wait`] decides whether the next request is worth
//! delaying.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderMap;
use tokio::sync::watch;

/// Header carrying the request quota of the current window.
pub const LIMIT_HEADER: &str = "x-rate-limit-limit";

/// Header carrying the requests left in the current window.
pub const REMAINING_HEADER: &str = "x-rate-limit-remaining";

/// Header carrying the moment the current window resets.
pub const RESET_HEADER: &str = "x-rate-limit-reset";

/// At or below this many remaining requests the client considers waiting.
pub const LOW_REMAINING_THRESHOLD: u32 = 5;

/// Resets further away than this are not waited out.
pub const MAX_WAIT: Duration = Duration::from_secs(120);

/// The server-communicated quota state.
///
/// Missing or unparseable headers leave the corresponding field at zero
/// (or the Unix epoch for `reset`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitInfo {
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset: DateTime<Utc>,
}

impl RateLimitInfo {
    /// Extracts the rate limit window from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

        Self {
            limit: header(LIMIT_HEADER)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            remaining: header(REMAINING_HEADER)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            reset: header(RESET_HEADER)
                .and_then(parse_reset)
                .unwrap_or_default(),
        }
    }

    /// How long to pause before the next request, measured from now.
    pub fn should_wait(&self) -> Duration {
        self.should_wait_at(Utc::now())
    }

    /// How long to pause before the next request, measured from `now`.
    ///
    /// Non-zero only when at most [`LOW_REMAINING_THRESHOLD`] requests remain
    /// and the reset lies strictly between `now` and `now + MAX_WAIT`. A
    /// reset in the past is stale; one further out is not worth blocking on.
    pub fn should_wait_at(&self, now: DateTime<Utc>) -> Duration {
        if self.remaining > LOW_REMAINING_THRESHOLD {
            return Duration::ZERO;
        }
        match self.time_until_reset(now) {
            Some(wait) if wait < MAX_WAIT => wait,
            _ => Duration::ZERO,
        }
    }

    /// Time left until `reset`, or `None` if the reset is not in the future.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<Duration> {
        let until = self.reset - now;
        if until <= TimeDelta::zero() {
            return None;
        }
        until.to_std().ok()
    }
}

/// Parses a reset header value.
///
/// Accepts RFC 3339 (`2024-05-01T12:00:00Z`), RFC 2822 / HTTP-date
/// (`Wed, 01 May 2024 12:00:00 GMT`) and integer Unix seconds.
pub fn parse_reset(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts.with_timezone(&Utc));
    }
    value
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Picks the window whose reset lies furthest in the future.
///
/// Used to aggregate the snapshots of several resource clients into the
/// most recently observed window. Returns the default window for an empty
/// input.
pub fn most_recent<I>(windows: I) -> RateLimitInfo
where
    I: IntoIterator<Item = RateLimitInfo>,
{
    windows
        .into_iter()
        .max_by_key(|info| info.reset)
        .unwrap_or_default()
}

/// Holds the latest [`RateLimitInfo`] seen by one resource client.
///
/// Clones share the same snapshot. Readers always get a copy, never a
/// reference into shared state.
#[derive(Debug, Clone)]
pub struct RateLimitTracker {
    latest: Arc<watch::Sender<RateLimitInfo>>,
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitTracker {
    /// Creates a tracker holding the default (empty) window.
    pub fn new() -> Self {
        Self {
            latest: Arc::new(watch::Sender::new(RateLimitInfo::default())),
        }
    }

    /// Reads the window from response headers and stores it as the latest.
    pub fn observe(&self, headers: &HeaderMap) -> RateLimitInfo {
        let info = RateLimitInfo::from_headers(headers);
        self.latest.send_replace(info);
        info
    }

    /// Returns a copy of the latest window.
    pub fn snapshot(&self) -> RateLimitInfo {
        *self.latest.borrow()
    }
}
