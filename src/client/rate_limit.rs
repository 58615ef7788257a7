//! Rate Limit Tracking
//!
//! Two layers of pacing: a header-derived [`RateLimitState`] for the global
//! request budget the server advertises, and leaky-bucket [`Bucket`]s for
//! endpoints that document their own stricter limits (e.g. `/players/match`
//! at one request per second).

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, RETRY_AFTER};

pub(crate) const LIMIT_HEADER: &str = "x-rate-limit-limit";
pub(crate) const REMAINING_HEADER: &str = "x-rate-limit-remaining";
pub(crate) const RESET_HEADER: &str = "x-rate-limit-reset";

/// Reset values at or above this are epoch seconds; below, delta seconds.
const EPOCH_CUTOFF: i64 = 1_000_000_000;

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
}

/// The server's advertised request budget, as last observed.
///
/// Owned by a single client and updated once per completed response; a
/// request that is cancelled before its response arrives leaves the state
/// untouched.
#[derive(Debug)]
pub struct RateLimitState {
    limit: Option<u32>,
    remaining: Option<u32>,
    reset_at: Option<Instant>,
    default_wait: Duration,
}

impl RateLimitState {
    pub fn new(default_wait: Duration) -> Self {
        Self {
            limit: None,
            remaining: None,
            reset_at: None,
            default_wait,
        }
    }

    /// How long the next request must be delayed, if at all.
    ///
    /// A reset that has already elapsed counts as immediately available.
    pub fn wait_needed(&mut self, now: Instant) -> Option<Duration> {
        self.decay(now);
        if self.remaining == Some(0) {
            if let Some(reset_at) = self.reset_at {
                return Some(reset_at - now);
            }
        }
        None
    }

    /// Fold a response's rate limit headers into the state.
    ///
    /// When the server omits all three headers, the previous state merely
    /// decays by elapsed time. When it reports exhaustion without a usable
    /// reset, the conservative default wait applies.
    pub fn observe(&mut self, headers: &HeaderMap, now: Instant) {
        let limit = header_i64(headers, LIMIT_HEADER);
        let remaining = header_i64(headers, REMAINING_HEADER);
        let reset = header_i64(headers, RESET_HEADER);

        if limit.is_none() && remaining.is_none() && reset.is_none() {
            self.decay(now);
            return;
        }

        if let Some(limit) = limit {
            self.limit = Some(limit.max(0) as u32);
        }
        if let Some(remaining) = remaining {
            self.remaining = Some(remaining.max(0) as u32);
        }
        match reset.map(Self::reset_delta) {
            Some(delta) => self.reset_at = Some(now + delta),
            None => {
                let reset_known = matches!(self.reset_at, Some(at) if at > now);
                if self.remaining == Some(0) && !reset_known {
                    self.reset_at = Some(now + self.default_wait);
                }
            }
        }
    }

    /// Fold a 429 into the state so the *next* request paces correctly,
    /// returning the server's `Retry-After` when it sent one.
    pub fn observe_rate_limited(
        &mut self,
        headers: &HeaderMap,
        now: Instant,
    ) -> Option<Duration> {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|secs| *secs >= 0.0)
            .map(Duration::from_secs_f64);

        self.remaining = Some(0);
        self.reset_at = Some(now + retry_after.unwrap_or(self.default_wait));
        retry_after
    }

    /// Refill once the reset instant has passed.
    fn decay(&mut self, now: Instant) {
        if matches!(self.reset_at, Some(at) if at <= now) {
            self.remaining = self.limit;
            self.reset_at = None;
        }
    }

    fn reset_delta(value: i64) -> Duration {
        let secs = if value >= EPOCH_CUTOFF {
            value - chrono::Utc::now().timestamp()
        } else {
            value
        };
        Duration::from_secs(secs.max(0) as u64)
    }
}

/// A leaky bucket for endpoint-local limits.
#[derive(Debug)]
pub struct Bucket {
    rate: u32,
    per: Duration,
    leak: Duration,
    last: Option<Instant>,
    tokens: u32,
}

impl Bucket {
    /// A bucket allowing `rate` requests every `per`.
    pub fn new(rate: u32, per: Duration) -> Self {
        assert!(rate > 0, "bucket rate must be positive");
        Self {
            rate,
            per,
            leak: per / rate,
            last: None,
            tokens: rate,
        }
    }

    fn tokens_at(&self, now: Instant) -> u32 {
        let last = match self.last {
            Some(last) => last,
            None => return self.rate,
        };
        if now > last + self.per {
            return self.rate;
        }
        let elapsed = now.saturating_duration_since(last).as_secs_f64();
        let leaked = (elapsed / self.leak.as_secs_f64()) as u32;
        (self.tokens + leaked).min(self.rate)
    }

    /// How long until a token is available.
    pub fn retry_after(&self, now: Instant) -> Duration {
        if self.tokens_at(now) > 0 {
            return Duration::ZERO;
        }
        let elapsed = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.leak.saturating_sub(elapsed)
    }

    /// Consume a token for a request issued at `now`.
    ///
    /// Always consumes, saturating at zero: a caller that slept out
    /// `retry_after` owns the leaked token even when float truncation in
    /// the token count has not credited it yet.
    pub fn update(&mut self, now: Instant) {
        let last = *self.last.get_or_insert(now);
        self.tokens = self.tokens_at(now).saturating_sub(1);
        // Advance the window once a full leak interval has passed, so the
        // next token is measured from this request, not the previous one.
        if now.saturating_duration_since(last) >= self.leak {
            self.last = Some(now);
        }
    }
}
