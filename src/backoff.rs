//! Backoff delay calculation and `Retry-After` parsing.

use std::time::{Duration, SystemTime};

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};

/// Default upper bound of the random jitter added to every computed delay.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(100);

/// Shape of the delay curve between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// `base` every time.
    Constant,
    /// `base * attempt`.
    Linear,
    /// `base * 2^(attempt - 1)`.
    #[default]
    Exponential,
}

/// Delay before the retry that follows `attempt` (1-based), without jitter.
pub fn base_delay(attempt: u32, base: Duration, strategy: BackoffStrategy) -> Duration {
    let attempt = attempt.max(1);
    match strategy {
        BackoffStrategy::Constant => base,
        BackoffStrategy::Linear => base.saturating_mul(attempt),
        BackoffStrategy::Exponential => {
            let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
            base.saturating_mul(factor)
        }
    }
}

/// Random jitter in `[0, ceiling]`.
pub fn jitter(ceiling: Duration) -> Duration {
    if ceiling.is_zero() {
        return Duration::ZERO;
    }
    let nanos = u64::try_from(ceiling.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(rand::rng().random_range(0..=nanos))
}

/// Full wait before the next attempt.
///
/// A rate-limit hint on a 429 replaces the computed backoff entirely;
/// otherwise the strategy delay plus jitter is used.
pub fn retry_delay(
    attempt: u32,
    base: Duration,
    strategy: BackoffStrategy,
    max_jitter: Duration,
    status: Option<u16>,
    retry_after: Option<Duration>,
) -> Duration {
    if status == Some(429) {
        if let Some(hint) = retry_after {
            return hint;
        }
    }
    base_delay(attempt, base, strategy).saturating_add(jitter(max_jitter))
}

/// Parse a `Retry-After` header given either as delta-seconds or an HTTP-date.
///
/// Returns `None` when the header is missing, malformed, negative or in the past.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    parse_retry_after_value(value, SystemTime::now())
}

fn parse_retry_after_value(value: &str, now: SystemTime) -> Option<Duration> {
    if let Ok(seconds) = value.parse::<i64>() {
        return u64::try_from(seconds)
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs);
    }

    let at = httpdate::parse_http_date(value).ok()?;
    at.duration_since(now).ok().filter(|d| !d.is_zero())
}
