//! `Retry-After` header parsing and the per-process default-delay scalar.
//!
//! The header is either an integer count of seconds or an HTTP-date. When
//! neither parses (or the date is already in the past), the caller falls
//! back to a default delay that grows every time it's used, so repeated
//! silence from the server backs the client off further each time.

use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tracing::warn;

/// One hour, in milliseconds. A delay beyond this is considered pathological
/// and is reported to the caller as `overlong` so it can trigger graceful
/// abandonment, per the policy that an excessively long pause likely means
/// the server wants the client to stop entirely, not just slow down.
const MAX_SANE_DELAY_MS: u64 = 60 * 60 * 1000;

/// The per-process default retry delay, doubling (or, for Restore, growing by
/// 1.5x) every time it's used because the server gave no usable header.
///
/// Backup and Restore each hold their own instance with their own growth
/// factor; the scalar itself is shared across every transfer in that mode's
/// run, per the "no usable Retry-After" fallback being process-global rather
/// than per-path.
pub struct DefaultDelay {
    current_ms: Mutex<u64>,
    growth_factor: f64,
}

impl DefaultDelay {
    pub fn new(initial_ms: u64, growth_factor: f64) -> Self {
        Self {
            current_ms: Mutex::new(initial_ms),
            growth_factor,
        }
    }

    /// Growth factor used by Backup transfers: doubles on each fallback use.
    pub fn for_backup() -> Self {
        Self::new(1500, 2.0)
    }

    /// Growth factor used by Restore transfers: x1.5 on each fallback use.
    pub fn for_restore() -> Self {
        Self::new(1500, 1.5)
    }

    /// Returns the current value without mutating it. Used by tests and by
    /// logging.
    #[allow(clippy::unwrap_used)]
    pub fn current_ms(&self) -> u64 {
        *self.current_ms.lock().unwrap()
    }

    /// Returns the current value, then grows it by `growth_factor` for next
    /// time.
    #[allow(clippy::unwrap_used)]
    fn take_and_grow(&self) -> u64 {
        let mut guard = self.current_ms.lock().unwrap();
        let used = *guard;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let grown = (used as f64 * self.growth_factor).round() as u64;
        *guard = grown.max(used + 1);
        used
    }
}

/// Outcome of resolving a `Retry-After` header (or its absence) to a concrete
/// pause duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDelay {
    pub delay_ms: u64,
    /// True when the resolved delay exceeds the one-hour sanity ceiling.
    /// The caller still honors `delay_ms` for the *current* pause, but should
    /// additionally trigger graceful abandonment.
    pub overlong: bool,
}

/// Resolves a `Retry-After` header value (if the server sent one) to a pause
/// duration, falling back to and growing `default` when the header is
/// missing or unparseable.
pub fn resolve(header: Option<&str>, default: &DefaultDelay) -> ResolvedDelay {
    let delay_ms = header.and_then(parse_header).unwrap_or_else(|| default.take_and_grow());

    let overlong = delay_ms > MAX_SANE_DELAY_MS;
    if overlong {
        warn!(delay_ms, "Retry-After exceeds one hour, triggering graceful abandonment");
    }
    ResolvedDelay { delay_ms, overlong }
}

fn parse_header(value: &str) -> Option<u64> {
    let trimmed = value.trim();

    if let Ok(seconds) = trimmed.parse::<i64>() {
        if seconds > 0 {
            return Some(u64::try_from(seconds).ok()? * 1000);
        }
        return None;
    }

    let target = httpdate::parse_http_date(trimmed).ok()?;
    let now = SystemTime::now();
    let remaining = target.duration_since(now).ok()?;
    if remaining == Duration::ZERO {
        return None;
    }
    Some(u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX))
}
