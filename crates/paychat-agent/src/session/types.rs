//! Session outcome types and the upgrade-in-flight guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::ClientError;

/// What a `send`, `approve` or `deny` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Reply appended.
    Completed,
    /// Apology appended; the cause is on the error field.
    Failed,
    /// Another turn was in flight, or the input was empty. Nothing changed.
    Ignored,
    /// Rejected locally before any request was issued.
    Refused,
}

/// A 429 the user should see, with a countdown when the backend gave one.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitNotice {
    pub reason: String,
    pub retry_after_secs: Option<u64>,
    pub issued_at: Instant,
}

impl RateLimitNotice {
    pub fn new(
        reason: impl Into<String>,
        retry_after_secs: Option<u64>,
        issued_at: Instant,
    ) -> Self {
        Self {
            reason: reason.into(),
            retry_after_secs,
            issued_at,
        }
    }

    /// Time left before a retry is worth attempting. `None` when unknown.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let total = Duration::from_secs(self.retry_after_secs?);
        Some(total.saturating_sub(now.saturating_duration_since(self.issued_at)))
    }

    pub fn expired(&self, now: Instant) -> bool {
        self.remaining(now).is_some_and(|left| left.is_zero())
    }
}

/// The error field: display text plus the classified cause.
#[derive(Debug, Clone)]
pub(crate) struct Surfaced {
    pub(crate) message: String,
    pub(crate) cause: ClientError,
}

/// Clears the flag on drop.
pub(crate) struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    /// `None` if the flag is already raised.
    pub(crate) fn raise(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_runs_down_to_zero() {
        let t0 = Instant::now();
        let notice = RateLimitNotice::new("daily cap reached", Some(30), t0);

        assert_eq!(notice.remaining(t0), Some(Duration::from_secs(30)));
        assert_eq!(
            notice.remaining(t0 + Duration::from_secs(12)),
            Some(Duration::from_secs(18))
        );
        assert!(!notice.expired(t0 + Duration::from_secs(29)));
        assert_eq!(
            notice.remaining(t0 + Duration::from_secs(45)),
            Some(Duration::ZERO)
        );
        assert!(notice.expired(t0 + Duration::from_secs(45)));
    }

    #[test]
    fn no_retry_after_means_no_countdown() {
        let notice = RateLimitNotice::new("slow down", None, Instant::now());
        assert_eq!(notice.remaining(Instant::now()), None);
        assert!(!notice.expired(Instant::now()));
    }

    #[test]
    fn flag_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = FlagGuard::raise(&flag);
        assert!(guard.is_some());
        assert!(FlagGuard::raise(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
    }
}
