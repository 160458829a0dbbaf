//! Time sources for issuance and expiry checks.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Duration;
use docshare_core::Timestamp;

/// Source of the current UTC time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A manually driven clock with whole-second resolution.
///
/// Shared by reference between an issuer and a test so the test can move
/// time forward without sleeping.
#[derive(Debug)]
pub struct FixedClock {
    unix_seconds: AtomicI64,
}

impl FixedClock {
    /// Start the clock at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            unix_seconds: AtomicI64::new(start.unix_seconds()),
        }
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let delta = by.num_seconds();
        let _ = self
            .unix_seconds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(delta))
            });
    }

    /// Jump to a specific instant.
    pub fn set(&self, to: Timestamp) {
        self.unix_seconds.store(to.unix_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        let secs = self.unix_seconds.load(Ordering::SeqCst);
        Timestamp::from_unix_seconds(secs).unwrap_or_else(|_| Timestamp::now())
    }
}
