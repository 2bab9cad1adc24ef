//! Recency stamps and clocks.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A recency instant in epoch milliseconds.
///
/// [`Stamp::NEVER`] marks something that has never been focused; it sorts
/// before every real instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stamp(pub i64);

impl Stamp {
    /// Sentinel for "never active".
    pub const NEVER: Stamp = Stamp(0);

    pub fn is_never(self) -> bool {
        self == Stamp::NEVER
    }

    /// Convert to a UTC datetime, `None` for the sentinel.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_never() {
            return None;
        }
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// Milliseconds elapsed since `earlier`, saturating at zero.
    pub fn millis_since(self, earlier: Stamp) -> u64 {
        self.0.saturating_sub(earlier.0).max(0) as u64
    }
}

impl From<DateTime<Utc>> for Stamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Stamp(dt.timestamp_millis())
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => f.write_str("never"),
        }
    }
}

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> Stamp;

    /// Current instant as a datetime.
    fn now_utc(&self) -> DateTime<Utc> {
        self.now().to_datetime().unwrap_or_else(Utc::now)
    }
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Stamp {
        Stamp::from(Utc::now())
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock starting at `millis`.
    pub fn starting_at(millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Move the clock to an absolute instant.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Stamp {
        Stamp(self.millis.load(Ordering::SeqCst))
    }
}
