//! Certificate validity windows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The time interval during which a certificate is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl ValidityWindow {
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// Whether the window covers the given instant.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    /// Whether the window covers the current time.
    pub fn covers_now(&self) -> bool {
        self.covers(Utc::now())
    }
}

impl std::fmt::Display for ValidityWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.not_before.format("%Y-%m-%d"),
            self.not_after.format("%Y-%m-%d")
        )
    }
}
