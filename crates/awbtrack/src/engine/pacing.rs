use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay between two consecutive rows of a job, in milliseconds.
///
/// Always within [`PacingInterval::MIN_MS`, `PacingInterval::MAX_MS`]; out of
/// range inputs are clamped when the value is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct PacingInterval(u64);

impl PacingInterval {
    pub const MIN_MS: u64 = 50;
    pub const MAX_MS: u64 = 1000;
    pub const DEFAULT_MS: u64 = 100;

    pub fn from_millis(ms: u64) -> Self {
        Self(ms.clamp(Self::MIN_MS, Self::MAX_MS))
    }

    /// Clamps an optional request parameter, falling back to `default`.
    pub fn from_request(ms: Option<u64>, default: PacingInterval) -> Self {
        ms.map(Self::from_millis).unwrap_or(default)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Default for PacingInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_MS)
    }
}

impl From<u64> for PacingInterval {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<PacingInterval> for u64 {
    fn from(interval: PacingInterval) -> Self {
        interval.0
    }
}

impl fmt::Display for PacingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
