use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Interval between heartbeat pings (in seconds).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Ticker for one connection's pings. The first tick fires one full period
/// after connecting.
pub(crate) fn ticker() -> Interval {
    let period = Duration::from_secs(HEARTBEAT_INTERVAL_SECS);
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
