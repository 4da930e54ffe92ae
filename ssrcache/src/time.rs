//! Time-related utility functions.
//!
//! Helpers for turning filesystem timestamps into ages, which is how the
//! reaper decides what is idle.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns how long ago `time` was, measured against `now`.
///
/// Timestamps in the future (clock skew, freshly touched files on a
/// coarse-grained filesystem) count as zero age rather than failing.
///
/// # Example
///
/// ```
/// use std::time::{Duration, SystemTime};
/// use ssrcache::time::age_at;
///
/// let now = SystemTime::now();
/// let earlier = now - Duration::from_secs(90);
/// assert_eq!(age_at(earlier, now), Duration::from_secs(90));
/// ```
pub fn age_at(time: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(time).unwrap_or(Duration::ZERO)
}

/// Returns how long ago `time` was.
pub fn age(time: SystemTime) -> Duration {
    age_at(time, SystemTime::now())
}

/// Converts a whole number of minutes into a `Duration`, saturating at
/// the largest representable number of seconds.
pub fn minutes(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(60))
}

/// Milliseconds since the Unix epoch, saturating at zero for pre-epoch times.
pub fn unix_millis(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_of_past_time() {
        let now = SystemTime::now();
        let past = now - Duration::from_secs(60);
        assert_eq!(age_at(past, now), Duration::from_secs(60));
    }

    #[test]
    fn age_of_future_time_is_zero() {
        let now = SystemTime::now();
        let future = now + Duration::from_secs(60);
        assert_eq!(age_at(future, now), Duration::ZERO);
    }

    #[test]
    fn minutes_conversion() {
        assert_eq!(minutes(0), Duration::ZERO);
        assert_eq!(minutes(3), Duration::from_secs(180));
    }

    #[test]
    fn minutes_saturates() {
        assert_eq!(minutes(u64::MAX), Duration::from_secs(u64::MAX));
        assert_eq!(minutes(u64::MAX / 60 + 1), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn unix_millis_of_epoch() {
        assert_eq!(unix_millis(UNIX_EPOCH), 0);
        assert_eq!(unix_millis(UNIX_EPOCH + Duration::from_millis(1500)), 1500);
    }
}
