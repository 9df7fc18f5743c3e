//! Millisecond-based time helpers.
//!
//! Every timed API in this crate accepts a [`std::time::Duration`]; these
//! helpers keep millisecond construction and logging conversions in one
//! place. `Duration::ZERO` always means "poll immediately", never "no
//! deadline".

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Construct a [`Duration`] from a millisecond count.
///
/// ```
/// use workshard::util::clock::ms;
/// assert_eq!(ms(1500).as_secs(), 1);
/// ```
#[inline]
#[must_use]
pub const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// For logging and event timestamps only; never used for scheduling
/// decisions, which are driven by monotonic waits.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis()
}

/// Milliseconds elapsed since `start` on the monotonic clock.
#[must_use]
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_ms_constructor() {
        assert_eq!(ms(0), Duration::ZERO);
        assert_eq!(ms(250), Duration::from_millis(250));
    }

    #[test]
    fn test_now_ms_monotone_enough() {
        let a = now_ms();
        thread::sleep(ms(5));
        let b = now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_elapsed_ms() {
        let start = Instant::now();
        thread::sleep(ms(10));
        assert!(elapsed_ms(start) >= 10);
    }
}
