//! Wrapping millisecond tick arithmetic.
//!
//! Tick counters wrap at [`TICKS_PERIOD`]; differences are only meaningful
//! for instants less than half a period apart. Raw subtraction across the
//! wrap point yields a huge bogus value, so every elapsed-time comparison in
//! the control loop goes through [`ticks_diff`].

pub const TICKS_PERIOD: u32 = 1 << 30;
pub const TICKS_MAX: u32 = TICKS_PERIOD - 1;
const TICKS_HALF_PERIOD: i64 = (TICKS_PERIOD / 2) as i64;

/// Reduce an arbitrary millisecond count onto the tick ring.
pub fn ticks_from_ms(ms: u64) -> u32 {
    (ms % TICKS_PERIOD as u64) as u32
}

/// Signed distance from `start` to `end`.
///
/// Positive when `end` is after `start`, even if the counter wrapped between
/// the two samples.
pub fn ticks_diff(end: u32, start: u32) -> i64 {
    let raw = (end as i64 - start as i64).rem_euclid(TICKS_PERIOD as i64);
    if raw >= TICKS_HALF_PERIOD {
        raw - TICKS_PERIOD as i64
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_without_wrap() {
        assert_eq!(ticks_diff(1_500, 500), 1_000);
        assert_eq!(ticks_diff(500, 1_500), -1_000);
        assert_eq!(ticks_diff(42, 42), 0);
    }

    #[test]
    fn diff_across_wrap_is_small_and_positive() {
        let before = TICKS_MAX - 9;
        let after = 20;
        assert_eq!(ticks_diff(after, before), 30);
        assert_eq!(ticks_diff(before, after), -30);
    }

    #[test]
    fn from_ms_reduces_onto_ring() {
        assert_eq!(ticks_from_ms(TICKS_PERIOD as u64 + 7), 7);
        assert_eq!(ticks_from_ms(7), 7);
    }
}
