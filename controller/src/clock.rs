use tokio::time::Instant;

use hotwater_common::ticks_from_ms;

/// Millisecond tick counter wrapping at [`hotwater_common::TICKS_PERIOD`].
pub trait MonotonicClock: Send + Sync {
    fn ticks_ms(&self) -> u32;
}

/// Ticks since construction, driven by tokio's clock so paused-time tests
/// advance it.
pub struct TokioClock {
    origin: Instant,
    offset_ms: u64,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Start counting at `offset_ms` instead of zero.
    pub fn with_offset(offset_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            offset_ms,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for TokioClock {
    fn ticks_ms(&self) -> u32 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        ticks_from_ms(self.offset_ms.wrapping_add(elapsed))
    }
}
