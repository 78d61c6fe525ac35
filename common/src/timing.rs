use thiserror::Error;

use crate::{band::is_plausible, classifier::TempChangeCategory};

pub const MIN_RESOLUTION_BITS: u8 = 9;
pub const MAX_RESOLUTION_BITS: u8 = 12;
const FULL_RESOLUTION_CONVERSION_MS: u64 = 750;

pub const MANUAL_RELAY_TIME_MAX_MS: u64 = 10_000;
pub const MANUAL_TRIGGER_BUFFER_S: f64 = 3.0;

/// Base timings plus the HIGH-band multipliers applied while the temperature
/// is rising.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveTiming {
    pub relay_time_ms: u64,
    pub update_time: u32,
    pub high_relay_time_multiplier: f64,
    pub high_update_time_multiplier: f64,
}

impl AdaptiveTiming {
    pub fn relay_time_for(&self, category: TempChangeCategory, increasing: bool) -> u64 {
        if !increasing {
            return self.relay_time_ms;
        }
        let multiplier = match category {
            TempChangeCategory::High => self.high_relay_time_multiplier,
            TempChangeCategory::Low => 1.0,
        };
        scale(self.relay_time_ms, multiplier)
    }

    pub fn update_time_for(&self, category: TempChangeCategory, increasing: bool) -> u32 {
        if !increasing {
            return self.update_time;
        }
        let multiplier = match category {
            TempChangeCategory::High => self.high_update_time_multiplier,
            TempChangeCategory::Low => 1.0,
        };
        scale(u64::from(self.update_time), multiplier).min(u64::from(u32::MAX)) as u32
    }
}

/// Multiply and truncate toward zero; negative or non-finite products give 0.
fn scale(base: u64, multiplier: f64) -> u64 {
    let product = base as f64 * multiplier;
    if product.is_finite() && product > 0.0 {
        product as u64
    } else {
        0
    }
}

/// Whole seconds a countdown stays suspended after a relay pulse of
/// `relay_ms`.
pub fn stop_timer_for(relay_ms: u64) -> u32 {
    (relay_ms / 1000 + 1).min(u64::from(u32::MAX)) as u32
}

pub fn clamp_resolution(bits: i64) -> u8 {
    bits.clamp(
        i64::from(MIN_RESOLUTION_BITS),
        i64::from(MAX_RESOLUTION_BITS),
    ) as u8
}

/// Conversion time of a single-wire sensor at the given resolution.
///
/// | bits | step     | wait      |
/// |------|----------|-----------|
/// | 9    | 0.5 °C   | 93 ms     |
/// | 10   | 0.25 °C  | 187 ms    |
/// | 11   | 0.125 °C | 375 ms    |
/// | 12   | 0.0625 °C| 750 ms    |
pub fn conversion_latency_ms(resolution_bits: u8) -> u64 {
    let bits = resolution_bits.clamp(MIN_RESOLUTION_BITS, MAX_RESOLUTION_BITS);
    FULL_RESOLUTION_CONVERSION_MS >> (MAX_RESOLUTION_BITS - bits)
}

pub fn format_countdown(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{hours:02}h {mins:02}m {secs:02}s")
    } else {
        format!("{mins:02}m {secs:02}s")
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManualTriggerRejection {
    #[error("timer is too close to zero ({timer_s}s left, need more than {buffer_s}s)")]
    TimerTooCloseToZero { timer_s: i64, buffer_s: f64 },
    #[error("temperature reading is not plausible")]
    TemperatureFault,
}

/// Validate a manual relay pulse requested from the management endpoint.
///
/// Returns the duration to use, clamped to [`MANUAL_RELAY_TIME_MAX_MS`].
pub fn check_manual_trigger(
    requested_ms: i64,
    timer_s: i64,
    reading: Option<f32>,
) -> Result<u64, ManualTriggerRejection> {
    let duration_ms = requested_ms.clamp(0, MANUAL_RELAY_TIME_MAX_MS as i64) as u64;
    let buffer_s = duration_ms as f64 / 1000.0 + MANUAL_TRIGGER_BUFFER_S;

    if timer_s as f64 <= buffer_s {
        return Err(ManualTriggerRejection::TimerTooCloseToZero { timer_s, buffer_s });
    }

    match reading {
        Some(temp_c) if is_plausible(temp_c) => Ok(duration_ms),
        _ => Err(ManualTriggerRejection::TemperatureFault),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> AdaptiveTiming {
        AdaptiveTiming {
            relay_time_ms: 1_200,
            update_time: 120,
            high_relay_time_multiplier: 1.5,
            high_update_time_multiplier: 0.5,
        }
    }

    #[test]
    fn rising_fast_scales_both_timers() {
        let timing = timing();
        assert_eq!(timing.relay_time_for(TempChangeCategory::High, true), 1_800);
        assert_eq!(timing.update_time_for(TempChangeCategory::High, true), 60);
    }

    #[test]
    fn falling_or_slow_changes_keep_base_values() {
        let timing = timing();
        assert_eq!(timing.relay_time_for(TempChangeCategory::High, false), 1_200);
        assert_eq!(timing.update_time_for(TempChangeCategory::High, false), 120);
        assert_eq!(timing.relay_time_for(TempChangeCategory::Low, true), 1_200);
        assert_eq!(timing.update_time_for(TempChangeCategory::Low, true), 120);
    }

    #[test]
    fn scaled_values_truncate() {
        let timing = AdaptiveTiming {
            relay_time_ms: 1_001,
            update_time: 7,
            high_relay_time_multiplier: 1.5,
            high_update_time_multiplier: 0.5,
        };
        assert_eq!(timing.relay_time_for(TempChangeCategory::High, true), 1_501);
        assert_eq!(timing.update_time_for(TempChangeCategory::High, true), 3);
    }

    #[test]
    fn negative_multiplier_floors_at_zero() {
        let timing = AdaptiveTiming {
            high_relay_time_multiplier: -2.0,
            ..timing()
        };
        assert_eq!(timing.relay_time_for(TempChangeCategory::High, true), 0);
    }

    #[test]
    fn stop_timer_rounds_down_and_adds_one() {
        assert_eq!(stop_timer_for(1_200), 2);
        assert_eq!(stop_timer_for(999), 1);
        assert_eq!(stop_timer_for(0), 1);
    }

    #[test]
    fn conversion_latency_by_resolution() {
        assert_eq!(conversion_latency_ms(9), 93);
        assert_eq!(conversion_latency_ms(10), 187);
        assert_eq!(conversion_latency_ms(11), 375);
        assert_eq!(conversion_latency_ms(12), 750);
        assert_eq!(conversion_latency_ms(3), 93);
        assert_eq!(clamp_resolution(16), 12);
        assert_eq!(clamp_resolution(-1), 9);
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(75), "01m 15s");
        assert_eq!(format_countdown(3_725), "01h 02m 05s");
        assert_eq!(format_countdown(0), "00m 00s");
    }

    #[test]
    fn manual_trigger_guards() {
        assert_eq!(check_manual_trigger(1_200, 60, Some(50.0)), Ok(1_200));
        assert_eq!(check_manual_trigger(50_000, 60, Some(50.0)), Ok(10_000));
        assert!(matches!(
            check_manual_trigger(1_200, 4, Some(50.0)),
            Err(ManualTriggerRejection::TimerTooCloseToZero { .. })
        ));
        assert_eq!(
            check_manual_trigger(1_200, 60, Some(-127.0)),
            Err(ManualTriggerRejection::TemperatureFault)
        );
        assert_eq!(
            check_manual_trigger(1_200, 60, None),
            Err(ManualTriggerRejection::TemperatureFault)
        );
    }
}
