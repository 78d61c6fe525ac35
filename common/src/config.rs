use crate::{band::NominalBand, timing::AdaptiveTiming};

/// Typed view of the control parameters held in the configuration store.
///
/// The store remains the source of truth; this struct supplies the defaults
/// used when a key is absent and the sanitizing rules applied after reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSettings {
    /// Minimum gap between two coarse cycles.
    pub interval_ms: u32,
    /// Cycles counted down between two re-evaluations.
    pub update_time: u32,
    /// Refresh all sensors every Nth countdown cycle.
    pub temp_update_interval: u32,
    pub temp_sampling_interval_ms: u32,
    pub relay_time_ms: u64,
    pub init_relay_time_ms: u64,
    pub manual_relay_time_ms: u64,
    pub delay_before_start_1_s: u32,
    pub delay_before_start_2_s: u32,
    pub high_threshold_c: f32,
    pub high_relay_time_multiplier: f64,
    pub high_update_time_multiplier: f64,
    pub band: NominalBand,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            interval_ms: 930,
            update_time: 120,
            temp_update_interval: 5,
            temp_sampling_interval_ms: 10_000,
            relay_time_ms: 1_200,
            init_relay_time_ms: 6_000,
            manual_relay_time_ms: 1_200,
            delay_before_start_1_s: 0,
            delay_before_start_2_s: 0,
            high_threshold_c: 1.0,
            high_relay_time_multiplier: 1.5,
            high_update_time_multiplier: 0.5,
            band: NominalBand::default(),
        }
    }
}

impl ControlSettings {
    pub fn sanitize(&mut self) {
        self.temp_update_interval = self.temp_update_interval.max(1);
        if !self.high_threshold_c.is_finite() || self.high_threshold_c < 0.0 {
            self.high_threshold_c = Self::default().high_threshold_c;
        }
        if !self.high_relay_time_multiplier.is_finite() || self.high_relay_time_multiplier < 0.0 {
            self.high_relay_time_multiplier = Self::default().high_relay_time_multiplier;
        }
        if !self.high_update_time_multiplier.is_finite() || self.high_update_time_multiplier < 0.0
        {
            self.high_update_time_multiplier = Self::default().high_update_time_multiplier;
        }
        self.band.sanitize();
    }

    pub fn adaptive_timing(&self) -> AdaptiveTiming {
        AdaptiveTiming {
            relay_time_ms: self.relay_time_ms,
            update_time: self.update_time,
            high_relay_time_multiplier: self.high_relay_time_multiplier,
            high_update_time_multiplier: self.high_update_time_multiplier,
        }
    }
}
