use serde::{Deserialize, Serialize};

/// Readings outside `(MIN_PLAUSIBLE_TEMP_C, MAX_PLAUSIBLE_TEMP_C]` are treated
/// as a sensor fault, never as a real water temperature.
pub const MIN_PLAUSIBLE_TEMP_C: f32 = 0.0;
pub const MAX_PLAUSIBLE_TEMP_C: f32 = 120.0;

pub fn is_plausible(temp_c: f32) -> bool {
    temp_c.is_finite() && temp_c > MIN_PLAUSIBLE_TEMP_C && temp_c <= MAX_PLAUSIBLE_TEMP_C
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actuation {
    /// Water too cold: drive the close relay.
    Close,
    /// Water too hot: drive the open relay.
    Open,
    Idle,
    SensorFault,
}

impl Actuation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Close => "CLOSE",
            Self::Open => "OPEN",
            Self::Idle => "IDLE",
            Self::SensorFault => "SENSOR_FAULT",
        }
    }

    /// Text shown on the bottom display row.
    pub fn display_text(self) -> &'static str {
        match self {
            Self::Close => "closing valve    >>>",
            Self::Open => "opening valve    >>>",
            Self::Idle => "target temp reached",
            Self::SensorFault => "error: temp fault!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NominalBand {
    #[serde(rename = "minTemp")]
    pub min_c: f32,
    #[serde(rename = "maxTemp")]
    pub max_c: f32,
}

impl Default for NominalBand {
    fn default() -> Self {
        Self {
            min_c: 42.0,
            max_c: 57.0,
        }
    }
}

impl NominalBand {
    /// Build a band clamped into the plausible range with `max >= min`.
    pub fn new(min_c: f32, max_c: f32) -> Self {
        let mut band = Self { min_c, max_c };
        band.sanitize();
        band
    }

    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.min_c.is_finite() {
            self.min_c = defaults.min_c;
        }
        if !self.max_c.is_finite() {
            self.max_c = defaults.max_c;
        }
        self.min_c = self.min_c.clamp(MIN_PLAUSIBLE_TEMP_C, MAX_PLAUSIBLE_TEMP_C);
        self.max_c = self.max_c.clamp(self.min_c, MAX_PLAUSIBLE_TEMP_C);
    }

    pub fn decide(&self, reading: Option<f32>) -> Actuation {
        match reading {
            Some(temp_c) if is_plausible(temp_c) => {
                if temp_c < self.min_c {
                    Actuation::Close
                } else if temp_c > self.max_c {
                    Actuation::Open
                } else {
                    Actuation::Idle
                }
            }
            _ => Actuation::SensorFault,
        }
    }

    pub fn label(&self) -> String {
        format!("{:.1} - {:.1} °C", self.min_c, self.max_c)
    }
}
