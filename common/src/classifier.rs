use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magnitude band of the temperature change between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TempChangeCategory {
    #[default]
    Low,
    High,
}

impl TempChangeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for TempChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown temperature change category {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for TempChangeCategory {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "HIGH" => Ok(Self::High),
            _ => Err(UnknownCategory(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub delta: f32,
    pub category: TempChangeCategory,
    pub increasing: bool,
}

/// Classify the change since the previous sample.
///
/// A change of exactly `high_threshold` already counts as HIGH.
pub fn classify(delta: f32, high_threshold: f32) -> Classification {
    let category = if delta.abs() >= high_threshold {
        TempChangeCategory::High
    } else {
        TempChangeCategory::Low
    };

    Classification {
        delta,
        category,
        increasing: delta > 0.0,
    }
}
