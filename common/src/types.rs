use serde::Serialize;

use crate::{
    band::{Actuation, NominalBand},
    classifier::TempChangeCategory,
};

/// Snapshot served by the management endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub display: Vec<String>,
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f32>,
    #[serde(rename = "currentTemp2")]
    pub current_temp_2: Option<f32>,
    #[serde(rename = "nominalBand")]
    pub nominal_band: NominalBand,
    pub category: TempChangeCategory,
    #[serde(rename = "tempIncreasing")]
    pub temp_increasing: bool,
    #[serde(rename = "timerSecs")]
    pub timer_secs: i64,
    #[serde(rename = "bootNormal")]
    pub boot_normal: bool,
    #[serde(rename = "lastActuation")]
    pub last_actuation: Option<Actuation>,
    pub backlight: bool,
    /// `None` when no status LED is configured.
    pub led: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigUpdateResponse {
    pub updated: Vec<String>,
    pub rejected: Vec<String>,
    pub saved: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualTriggerResponse {
    pub relay: &'static str,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestartResponse {
    #[serde(rename = "bootNormal")]
    pub boot_normal: bool,
    #[serde(rename = "restartScheduled")]
    pub restart_scheduled: bool,
}
