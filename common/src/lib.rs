pub mod band;
pub mod classifier;
pub mod config;
pub mod keys;
pub mod ticks;
pub mod timing;
pub mod types;
pub mod value;

pub use band::{is_plausible, Actuation, NominalBand};
pub use classifier::{classify, Classification, TempChangeCategory};
pub use config::ControlSettings;
pub use keys::*;
pub use ticks::{ticks_diff, ticks_from_ms, TICKS_MAX, TICKS_PERIOD};
pub use timing::{
    check_manual_trigger, clamp_resolution, conversion_latency_ms, format_countdown,
    stop_timer_for, AdaptiveTiming, ManualTriggerRejection,
};
pub use types::{ConfigUpdateResponse, ControllerStatus, ManualTriggerResponse, RestartResponse};
pub use value::{as_bool, as_float, as_int, round_to, CoerceError};
