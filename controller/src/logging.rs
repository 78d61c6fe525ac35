//! Tracing setup with a log level that can be changed at runtime.
//!
//! `RUST_LOG`, when set, wins over the stored `log_level` key for the whole
//! process lifetime.

use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{
    filter::LevelFilter, fmt as fmt_layer, layer::SubscriberExt, reload, util::SubscriberInitExt,
    EnvFilter, Registry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Verbose,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level {0:?}")]
pub struct UnknownLogLevel(String);

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
        }
    }

    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(Self::Off),
            "ERROR" => Ok(Self::Error),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "INFO" => Ok(Self::Info),
            "VERBOSE" | "DEBUG" => Ok(Self::Verbose),
            _ => Err(UnknownLogLevel(value.to_string())),
        }
    }
}

/// Level used when the store has no `log_level` key.
pub const DEFAULT_LOG_LEVEL: &str = "INFO";

/// Handle for re-applying the stored log level.
#[derive(Clone)]
pub struct LogControl {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
}

impl LogControl {
    /// A control that ignores level changes, for when no subscriber was
    /// installed or `RUST_LOG` is in charge.
    pub fn detached() -> Self {
        Self { handle: None }
    }

    /// Parse `raw` and switch the active filter to it. Unknown names fall
    /// back to `OFF`.
    pub fn apply(&self, raw: &str) -> LogLevel {
        let level = raw.parse().unwrap_or_else(|err| {
            warn!("{err}; using OFF");
            LogLevel::Off
        });
        if let Some(handle) = &self.handle {
            // Log the change before a more restrictive filter can hide it.
            info!("log level set to {level}");
            let filter = EnvFilter::default().add_directive(level.filter().into());
            if let Err(err) = handle.reload(filter) {
                warn!("failed to apply log level {level}: {err}");
            }
        }
        level
    }
}

/// Install the global subscriber. Until [`LogControl::apply`] runs, events
/// at INFO and above are shown.
pub fn init() -> LogControl {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer::layer())
                .init();
            LogControl::detached()
        }
        Err(_) => {
            let initial = EnvFilter::default().add_directive(LevelFilter::INFO.into());
            let (filter, handle) = reload::Layer::new(initial);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer::layer())
                .init();
            LogControl {
                handle: Some(handle),
            }
        }
    }
}
