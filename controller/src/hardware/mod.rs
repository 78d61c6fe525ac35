//! Relays, temperature sensors and the status LED, one instance per
//! physical pin.
//!
//! Resources are created through [`Hardware`], which owns a registry per
//! resource kind. The actual pin/bus access goes through a
//! [`HardwareBackend`]; the host build uses the simulated backend in
//! [`sim`].

mod led;
mod registry;
mod relay;
mod sensor;
pub mod sim;

use std::{fmt, str::FromStr, sync::Arc};

use thiserror::Error;

pub use led::StatusLed;
pub use registry::Registry;
pub use relay::Relay;
pub use sensor::{TempSensor, HUMIDITY_SENTINEL, TEMP_SENTINEL_C};

use crate::store::ConfigStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pin(u8);

impl Pin {
    /// Validate a pin number read from configuration. Zero means "unset".
    pub fn new(raw: i64) -> Result<Self, HardwareError> {
        match u8::try_from(raw) {
            Ok(number) if number > 0 => Ok(Self(number)),
            _ => Err(HardwareError::InvalidPin(raw)),
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("invalid pin number {0}")]
    InvalidPin(i64),
    #[error("unsupported sensor type {0:?}")]
    UnsupportedSensor(String),
    #[error("no sensor found on {0}")]
    NoDevice(Pin),
    #[error("{0} does not measure humidity")]
    HumidityUnsupported(Pin),
    #[error("bus error on {pin}: {message}")]
    Bus { pin: Pin, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Single-wire sensor with programmable resolution.
    Ds18x20,
    /// Digital temperature/humidity sensor.
    Dht11,
}

impl SensorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ds18x20 => "ds18x20",
            Self::Dht11 => "dht11",
        }
    }

    pub fn supports_resolution(self) -> bool {
        matches!(self, Self::Ds18x20)
    }

    pub fn measures_humidity(self) -> bool {
        matches!(self, Self::Dht11)
    }
}

impl FromStr for SensorKind {
    type Err = HardwareError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ds18x20" | "ds18b20" => Ok(Self::Ds18x20),
            "dht11" => Ok(Self::Dht11),
            _ => Err(HardwareError::UnsupportedSensor(value.to_string())),
        }
    }
}

pub trait OutputPin: Send {
    fn set_level(&mut self, high: bool) -> Result<(), HardwareError>;
    fn is_set_high(&self) -> bool;
}

/// Raw access to one temperature transducer.
pub trait Thermometer: Send {
    fn configure_resolution(&mut self, bits: u8) -> Result<(), HardwareError>;
    /// Kick off a measurement; single-wire sensors need the conversion
    /// latency to elapse before [`Thermometer::read_temperature`].
    fn start_conversion(&mut self) -> Result<(), HardwareError>;
    fn read_temperature(&mut self) -> Result<f32, HardwareError>;
    fn read_humidity(&mut self) -> Result<f32, HardwareError>;
}

pub trait HardwareBackend: Send + Sync {
    fn output_pin(&self, pin: Pin) -> Result<Box<dyn OutputPin>, HardwareError>;
    fn thermometer(
        &self,
        pin: Pin,
        kind: SensorKind,
    ) -> Result<Box<dyn Thermometer>, HardwareError>;
}

pub struct Hardware {
    backend: Arc<dyn HardwareBackend>,
    store: Arc<ConfigStore>,
    relays: Registry<Relay>,
    sensors: Registry<TempSensor>,
    leds: Registry<StatusLed>,
}

impl Hardware {
    pub fn new(backend: Arc<dyn HardwareBackend>, store: Arc<ConfigStore>) -> Self {
        Self {
            backend,
            store,
            relays: Registry::new("relay"),
            sensors: Registry::new("temperature sensor"),
            leds: Registry::new("status LED"),
        }
    }

    /// Claim the relay on `raw_pin`, or return the instance already
    /// registered for it.
    pub async fn init_relay(&self, raw_pin: i64) -> Result<Arc<Relay>, HardwareError> {
        self.relays
            .get_or_init(raw_pin, |pin, _ordinal| async move {
                let output = self.backend.output_pin(pin)?;
                Relay::new(pin, output, Arc::clone(&self.store))
            })
            .await
    }

    pub async fn init_sensor(
        &self,
        raw_pin: i64,
        kind: &str,
        resolution_bits: i64,
    ) -> Result<Arc<TempSensor>, HardwareError> {
        self.sensors
            .get_or_init(raw_pin, |pin, ordinal| async move {
                let kind = kind.parse::<SensorKind>()?;
                let device = self.backend.thermometer(pin, kind)?;
                Ok(TempSensor::new(
                    pin,
                    kind,
                    resolution_bits,
                    ordinal,
                    device,
                    Arc::clone(&self.store),
                ))
            })
            .await
    }

    pub async fn init_led(&self, raw_pin: i64) -> Result<Arc<StatusLed>, HardwareError> {
        self.leds
            .get_or_init(raw_pin, |pin, _ordinal| async move {
                let output = self.backend.output_pin(pin)?;
                StatusLed::new(pin, output, Arc::clone(&self.store)).await
            })
            .await
    }

    pub fn relay(&self, pin: Pin) -> Option<Arc<Relay>> {
        self.relays.get(pin)
    }

    /// The status LED, if one was initialized.
    pub fn led(&self) -> Option<Arc<StatusLed>> {
        self.leds.all().into_iter().next()
    }

    /// Registered sensors in registration order.
    pub fn sensors(&self) -> Vec<Arc<TempSensor>> {
        let mut sensors = self.sensors.all();
        sensors.sort_by_key(|sensor| sensor.ordinal());
        sensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_rejects_zero_negative_and_oversized() {
        assert_eq!(Pin::new(0), Err(HardwareError::InvalidPin(0)));
        assert_eq!(Pin::new(-3), Err(HardwareError::InvalidPin(-3)));
        assert_eq!(Pin::new(300), Err(HardwareError::InvalidPin(300)));
        assert_eq!(Pin::new(15), Ok(Pin(15)));
    }

    #[test]
    fn sensor_kind_parsing() {
        assert_eq!("DS18X20".parse::<SensorKind>(), Ok(SensorKind::Ds18x20));
        assert_eq!("dht11".parse::<SensorKind>(), Ok(SensorKind::Dht11));
        assert_eq!(
            "bme280".parse::<SensorKind>(),
            Err(HardwareError::UnsupportedSensor("bme280".to_string()))
        );
    }
}
