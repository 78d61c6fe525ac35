//! In-memory hardware for host builds and tests.
//!
//! Every pin handed out shares state with the [`SimBackend`] it came from, so
//! tests can inject readings and faults and inspect relay levels.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{HardwareBackend, HardwareError, OutputPin, Pin, SensorKind, Thermometer};

pub const DEFAULT_TEMPERATURE_C: f32 = 20.0;

#[derive(Default)]
struct SimOutput {
    high: bool,
    transitions: Vec<bool>,
    failing: bool,
}

struct SimReading {
    temp_c: f32,
    humidity: Option<f32>,
    resolution: Option<u8>,
    failing: bool,
    present: bool,
}

struct SimState {
    default_temp_c: f32,
    outputs: HashMap<Pin, SimOutput>,
    readings: HashMap<Pin, SimReading>,
}

impl SimState {
    fn reading(&mut self, pin: Pin) -> &mut SimReading {
        let default_temp_c = self.default_temp_c;
        self.readings.entry(pin).or_insert_with(|| SimReading {
            temp_c: default_temp_c,
            humidity: None,
            resolution: None,
            failing: false,
            present: true,
        })
    }
}

#[derive(Clone)]
pub struct SimBackend {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBackend {
    pub fn new() -> Self {
        Self::with_default_temperature(DEFAULT_TEMPERATURE_C)
    }

    /// Sensors that were never given an explicit reading report `temp_c`.
    pub fn with_default_temperature(temp_c: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                default_temp_c: temp_c,
                outputs: HashMap::new(),
                readings: HashMap::new(),
            })),
        }
    }

    pub fn set_temperature(&self, pin: Pin, temp_c: f32) {
        self.state().reading(pin).temp_c = temp_c;
    }

    pub fn set_humidity(&self, pin: Pin, humidity: f32) {
        self.state().reading(pin).humidity = Some(humidity);
    }

    pub fn fail_sensor(&self, pin: Pin, failing: bool) {
        self.state().reading(pin).failing = failing;
    }

    /// Simulate a disconnected transducer.
    pub fn remove_sensor(&self, pin: Pin) {
        self.state().reading(pin).present = false;
    }

    pub fn fail_output(&self, pin: Pin, failing: bool) {
        self.state().outputs.entry(pin).or_default().failing = failing;
    }

    pub fn level(&self, pin: Pin) -> bool {
        self.state().outputs.get(&pin).is_some_and(|output| output.high)
    }

    /// Every level successfully written to `pin`, in order.
    pub fn transitions(&self, pin: Pin) -> Vec<bool> {
        self.state()
            .outputs
            .get(&pin)
            .map(|output| output.transitions.clone())
            .unwrap_or_default()
    }

    pub fn resolution(&self, pin: Pin) -> Option<u8> {
        self.state().readings.get(&pin).and_then(|reading| reading.resolution)
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(pin: Pin) -> HardwareError {
    HardwareError::Bus {
        pin,
        message: "injected fault".to_string(),
    }
}

impl HardwareBackend for SimBackend {
    fn output_pin(&self, pin: Pin) -> Result<Box<dyn OutputPin>, HardwareError> {
        self.state().outputs.entry(pin).or_default();
        Ok(Box::new(SimOutputPin {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn thermometer(
        &self,
        pin: Pin,
        _kind: SensorKind,
    ) -> Result<Box<dyn Thermometer>, HardwareError> {
        self.state().reading(pin);
        Ok(Box::new(SimThermometer {
            pin,
            state: Arc::clone(&self.state),
        }))
    }
}

struct SimOutputPin {
    pin: Pin,
    state: Arc<Mutex<SimState>>,
}

impl OutputPin for SimOutputPin {
    fn set_level(&mut self, high: bool) -> Result<(), HardwareError> {
        let mut state = lock(&self.state);
        let output = state.outputs.entry(self.pin).or_default();
        if output.failing {
            return Err(injected(self.pin));
        }
        output.high = high;
        output.transitions.push(high);
        Ok(())
    }

    fn is_set_high(&self) -> bool {
        lock(&self.state)
            .outputs
            .get(&self.pin)
            .is_some_and(|output| output.high)
    }
}

struct SimThermometer {
    pin: Pin,
    state: Arc<Mutex<SimState>>,
}

impl SimThermometer {
    fn with_reading<T>(&self, read: impl FnOnce(&mut SimReading) -> T) -> Result<T, HardwareError> {
        let mut state = lock(&self.state);
        let reading = state.reading(self.pin);
        if !reading.present {
            return Err(HardwareError::NoDevice(self.pin));
        }
        if reading.failing {
            return Err(injected(self.pin));
        }
        Ok(read(reading))
    }
}

impl Thermometer for SimThermometer {
    fn configure_resolution(&mut self, bits: u8) -> Result<(), HardwareError> {
        self.with_reading(|reading| reading.resolution = Some(bits))
    }

    fn start_conversion(&mut self) -> Result<(), HardwareError> {
        self.with_reading(|_| ())
    }

    fn read_temperature(&mut self) -> Result<f32, HardwareError> {
        self.with_reading(|reading| reading.temp_c)
    }

    fn read_humidity(&mut self) -> Result<f32, HardwareError> {
        self.with_reading(|reading| reading.humidity)?
            .ok_or_else(|| HardwareError::HumidityUnsupported(self.pin))
    }
}
