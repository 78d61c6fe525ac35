use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use hotwater_common::{
    clamp_resolution, conversion_latency_ms, round_to, sensor_key, KEY_CURRENT_HUMIDITY,
    KEY_CURRENT_TEMP,
};
use tracing::{debug, error, info};

use super::{HardwareError, Pin, SensorKind, Thermometer};
use crate::{rlock::ReentrantLock, store::ConfigStore};

/// Written to the sensor's store key when a temperature read fails.
pub const TEMP_SENTINEL_C: f64 = -127.0;
/// Written to the sensor's store key when a humidity read fails.
pub const HUMIDITY_SENTINEL: f64 = -1.0;

pub struct TempSensor {
    pin: Pin,
    kind: SensorKind,
    resolution_bits: u8,
    ordinal: usize,
    device: Mutex<Box<dyn Thermometer>>,
    lock: ReentrantLock,
    store: Arc<ConfigStore>,
}

impl TempSensor {
    pub(super) fn new(
        pin: Pin,
        kind: SensorKind,
        resolution_bits: i64,
        ordinal: usize,
        mut device: Box<dyn Thermometer>,
        store: Arc<ConfigStore>,
    ) -> Self {
        let resolution_bits = clamp_resolution(resolution_bits);
        if kind.supports_resolution() {
            // A device that rejects the setting keeps measuring at its power-on resolution.
            match device.configure_resolution(resolution_bits) {
                Ok(()) => info!("sensor on {pin}: resolution set to {resolution_bits} bit"),
                Err(err) => error!("sensor on {pin}: set resolution failed: {err}"),
            }
        }
        Self {
            pin,
            kind,
            resolution_bits,
            ordinal,
            device: Mutex::new(device),
            lock: ReentrantLock::new(),
            store,
        }
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn resolution_bits(&self) -> u8 {
        self.resolution_bits
    }

    /// 1-based registration order; the first sensor owns the unsuffixed keys.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn temperature_key(&self) -> String {
        sensor_key(KEY_CURRENT_TEMP, self.ordinal)
    }

    pub fn humidity_key(&self) -> String {
        sensor_key(KEY_CURRENT_HUMIDITY, self.ordinal)
    }

    /// Measure and publish the temperature rounded to 0.1 °C. On failure the
    /// sentinel is published instead and `None` is returned.
    pub async fn get_temperature(&self) -> Option<f32> {
        let _guard = self.lock.acquire().await;
        let key = self.temperature_key();
        match self.measure().await {
            Ok(temp_c) => {
                let rounded = round_to(f64::from(temp_c), 1);
                self.store.set(&key, rounded).await;
                debug!("sensor on {}: temp = {rounded}°C", self.pin);
                Some(rounded as f32)
            }
            Err(err) => {
                self.store.set(&key, TEMP_SENTINEL_C).await;
                error!("sensor on {}: read temperature failed: {err}", self.pin);
                None
            }
        }
    }

    /// Relative humidity from the most recent measurement, rounded to a whole
    /// number. Devices without a humidity channel publish the sentinel.
    pub async fn get_humidity(&self) -> Option<f32> {
        let _guard = self.lock.acquire().await;
        let key = self.humidity_key();
        let reading = if self.kind.measures_humidity() {
            self.device().read_humidity()
        } else {
            Err(HardwareError::HumidityUnsupported(self.pin))
        };
        match reading {
            Ok(humidity) => {
                let rounded = f64::from(humidity).round();
                self.store.set(&key, rounded).await;
                debug!("sensor on {}: humidity = {rounded}%", self.pin);
                Some(rounded as f32)
            }
            Err(err) => {
                self.store.set(&key, HUMIDITY_SENTINEL).await;
                error!("sensor on {}: read humidity failed: {err}", self.pin);
                None
            }
        }
    }

    async fn measure(&self) -> Result<f32, HardwareError> {
        self.device().start_conversion()?;
        if self.kind.supports_resolution() {
            let latency = conversion_latency_ms(self.resolution_bits);
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let temp_c = self.device().read_temperature()?;
        if temp_c.is_finite() {
            Ok(temp_c)
        } else {
            Err(HardwareError::Bus {
                pin: self.pin,
                message: format!("non-finite reading {temp_c}"),
            })
        }
    }

    fn device(&self) -> MutexGuard<'_, Box<dyn Thermometer>> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};

    use super::*;
    use crate::hardware::{sim::SimBackend, HardwareBackend};

    fn sensor(
        sim: &SimBackend,
        raw_pin: i64,
        kind: SensorKind,
        bits: i64,
        ordinal: usize,
    ) -> (TempSensor, Arc<ConfigStore>) {
        let store = Arc::new(ConfigStore::with_document("unused.json", Map::new()));
        let pin = Pin::new(raw_pin).unwrap();
        let device = sim.thermometer(pin, kind).unwrap();
        let sensor = TempSensor::new(pin, kind, bits, ordinal, device, Arc::clone(&store));
        (sensor, store)
    }

    #[tokio::test(start_paused = true)]
    async fn reading_is_rounded_and_published() {
        let sim = SimBackend::new();
        sim.set_temperature(Pin::new(4).unwrap(), 48.26);
        let (sensor, store) = sensor(&sim, 4, SensorKind::Ds18x20, 11, 1);

        assert_eq!(sensor.get_temperature().await, Some(48.3));
        assert_eq!(store.get(KEY_CURRENT_TEMP, json!(null)).await, json!(48.3));
    }

    #[tokio::test(start_paused = true)]
    async fn conversion_waits_for_resolution_latency() {
        let sim = SimBackend::new();
        let pin = Pin::new(4).unwrap();
        sim.set_temperature(pin, 40.0);
        let (sensor, _store) = sensor(&sim, 4, SensorKind::Ds18x20, 9, 1);
        assert_eq!(sim.resolution(pin), Some(9));

        let started = tokio::time::Instant::now();
        sensor.get_temperature().await;
        assert_eq!(started.elapsed(), Duration::from_millis(93));
    }

    #[tokio::test(start_paused = true)]
    async fn resolution_is_clamped() {
        let sim = SimBackend::new();
        let (sensor, _store) = sensor(&sim, 4, SensorKind::Ds18x20, 20, 1);
        assert_eq!(sensor.resolution_bits(), 12);
        assert_eq!(sim.resolution(sensor.pin()), Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_read_publishes_sentinel() {
        let sim = SimBackend::new();
        let (sensor, store) = sensor(&sim, 5, SensorKind::Ds18x20, 11, 2);
        sim.fail_sensor(sensor.pin(), true);

        assert_eq!(sensor.get_temperature().await, None);
        assert_eq!(store.get("current_temp_2", json!(null)).await, json!(-127.0));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_device_publishes_sentinel() {
        let sim = SimBackend::new();
        let (sensor, store) = sensor(&sim, 5, SensorKind::Ds18x20, 11, 1);
        sim.remove_sensor(sensor.pin());

        assert_eq!(sensor.get_temperature().await, None);
        assert_eq!(store.get(KEY_CURRENT_TEMP, json!(null)).await, json!(-127.0));
    }

    #[tokio::test(start_paused = true)]
    async fn humidity_only_on_dht() {
        let sim = SimBackend::new();
        let dht_pin = Pin::new(6).unwrap();
        sim.set_humidity(dht_pin, 55.4);
        let (dht, dht_store) = sensor(&sim, 6, SensorKind::Dht11, 11, 1);
        assert_eq!(dht.get_humidity().await, Some(55.0));
        assert_eq!(dht_store.get(KEY_CURRENT_HUMIDITY, json!(null)).await, json!(55.0));

        let (ds18, ds18_store) = sensor(&sim, 7, SensorKind::Ds18x20, 11, 1);
        assert_eq!(ds18.get_humidity().await, None);
        assert_eq!(ds18_store.get(KEY_CURRENT_HUMIDITY, json!(null)).await, json!(-1.0));
    }
}
