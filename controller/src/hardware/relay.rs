use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use hotwater_common::KEY_RELAY_TIME;
use tracing::{debug, error, info};

use super::{HardwareError, OutputPin, Pin};
use crate::{rlock::ReentrantLock, store::ConfigStore};

const DEFAULT_RELAY_TIME_MS: i64 = 1200;

pub struct Relay {
    pin: Pin,
    output: Mutex<Box<dyn OutputPin>>,
    lock: ReentrantLock,
    store: Arc<ConfigStore>,
}

impl Relay {
    /// Take over `output` and drive it low so the relay starts de-energized.
    pub(super) fn new(
        pin: Pin,
        mut output: Box<dyn OutputPin>,
        store: Arc<ConfigStore>,
    ) -> Result<Self, HardwareError> {
        output.set_level(false)?;
        Ok(Self {
            pin,
            output: Mutex::new(output),
            lock: ReentrantLock::new(),
            store,
        })
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn is_active(&self) -> bool {
        self.output().is_set_high()
    }

    pub async fn activate(&self) -> Result<(), HardwareError> {
        let _guard = self.lock.acquire().await;
        self.drive(true)?;
        debug!("relay on {}: activated", self.pin);
        Ok(())
    }

    pub async fn deactivate(&self) -> Result<(), HardwareError> {
        let _guard = self.lock.acquire().await;
        self.drive(false)?;
        debug!("relay on {}: deactivated", self.pin);
        Ok(())
    }

    /// Energize for `relay_time_ms` (or the configured `relay_time`), then
    /// de-energize. The coil is driven low on every exit path, including
    /// cancellation of the returned future.
    pub async fn toggle(&self, relay_time_ms: Option<u64>) -> Result<(), HardwareError> {
        let _guard = self.lock.acquire().await;
        let relay_time_ms = match relay_time_ms {
            Some(ms) => ms,
            None => {
                let ms = self.store.get_int(KEY_RELAY_TIME, DEFAULT_RELAY_TIME_MS).await;
                u64::try_from(ms).unwrap_or(0)
            }
        };

        info!("relay on {}: toggle for {relay_time_ms} ms", self.pin);
        let mut failsafe = DeenergizeOnDrop {
            relay: self,
            armed: true,
        };
        self.activate().await?;
        tokio::time::sleep(Duration::from_millis(relay_time_ms)).await;
        self.deactivate().await?;
        failsafe.armed = false;
        Ok(())
    }

    fn drive(&self, high: bool) -> Result<(), HardwareError> {
        self.output().set_level(high).inspect_err(|err| {
            error!("relay on {}: set level failed: {err}", self.pin);
        })
    }

    fn output(&self) -> MutexGuard<'_, Box<dyn OutputPin>> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct DeenergizeOnDrop<'a> {
    relay: &'a Relay,
    armed: bool,
}

impl Drop for DeenergizeOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed && self.relay.drive(false).is_ok() {
            info!("relay on {}: de-energized after interrupted toggle", self.relay.pin);
        }
    }
}
