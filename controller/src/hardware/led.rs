use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hotwater_common::KEY_LED;
use tracing::{error, info};

use super::{HardwareError, OutputPin, Pin};
use crate::{rlock::ReentrantLock, store::ConfigStore};

/// Status LED whose level is mirrored to the `LED` key.
pub struct StatusLed {
    pin: Pin,
    output: Mutex<Box<dyn OutputPin>>,
    lock: ReentrantLock,
    store: Arc<ConfigStore>,
}

impl StatusLed {
    /// Take over `output` and drive it to the stored level (on when unset).
    pub(super) async fn new(
        pin: Pin,
        mut output: Box<dyn OutputPin>,
        store: Arc<ConfigStore>,
    ) -> Result<Self, HardwareError> {
        let on = store.get_bool(KEY_LED, true).await;
        output.set_level(on)?;
        info!("status LED on {pin}: {}", if on { "on" } else { "off" });
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

    pub fn is_on(&self) -> bool {
        self.output().is_set_high()
    }

    /// Switch the LED and record the new level in the store.
    pub async fn set(&self, on: bool) -> Result<(), HardwareError> {
        let _guard = self.lock.acquire().await;
        self.output().set_level(on).inspect_err(|err| {
            error!("status LED on {}: set level failed: {err}", self.pin);
        })?;
        self.store.set(KEY_LED, on).await;
        info!("status LED on {}: {}", self.pin, if on { "on" } else { "off" });
        Ok(())
    }

    fn output(&self) -> MutexGuard<'_, Box<dyn OutputPin>> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
