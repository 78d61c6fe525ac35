use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{error, info, warn};

use super::{HardwareError, Pin};
use crate::rlock::ReentrantLock;

/// Per-pin singleton table. Initialization is serialized, so two tasks racing
/// to claim the same unregistered pin end up sharing one instance.
pub struct Registry<T> {
    label: &'static str,
    lock: ReentrantLock,
    entries: Mutex<HashMap<Pin, Arc<T>>>,
}

impl<T> Registry<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            lock: ReentrantLock::new(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, pin: Pin) -> Option<Arc<T>> {
        self.entries().get(&pin).cloned()
    }

    pub fn all(&self) -> Vec<Arc<T>> {
        self.entries().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries().len()
    }

    /// Return the instance for `raw_pin`, running `init` with the validated
    /// pin and the 1-based registration ordinal if none exists yet.
    pub async fn get_or_init<F, Fut>(&self, raw_pin: i64, init: F) -> Result<Arc<T>, HardwareError>
    where
        F: FnOnce(Pin, usize) -> Fut,
        Fut: Future<Output = Result<T, HardwareError>>,
    {
        let pin = Pin::new(raw_pin).inspect_err(|err| {
            error!("{} initialize failed: {err}", self.label);
        })?;

        let _guard = self.lock.acquire().await;
        if let Some(existing) = self.get(pin) {
            warn!("{} on {pin}: using existing instance", self.label);
            return Ok(existing);
        }

        let ordinal = self.len() + 1;
        let resource = match init(pin, ordinal).await {
            Ok(resource) => Arc::new(resource),
            Err(err) => {
                error!("{} on {pin}: initialize failed: {err}", self.label);
                return Err(err);
            }
        };
        self.entries().insert(pin, Arc::clone(&resource));
        info!("{} on {pin}: initialized", self.label);
        Ok(resource)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Pin, Arc<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
