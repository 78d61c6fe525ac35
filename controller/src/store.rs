//! Persistent key/value configuration document.
//!
//! One JSON object on disk, loaded once at start and written back whole on
//! `save()`. All access runs inside the store's re-entrant lock, so a caller
//! holding [`ConfigStore::lock`] can perform a multi-step update that no other
//! task observes half-applied.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use hotwater_common::{
    as_bool, as_float, as_int, CoerceError, ControlSettings, NominalBand, TempChangeCategory,
    KEY_DELAY_BEFORE_START_1, KEY_DELAY_BEFORE_START_2, KEY_HIGH_RELAY_TIME_MULTIPLIER,
    KEY_HIGH_THRESHOLD_TEMP, KEY_HIGH_UPDATE_TIME_MULTIPLIER, KEY_INIT_RELAY_TIME, KEY_INTERVAL,
    KEY_MANUAL_RELAY_TIME, KEY_NOMINAL_MAX_TEMP, KEY_NOMINAL_MIN_TEMP, KEY_RELAY_TIME,
    KEY_TEMP_CHANGE_CATEGORY, KEY_TEMP_LAST_MEASUREMENT, KEY_TEMP_LAST_MEASUREMENT_TIME,
    KEY_TEMP_SAMPLING_INTERVAL, KEY_TEMP_UPDATE_INTERVAL, KEY_UPDATE_TIME,
};

use crate::rlock::{ReentrantGuard, ReentrantLock};

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct ConfigStore {
    path: PathBuf,
    lock: ReentrantLock,
    doc: Mutex<Document>,
}

impl ConfigStore {
    /// Load the document at `path`, starting empty when it is absent or
    /// unreadable.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("loading configuration from {}", path.display());

        let doc = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<Value>(&raw) {
                Ok(Value::Object(doc)) => doc,
                Ok(other) => {
                    warn!(
                        "configuration {} is not an object ({}); starting empty",
                        path.display(),
                        json_kind(&other)
                    );
                    Document::new()
                }
                Err(err) => {
                    warn!(
                        "configuration {} is corrupt ({err}); starting empty",
                        path.display()
                    );
                    Document::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("configuration {} not found; starting empty", path.display());
                Document::new()
            }
            Err(err) => {
                warn!(
                    "failed to read configuration {} ({err}); starting empty",
                    path.display()
                );
                Document::new()
            }
        };

        Self::with_document(path, doc)
    }

    /// Build a store around an existing document. Ephemeral run state is
    /// reset exactly as on [`ConfigStore::load`].
    pub fn with_document(path: impl Into<PathBuf>, mut doc: Document) -> Self {
        reset_run_state(&mut doc);
        Self {
            path: path.into(),
            lock: ReentrantLock::new(),
            doc: Mutex::new(doc),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hold the store across several operations.
    pub async fn lock(&self) -> ReentrantGuard<'_> {
        self.lock.acquire().await
    }

    pub async fn get(&self, key: &str, default: Value) -> Value {
        let _guard = self.lock.acquire().await;
        self.doc().get(key).cloned().unwrap_or(default)
    }

    pub async fn contains(&self, key: &str) -> bool {
        let _guard = self.lock.acquire().await;
        self.doc().contains_key(key)
    }

    pub async fn get_str(&self, key: &str, default: &str) -> String {
        match self.get(key, Value::Null).await {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => default.to_string(),
        }
    }

    pub async fn get_bool(&self, key: &str, default: bool) -> bool {
        let value = self.get(key, Value::Null).await;
        coerce_or_default(key, &value, as_bool, default)
    }

    pub async fn get_int(&self, key: &str, default: i64) -> i64 {
        let value = self.get(key, Value::Null).await;
        coerce_or_default(key, &value, as_int, default)
    }

    pub async fn get_float(&self, key: &str, default: f64) -> f64 {
        let value = self.get(key, Value::Null).await;
        coerce_or_default(key, &value, as_float, default)
    }

    pub async fn set(&self, key: &str, value: impl Into<Value>) {
        let _guard = self.lock.acquire().await;
        self.doc().insert(key.to_string(), value.into());
    }

    pub async fn get_all(&self) -> Document {
        let _guard = self.lock.acquire().await;
        self.doc().clone()
    }

    /// Write the whole document. The file is replaced atomically, so a crash
    /// mid-save leaves the previous version intact.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.lock.acquire().await;
        let payload = serde_json::to_vec_pretty(&*self.doc())?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, payload)
            .await
            .map_err(|source| StoreError::Io {
                path: staging.clone(),
                source,
            })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        info!("configuration saved to {}", self.path.display());
        Ok(())
    }

    pub async fn nominal_band(&self) -> NominalBand {
        let defaults = NominalBand::default();
        NominalBand::new(
            self.get_float(KEY_NOMINAL_MIN_TEMP, f64::from(defaults.min_c))
                .await as f32,
            self.get_float(KEY_NOMINAL_MAX_TEMP, f64::from(defaults.max_c))
                .await as f32,
        )
    }

    pub async fn temp_change_category(&self) -> TempChangeCategory {
        let raw = self
            .get_str(KEY_TEMP_CHANGE_CATEGORY, TempChangeCategory::Low.as_str())
            .await;
        raw.parse().unwrap_or_else(|err| {
            warn!("{err}; treating as LOW");
            TempChangeCategory::Low
        })
    }

    /// Read every control parameter, falling back to the built-in defaults.
    pub async fn control_settings(&self) -> ControlSettings {
        let _guard = self.lock.acquire().await;
        let d = ControlSettings::default();

        let mut settings = ControlSettings {
            interval_ms: to_u32(self.get_int(KEY_INTERVAL, d.interval_ms.into()).await),
            update_time: to_u32(self.get_int(KEY_UPDATE_TIME, d.update_time.into()).await),
            temp_update_interval: to_u32(
                self.get_int(KEY_TEMP_UPDATE_INTERVAL, d.temp_update_interval.into())
                    .await,
            ),
            temp_sampling_interval_ms: to_u32(
                self.get_int(KEY_TEMP_SAMPLING_INTERVAL, d.temp_sampling_interval_ms.into())
                    .await,
            ),
            relay_time_ms: to_u64(self.get_int(KEY_RELAY_TIME, to_i64(d.relay_time_ms)).await),
            init_relay_time_ms: to_u64(
                self.get_int(KEY_INIT_RELAY_TIME, to_i64(d.init_relay_time_ms))
                    .await,
            ),
            manual_relay_time_ms: to_u64(
                self.get_int(KEY_MANUAL_RELAY_TIME, to_i64(d.manual_relay_time_ms))
                    .await,
            ),
            delay_before_start_1_s: to_u32(
                self.get_int(KEY_DELAY_BEFORE_START_1, d.delay_before_start_1_s.into())
                    .await,
            ),
            delay_before_start_2_s: to_u32(
                self.get_int(KEY_DELAY_BEFORE_START_2, d.delay_before_start_2_s.into())
                    .await,
            ),
            high_threshold_c: self
                .get_float(KEY_HIGH_THRESHOLD_TEMP, f64::from(d.high_threshold_c))
                .await as f32,
            high_relay_time_multiplier: self
                .get_float(KEY_HIGH_RELAY_TIME_MULTIPLIER, d.high_relay_time_multiplier)
                .await,
            high_update_time_multiplier: self
                .get_float(KEY_HIGH_UPDATE_TIME_MULTIPLIER, d.high_update_time_multiplier)
                .await,
            band: self.nominal_band().await,
        };
        settings.sanitize();
        settings
    }

    fn doc(&self) -> MutexGuard<'_, Document> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Keys describing in-memory run state never survive a restart.
fn reset_run_state(doc: &mut Document) {
    doc.insert(KEY_TEMP_LAST_MEASUREMENT.to_string(), Value::from(0));
    doc.insert(KEY_TEMP_LAST_MEASUREMENT_TIME.to_string(), Value::from(0));
    doc.insert(
        KEY_TEMP_CHANGE_CATEGORY.to_string(),
        Value::from(TempChangeCategory::Low.as_str()),
    );
}

fn coerce_or_default<T: std::fmt::Debug>(
    key: &str,
    value: &Value,
    coerce: fn(&Value) -> Result<T, CoerceError>,
    default: T,
) -> T {
    match coerce(value) {
        Ok(converted) => converted,
        Err(CoerceError::Missing) => {
            debug!("config key {key} not set; using {default:?}");
            default
        }
        Err(err) => {
            warn!("config key {key}: {err}; using {default:?}");
            default
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
