//! Boot sequence and crash recovery.
//!
//! A clean boot (`boot_normal` set) primes the valve train: two start delays
//! around an initial pulse of the open relay. When the control task fails,
//! the supervisor clears `boot_normal`, records the fault and reboots, so the
//! next boot goes straight to regulation without priming again.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use hotwater_common::{
    sensor_key, KEY_BOOT_NORMAL, KEY_CURRENT_TEMP, KEY_LCD_BACKLIGHT, KEY_LED, KEY_LED_PIN,
    KEY_RELAY_CLOSE_PIN, KEY_RELAY_OPEN_PIN,
    KEY_TEMP_LAST_MEASUREMENT, KEY_TEMP_LAST_MEASUREMENT_TIME, KEY_TEMP_SENSOR_2_PIN,
    KEY_TEMP_SENSOR_2_RESOLUTION, KEY_TEMP_SENSOR_2_TYPE, KEY_TEMP_SENSOR_PIN,
    KEY_TEMP_SENSOR_RESOLUTION, KEY_TEMP_SENSOR_TYPE,
};

use crate::{
    hardware::{Relay, TEMP_SENTINEL_C},
    scheduler::{print_nominal_band, ControlContext, ControlError, Controller, ValveRelays},
};

pub const FAULT_LOG_MAX_LINES: usize = 1024;
/// Exit status asking the service manager for a restart.
pub const RESTART_EXIT_CODE: i32 = 75;
const DEFAULT_SENSOR_TYPE: &str = "ds18x20";
const DEFAULT_RESOLUTION_BITS: i64 = 11;

/// Hard reset of the controller.
pub trait Reboot: Send + Sync {
    fn reboot(&self);
}

/// Host reboot: terminate the process and let the service manager start it
/// again.
pub struct ProcessRestart;

impl Reboot for ProcessRestart {
    fn reboot(&self) {
        warn!("restarting controller process");
        std::process::exit(RESTART_EXIT_CODE);
    }
}

/// Append-only record of crashes, trimmed to the most recent lines.
pub struct FaultLog {
    path: PathBuf,
    max_lines: usize,
}

impl FaultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, FAULT_LOG_MAX_LINES)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines: max_lines.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn lines(&self) -> std::io::Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(raw.lines().map(str::to_string).collect()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Append one timestamped line, dropping the oldest lines beyond the cap.
    pub async fn append(&self, message: &str) -> std::io::Result<()> {
        let mut lines = self.lines().await?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let message = message.replace('\n', " ");
        lines.push(format!("{timestamp} ERROR: {message}"));
        if lines.len() > self.max_lines {
            lines.drain(..lines.len() - self.max_lines);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut contents = lines.join("\n");
        contents.push('\n');
        let tmp_path = self.path.with_extension("log.tmp");
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &self.path).await
    }
}

/// Claim the relays, sensors and status LED named in the configuration and
/// switch the display backlight. A resource that fails to initialize is
/// logged and left out.
pub async fn init_hardware(ctx: &ControlContext) -> ValveRelays {
    let store = &ctx.store;
    let hardware = &ctx.hardware;

    let open_pin = store.get_int(KEY_RELAY_OPEN_PIN, 0).await;
    let close_pin = store.get_int(KEY_RELAY_CLOSE_PIN, 0).await;
    let relays = ValveRelays {
        open: hardware.init_relay(open_pin).await.ok(),
        close: hardware.init_relay(close_pin).await.ok(),
    };

    let sensors = [
        (
            KEY_TEMP_SENSOR_PIN,
            KEY_TEMP_SENSOR_TYPE,
            KEY_TEMP_SENSOR_RESOLUTION,
        ),
        (
            KEY_TEMP_SENSOR_2_PIN,
            KEY_TEMP_SENSOR_2_TYPE,
            KEY_TEMP_SENSOR_2_RESOLUTION,
        ),
    ];
    for (pin_key, type_key, resolution_key) in sensors {
        let pin = store.get_int(pin_key, 0).await;
        if pin == 0 {
            debug!("{pin_key} not set, no sensor on that slot");
            continue;
        }
        let kind = store.get_str(type_key, DEFAULT_SENSOR_TYPE).await;
        let resolution = store
            .get_int(resolution_key, DEFAULT_RESOLUTION_BITS)
            .await;
        // Failures are logged by the registry; the sensor stays absent.
        let _ = hardware.init_sensor(pin, &kind, resolution).await;
    }

    match store.get_int(KEY_LED_PIN, 0).await {
        0 => debug!("{KEY_LED_PIN} not set, no status LED"),
        pin => {
            let _ = hardware.init_led(pin).await;
        }
    }
    ctx.display
        .set_backlight(store.get_bool(KEY_LCD_BACKLIGHT, true).await);

    relays
}

/// Drive the status LED and the display backlight from the stored flags.
pub async fn apply_indicators(ctx: &ControlContext) {
    let store = &ctx.store;
    ctx.display
        .set_backlight(store.get_bool(KEY_LCD_BACKLIGHT, true).await);
    if let Some(led) = ctx.hardware.led() {
        let on = store.get_bool(KEY_LED, true).await;
        if let Err(err) = led.set(on).await {
            warn!("failed to switch status LED: {err}");
        }
    }
}

/// Run the boot sequence up to the first evaluation and hand back the
/// controller ready for [`Controller::run`].
pub async fn boot(ctx: ControlContext) -> Result<Controller, ControlError> {
    info!("boot sequence started");
    let relays = init_hardware(&ctx).await;
    let mut controller = Controller::new(ctx.clone(), relays).await;
    let store = &ctx.store;

    controller.refresh_sensors().await;
    let seed = store
        .get_float(&sensor_key(KEY_CURRENT_TEMP, 1), TEMP_SENTINEL_C)
        .await;
    store.set(KEY_TEMP_LAST_MEASUREMENT, seed).await;
    store
        .set(KEY_TEMP_LAST_MEASUREMENT_TIME, ctx.clock.ticks_ms())
        .await;

    let settings = store.control_settings().await;
    print_nominal_band(ctx.display.as_ref(), &settings.band);

    if store.get_bool(KEY_BOOT_NORMAL, true).await {
        info!("start delay 1/2: {} s", settings.delay_before_start_1_s);
        controller
            .wait_start(settings.delay_before_start_1_s, "Start 1/2:")
            .await;

        match controller.relays().open.clone() {
            Some(relay) => prime(&relay, settings.init_relay_time_ms).await?,
            None => warn!("open relay not configured, skipping initial pulse"),
        }

        info!("start delay 2/2: {} s", settings.delay_before_start_2_s);
        controller
            .wait_start(settings.delay_before_start_2_s, "Start 2/2:")
            .await;
    } else {
        info!("previous run ended in a fault, skipping priming");
    }

    controller.open_relays(settings.relay_time_ms).await?;

    store.set(KEY_BOOT_NORMAL, 1).await;
    store.save().await?;
    info!("boot sequence complete");
    Ok(controller)
}

async fn prime(relay: &Relay, init_relay_time_ms: u64) -> Result<(), ControlError> {
    info!("initial pulse of the open relay for {init_relay_time_ms} ms");
    relay.toggle(Some(init_relay_time_ms)).await?;
    Ok(())
}

/// Boot and run the control loop in its own task. When the task fails or
/// panics, persist `boot_normal = 0`, append to the fault log and reboot.
///
/// Returns the recorded fault message once `reboot` returns, which only
/// happens with a test double.
pub async fn supervise(
    ctx: ControlContext,
    fault_log: &FaultLog,
    reboot: &dyn Reboot,
) -> String {
    let task = tokio::spawn({
        let ctx = ctx.clone();
        async move {
            let controller = boot(ctx).await?;
            controller.run().await
        }
    });

    let fault = match task.await {
        Ok(Ok(never)) => match never {},
        Ok(Err(err)) => err,
        Err(join_error) => ControlError::Panicked(panic_message(join_error)),
    };

    let message = fault.to_string();
    error!("control task failed: {message}");
    record_crash(&ctx, fault_log, &message).await;
    reboot.reboot();
    message
}

async fn record_crash(ctx: &ControlContext, fault_log: &FaultLog, message: &str) {
    let store = &ctx.store;
    store.set(KEY_BOOT_NORMAL, 0).await;
    if let Err(err) = store.save().await {
        error!("failed to persist boot flag: {err}");
    }
    if let Err(err) = fault_log.append(message).await {
        error!(
            "failed to append to fault log {}: {err}",
            fault_log.path().display()
        );
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    if join_error.is_cancelled() {
        return "control task cancelled".to_string();
    }
    let payload = join_error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Reboot after `delay`, giving an in-flight HTTP response time to go out.
pub fn schedule_reboot(reboot: Arc<dyn Reboot>, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        reboot.reboot();
    });
}
