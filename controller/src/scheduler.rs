//! Adaptive control loop.
//!
//! The loop is paced at [`LOOP_PACING`] and does two independent things per
//! pass:
//!
//! * every `temp_sampling_interval` ms it samples the primary sensor and
//!   classifies the change since the previous sample;
//! * every `interval` ms it runs one coarse cycle: either a countdown step
//!   or, when the countdown reaches zero, an evaluation that adjusts the
//!   timings from the last classification and actuates a relay.
//!
//! All elapsed-time checks use wrapping tick arithmetic.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use hotwater_common::{
    classify, format_countdown, is_plausible, round_to, sensor_key, stop_timer_for, ticks_diff,
    ticks_from_ms, Actuation, ControllerStatus, NominalBand, KEY_BOOT_NORMAL, KEY_CURRENT_TEMP,
    KEY_PREVIOUS_MILLIS, KEY_TEMP_CHANGE_CATEGORY, KEY_TEMP_INCREASING, KEY_TEMP_LAST_MEASUREMENT,
    KEY_TEMP_LAST_MEASUREMENT_TIME, KEY_TIMER,
};

use crate::{
    clock::MonotonicClock,
    display::{rjust, DisplaySurface, Glyph},
    hardware::{Hardware, HardwareError, Relay, TempSensor, TEMP_SENTINEL_C},
    store::{ConfigStore, StoreError},
};

pub const LOOP_PACING: Duration = Duration::from_millis(100);
pub const SENSOR_FAULT_PAUSE: Duration = Duration::from_secs(2);
const COUNTDOWN_LABEL: &str = "Next run:";
const BAND_LABEL: &str = "Set:";
const TREND_LABEL: &str = "Temp trend";
const TREND_GLYPH_COL: usize = 11;
const TREND_VALUE_COL: usize = 13;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Hardware(#[from] HardwareError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("control task panicked: {0}")]
    Panicked(String),
}

/// The two complementary valve relays. A relay whose pin is not configured
/// stays `None` and its actuations are skipped.
#[derive(Clone, Default)]
pub struct ValveRelays {
    pub open: Option<Arc<Relay>>,
    pub close: Option<Arc<Relay>>,
}

/// Loop state observed by the management endpoint.
#[derive(Default)]
pub struct SharedStatus {
    last_actuation: Mutex<Option<Actuation>>,
}

impl SharedStatus {
    pub fn last_actuation(&self) -> Option<Actuation> {
        *self
            .last_actuation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, actuation: Actuation) {
        *self
            .last_actuation
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(actuation);
    }
}

/// Collaborators of the control loop, shared with the management endpoint.
#[derive(Clone)]
pub struct ControlContext {
    pub store: Arc<ConfigStore>,
    pub hardware: Arc<Hardware>,
    pub display: Arc<dyn DisplaySurface>,
    pub clock: Arc<dyn MonotonicClock>,
    pub status: Arc<SharedStatus>,
}

impl ControlContext {
    pub fn new(
        store: Arc<ConfigStore>,
        hardware: Arc<Hardware>,
        display: Arc<dyn DisplaySurface>,
        clock: Arc<dyn MonotonicClock>,
    ) -> Self {
        Self {
            store,
            hardware,
            display,
            clock,
            status: Arc::new(SharedStatus::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleState {
    pub previous_tick: u32,
    pub interval_ms: u32,
    /// Countdown cycles left before the next evaluation.
    pub update_countdown: u32,
    pub temp_update_interval: u32,
    /// Countdown cycles still suppressed after the last relay pulse.
    pub stop_timer: u32,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub actuation: Actuation,
    pub relay_time_ms: u64,
    pub update_time: u32,
}

pub struct Controller {
    ctx: ControlContext,
    relays: ValveRelays,
    cycle: CycleState,
    primary_reading: Option<f32>,
}

impl Controller {
    pub async fn new(ctx: ControlContext, relays: ValveRelays) -> Self {
        let settings = ctx.store.control_settings().await;
        let cycle = CycleState {
            previous_tick: ctx.clock.ticks_ms(),
            interval_ms: settings.interval_ms,
            update_countdown: settings.update_time,
            temp_update_interval: settings.temp_update_interval,
            stop_timer: 0,
        };
        Self {
            ctx,
            relays,
            cycle,
            primary_reading: None,
        }
    }

    pub fn context(&self) -> &ControlContext {
        &self.ctx
    }

    pub fn relays(&self) -> &ValveRelays {
        &self.relays
    }

    pub fn cycle(&self) -> CycleState {
        self.cycle
    }

    /// Last reading of the primary sensor; `None` after a failed read.
    pub fn primary_reading(&self) -> Option<f32> {
        self.primary_reading
    }

    pub async fn run(mut self) -> Result<Infallible, ControlError> {
        info!("control loop started");
        loop {
            self.step().await?;
            tokio::time::sleep(LOOP_PACING).await;
        }
    }

    /// One pass of the loop at the current tick.
    pub async fn step(&mut self) -> Result<(), ControlError> {
        let now = self.ctx.clock.ticks_ms();
        self.sample_if_due(now).await;

        if ticks_diff(now, self.cycle.previous_tick) > i64::from(self.cycle.interval_ms) {
            if self.cycle.update_countdown > 0 {
                let remaining = self.cycle.update_countdown;
                self.update_timer(remaining, COUNTDOWN_LABEL).await;
                if remaining % self.cycle.temp_update_interval == 0 {
                    self.refresh_sensors().await;
                }
                self.cycle.update_countdown -= 1;
            } else {
                self.evaluate().await?;
            }

            self.cycle.previous_tick = now;
            self.ctx.store.set(KEY_PREVIOUS_MILLIS, now).await;
        }
        Ok(())
    }

    /// Refresh all sensors, derive the timings from the stored
    /// classification and actuate.
    pub async fn evaluate(&mut self) -> Result<Evaluation, ControlError> {
        self.refresh_sensors().await;

        let store = &self.ctx.store;
        let settings = store.control_settings().await;
        self.cycle.interval_ms = settings.interval_ms;
        self.cycle.temp_update_interval = settings.temp_update_interval;

        let category = store.temp_change_category().await;
        let increasing = store.get_bool(KEY_TEMP_INCREASING, false).await;
        let timing = settings.adaptive_timing();
        let relay_time_ms = timing.relay_time_for(category, increasing);
        let update_time = timing.update_time_for(category, increasing);
        if relay_time_ms != settings.relay_time_ms {
            info!("relay time adjusted to {relay_time_ms} ms ({category}, rising)");
        }
        if update_time != settings.update_time {
            info!("update time adjusted to {update_time} cycles ({category}, rising)");
        }

        let actuation = self.open_relays(relay_time_ms).await?;
        self.cycle.update_countdown = update_time;
        Ok(Evaluation {
            actuation,
            relay_time_ms,
            update_time,
        })
    }

    /// Compare the primary reading against the nominal band and pulse the
    /// matching relay for `relay_time_ms`.
    pub async fn open_relays(&mut self, relay_time_ms: u64) -> Result<Actuation, ControlError> {
        self.cycle.stop_timer = stop_timer_for(relay_time_ms);

        let band = self.ctx.store.nominal_band().await;
        let actuation = band.decide(self.primary_reading);
        self.ctx.display.print(3, 0, actuation.display_text(), true);

        match actuation {
            Actuation::Close => pulse(self.relays.close.as_ref(), "close", relay_time_ms).await?,
            Actuation::Open => pulse(self.relays.open.as_ref(), "open", relay_time_ms).await?,
            Actuation::Idle => debug!("temperature within {}", band.label()),
            Actuation::SensorFault => {
                warn!(
                    reading = ?self.primary_reading,
                    "no plausible temperature, skipping actuation"
                );
                tokio::time::sleep(SENSOR_FAULT_PAUSE).await;
            }
        }

        self.ctx.status.record(actuation);
        Ok(actuation)
    }

    /// Count `secs` coarse cycles down with `label` on the bottom row,
    /// refreshing the sensors every `temp_update_interval` cycles.
    pub async fn wait_start(&mut self, secs: u32, label: &str) {
        debug!(secs, "start delay {label}");
        let mut remaining = secs;
        let mut previous: Option<u32> = None;

        while remaining > 0 {
            let now = self.ctx.clock.ticks_ms();
            let due = previous.is_none_or(|previous| {
                ticks_diff(now, previous) > i64::from(self.cycle.interval_ms)
            });
            if due {
                self.update_timer(remaining, label).await;
                if remaining % self.cycle.temp_update_interval == 0 {
                    self.refresh_sensors().await;
                }
                remaining -= 1;
                previous = Some(now);
            }
            tokio::time::sleep(LOOP_PACING).await;
        }
    }

    /// Read every registered sensor and show the readings on the top row.
    pub async fn refresh_sensors(&mut self) -> Option<f32> {
        for sensor in self.ctx.hardware.sensors() {
            let reading = self.update_temp(&sensor).await;
            if sensor.ordinal() == 1 {
                self.primary_reading = reading;
            }
            if sensor.kind().measures_humidity() {
                sensor.get_humidity().await;
            }
        }
        self.primary_reading
    }

    async fn sample_if_due(&mut self, now: u32) {
        let store = Arc::clone(&self.ctx.store);
        let settings = store.control_settings().await;
        let anchor = store.get_int(KEY_TEMP_LAST_MEASUREMENT_TIME, 0).await;
        let anchor = ticks_from_ms(u64::try_from(anchor).unwrap_or(0));
        if ticks_diff(now, anchor) < i64::from(settings.temp_sampling_interval_ms) {
            return;
        }

        let reading = match self.ctx.hardware.sensors().first() {
            Some(primary) => {
                let reading = self.update_temp(primary).await;
                self.primary_reading = reading;
                reading
            }
            None => None,
        };

        match reading.filter(|temp_c| is_plausible(*temp_c)) {
            Some(current) => {
                let previous = store
                    .get_float(KEY_TEMP_LAST_MEASUREMENT, TEMP_SENTINEL_C)
                    .await as f32;
                if is_plausible(previous) {
                    let delta = round_to(f64::from(current - previous), 1) as f32;
                    self.record_trend(delta, settings.high_threshold_c).await;
                } else {
                    debug!("no previous sample to compare {current:.1} °C against");
                }
                store
                    .set(KEY_TEMP_LAST_MEASUREMENT, round_to(f64::from(current), 1))
                    .await;
            }
            None => debug!("sample skipped, no temperature reading"),
        }
        store.set(KEY_TEMP_LAST_MEASUREMENT_TIME, now).await;
    }

    async fn record_trend(&self, delta: f32, high_threshold_c: f32) {
        let store = &self.ctx.store;
        let classification = classify(delta, high_threshold_c);
        let category = classification.category;

        {
            let _guard = store.lock().await;
            let previous = store.temp_change_category().await;
            if previous != category {
                info!("temperature change {delta:+.1} °C: {previous} -> {category}");
            }
            store.set(KEY_TEMP_CHANGE_CATEGORY, category.as_str()).await;
            store
                .set(KEY_TEMP_INCREASING, i64::from(classification.increasing))
                .await;
        }

        let display = &self.ctx.display;
        let text = format!("{TREND_LABEL:<width$}{category}", width = TREND_VALUE_COL);
        display.print(2, 0, &text, true);
        let glyph = if classification.increasing {
            Glyph::ArrowUp
        } else {
            Glyph::ArrowDown
        };
        display.print_glyph(2, TREND_GLYPH_COL, glyph);
    }

    /// Read one sensor and print it right-aligned in its half of the top
    /// row: the primary sensor on the right, any other on the left.
    async fn update_temp(&self, sensor: &TempSensor) -> Option<f32> {
        let reading = sensor.get_temperature().await;
        let display = &self.ctx.display;
        let half = display.cols() / 2;

        let text = match reading {
            Some(temp_c) => {
                info!("sensor {}: {temp_c:.1} °C", sensor.ordinal());
                rjust(&format!("{temp_c:.1} °C"), half)
            }
            None => rjust("--.- °C", half),
        };
        let width = text.chars().count();
        let col = if sensor.ordinal() > 1 {
            half.saturating_sub(width)
        } else {
            display.cols().saturating_sub(width)
        };
        display.print(0, col, &text, false);
        reading
    }

    /// Publish the remaining countdown unless a relay pulse is still
    /// suppressing it.
    async fn update_timer(&mut self, secs: u32, label: &str) {
        if self.cycle.stop_timer > 0 {
            self.cycle.stop_timer -= 1;
            debug!(stop_timer = self.cycle.stop_timer, "countdown suspended");
            return;
        }

        debug!(secs, "countdown");
        self.ctx.store.set(KEY_TIMER, secs).await;
        let display = &self.ctx.display;
        let text = format_countdown(u64::from(secs));
        display.print(3, 0, label, true);
        let col = display.cols().saturating_sub(text.chars().count());
        display.print(3, col, &text, false);
    }
}

/// Show the nominal band on display row 1.
pub fn print_nominal_band(display: &dyn DisplaySurface, band: &NominalBand) {
    let label = band.label();
    display.print(1, 0, BAND_LABEL, true);
    let col = display.cols().saturating_sub(label.chars().count());
    display.print(1, col, &label, false);
}

async fn pulse(
    relay: Option<&Arc<Relay>>,
    label: &str,
    relay_time_ms: u64,
) -> Result<(), ControlError> {
    match relay {
        Some(relay) => relay.toggle(Some(relay_time_ms)).await?,
        None => warn!("{label} relay not configured, skipping actuation"),
    }
    Ok(())
}

/// Snapshot for the management endpoint, taken under the store lock.
pub async fn status_snapshot(ctx: &ControlContext) -> ControllerStatus {
    let store = &ctx.store;
    let _guard = store.lock().await;
    ControllerStatus {
        display: ctx.display.lines(),
        current_temp: stored_reading(store, 1).await,
        current_temp_2: stored_reading(store, 2).await,
        nominal_band: store.nominal_band().await,
        category: store.temp_change_category().await,
        temp_increasing: store.get_bool(KEY_TEMP_INCREASING, false).await,
        timer_secs: store.get_int(KEY_TIMER, 0).await,
        boot_normal: store.get_bool(KEY_BOOT_NORMAL, true).await,
        last_actuation: ctx.status.last_actuation(),
        backlight: ctx.display.backlight(),
        led: ctx.hardware.led().map(|led| led.is_on()),
    }
}

async fn stored_reading(store: &ConfigStore, ordinal: usize) -> Option<f32> {
    let key = sensor_key(KEY_CURRENT_TEMP, ordinal);
    if !store.contains(&key).await {
        return None;
    }
    let temp_c = store.get_float(&key, TEMP_SENTINEL_C).await;
    (temp_c > TEMP_SENTINEL_C).then_some(temp_c as f32)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::{
        clock::TokioClock,
        display::TextDisplay,
        hardware::{sim::SimBackend, Pin},
    };

    const OPEN_PIN: i64 = 10;
    const CLOSE_PIN: i64 = 11;
    const SENSOR_PIN: i64 = 4;

    struct Rig {
        sim: SimBackend,
        controller: Controller,
    }

    async fn rig(overrides: Value) -> Rig {
        let mut doc = Map::new();
        doc.insert("RELAY_OPEN_PIN".into(), json!(OPEN_PIN));
        doc.insert("RELAY_CLOSE_PIN".into(), json!(CLOSE_PIN));
        doc.insert("relay_time".into(), json!(1200));
        doc.insert("update_time".into(), json!(3));
        if let Value::Object(overrides) = overrides {
            doc.extend(overrides);
        }
        let store = Arc::new(ConfigStore::with_document("unused.json", doc));

        let sim = SimBackend::with_default_temperature(50.0);
        let hardware = Arc::new(Hardware::new(Arc::new(sim.clone()), Arc::clone(&store)));
        let relays = ValveRelays {
            open: Some(hardware.init_relay(OPEN_PIN).await.unwrap()),
            close: Some(hardware.init_relay(CLOSE_PIN).await.unwrap()),
        };
        hardware.init_sensor(SENSOR_PIN, "ds18x20", 9).await.unwrap();

        let ctx = ControlContext::new(
            store,
            hardware,
            Arc::new(TextDisplay::default()),
            Arc::new(TokioClock::new()),
        );
        Rig {
            sim,
            controller: Controller::new(ctx, relays).await,
        }
    }

    fn pin(raw: i64) -> Pin {
        Pin::new(raw).unwrap()
    }

    fn store(rig: &Rig) -> &ConfigStore {
        &rig.controller.context().store
    }

    #[tokio::test(start_paused = true)]
    async fn sample_classifies_rising_temperature() {
        let mut rig = rig(json!({})).await;
        store(&rig).set(KEY_TEMP_LAST_MEASUREMENT, 45.0).await;
        rig.sim.set_temperature(pin(SENSOR_PIN), 47.0);

        tokio::time::advance(Duration::from_millis(10_000)).await;
        rig.controller.step().await.unwrap();

        let store = store(&rig);
        assert_eq!(store.get(KEY_TEMP_CHANGE_CATEGORY, json!(null)).await, json!("HIGH"));
        assert_eq!(store.get(KEY_TEMP_INCREASING, json!(null)).await, json!(1));
        assert_eq!(store.get(KEY_TEMP_LAST_MEASUREMENT, json!(null)).await, json!(47.0));

        let lines = rig.controller.context().display.lines();
        assert_eq!(lines[2], "Temp trend ↑ HIGH   ");
    }

    #[tokio::test(start_paused = true)]
    async fn small_falling_change_is_low() {
        let mut rig = rig(json!({})).await;
        store(&rig).set(KEY_TEMP_LAST_MEASUREMENT, 45.0).await;
        rig.sim.set_temperature(pin(SENSOR_PIN), 44.5);

        tokio::time::advance(Duration::from_millis(10_000)).await;
        rig.controller.step().await.unwrap();

        let store = store(&rig);
        assert_eq!(store.get(KEY_TEMP_CHANGE_CATEGORY, json!(null)).await, json!("LOW"));
        assert_eq!(store.get(KEY_TEMP_INCREASING, json!(null)).await, json!(0));
        assert!(rig.controller.context().display.lines()[2].contains('↓'));
    }

    #[tokio::test(start_paused = true)]
    async fn sample_without_reading_only_moves_the_anchor() {
        let mut rig = rig(json!({})).await;
        store(&rig).set(KEY_TEMP_LAST_MEASUREMENT, 45.0).await;
        store(&rig).set(KEY_TEMP_CHANGE_CATEGORY, "HIGH").await;
        rig.sim.fail_sensor(pin(SENSOR_PIN), true);

        tokio::time::advance(Duration::from_millis(10_000)).await;
        rig.controller.step().await.unwrap();

        let store = store(&rig);
        assert_eq!(store.get(KEY_TEMP_CHANGE_CATEGORY, json!(null)).await, json!("HIGH"));
        assert_eq!(store.get(KEY_TEMP_LAST_MEASUREMENT, json!(null)).await, json!(45.0));
        assert_eq!(
            store.get(KEY_TEMP_LAST_MEASUREMENT_TIME, json!(null)).await,
            json!(10_000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_cycles_publish_timer_and_previous_tick() {
        let mut rig = rig(json!({})).await;

        tokio::time::advance(Duration::from_millis(1_000)).await;
        rig.controller.step().await.unwrap();

        assert_eq!(rig.controller.cycle().update_countdown, 2);
        assert_eq!(rig.controller.cycle().previous_tick, 1_000);
        let store = store(&rig);
        assert_eq!(store.get(KEY_TIMER, json!(null)).await, json!(3));
        assert_eq!(store.get(KEY_PREVIOUS_MILLIS, json!(null)).await, json!(1_000));
        assert_eq!(
            rig.controller.context().display.lines()[3],
            "Next run:    00m 03s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_cycle_before_the_interval_elapses() {
        let mut rig = rig(json!({})).await;
        tokio::time::advance(Duration::from_millis(930)).await;
        rig.controller.step().await.unwrap();
        assert_eq!(rig.controller.cycle().update_countdown, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn relay_pulse_suspends_the_countdown_display() {
        let mut rig = rig(json!({})).await;
        rig.sim.set_temperature(pin(SENSOR_PIN), 40.0);
        rig.controller.refresh_sensors().await;

        let actuation = rig.controller.open_relays(1_200).await.unwrap();
        assert_eq!(actuation, Actuation::Close);
        assert_eq!(rig.controller.cycle().stop_timer, 2);

        for _ in 0..2 {
            tokio::time::advance(Duration::from_millis(1_000)).await;
            rig.controller.step().await.unwrap();
        }
        assert_eq!(store(&rig).get(KEY_TIMER, json!(null)).await, json!(null));
        assert_eq!(rig.controller.cycle().stop_timer, 0);

        tokio::time::advance(Duration::from_millis(1_000)).await;
        rig.controller.step().await.unwrap();
        assert_eq!(store(&rig).get(KEY_TIMER, json!(null)).await, json!(1));
    }

    #[tokio::test(start_paused = true)]
    async fn implausible_reading_skips_actuation() {
        let mut rig = rig(json!({})).await;
        rig.sim.set_temperature(pin(SENSOR_PIN), 130.0);
        rig.controller.refresh_sensors().await;

        let started = tokio::time::Instant::now();
        let actuation = rig.controller.open_relays(1_200).await.unwrap();

        assert_eq!(actuation, Actuation::SensorFault);
        assert_eq!(started.elapsed(), SENSOR_FAULT_PAUSE);
        assert_eq!(rig.sim.transitions(pin(OPEN_PIN)), vec![false]);
        assert_eq!(rig.sim.transitions(pin(CLOSE_PIN)), vec![false]);
        assert_eq!(
            rig.controller.context().display.lines()[3],
            "error: temp fault!  "
        );
        assert_eq!(
            rig.controller.context().status.last_actuation(),
            Some(Actuation::SensorFault)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn evaluation_restarts_the_countdown() {
        let mut rig = rig(json!({ "update_time": 7 })).await;
        let evaluation = rig.controller.evaluate().await.unwrap();

        assert_eq!(
            evaluation,
            Evaluation {
                actuation: Actuation::Idle,
                relay_time_ms: 1_200,
                update_time: 7,
            }
        );
        assert_eq!(rig.controller.cycle().update_countdown, 7);
        assert_eq!(
            rig.controller.context().display.lines()[3],
            "target temp reached "
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_relay_is_skipped() {
        let mut rig = rig(json!({})).await;
        rig.controller.relays.close = None;
        rig.sim.set_temperature(pin(SENSOR_PIN), 40.0);
        rig.controller.refresh_sensors().await;

        let actuation = rig.controller.open_relays(500).await.unwrap();
        assert_eq!(actuation, Actuation::Close);
        assert_eq!(rig.sim.transitions(pin(CLOSE_PIN)), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn sensors_render_in_their_half_of_the_top_row() {
        let mut rig = rig(json!({})).await;
        let hardware = Arc::clone(&rig.controller.context().hardware);
        hardware.init_sensor(5, "ds18x20", 9).await.unwrap();
        rig.sim.set_temperature(pin(SENSOR_PIN), 48.25);
        rig.sim.fail_sensor(pin(5), true);

        rig.controller.refresh_sensors().await;

        assert_eq!(
            rig.controller.context().display.lines()[0],
            "   --.- °C   48.3 °C"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn status_snapshot_reports_live_state() {
        let mut rig = rig(json!({ "boot_normal": 0 })).await;
        rig.sim.set_temperature(pin(SENSOR_PIN), 60.0);
        rig.controller.refresh_sensors().await;
        rig.controller.open_relays(300).await.unwrap();

        let status = status_snapshot(rig.controller.context()).await;
        assert_eq!(status.current_temp, Some(60.0));
        assert_eq!(status.current_temp_2, None);
        assert_eq!(status.last_actuation, Some(Actuation::Open));
        assert!(!status.boot_normal);
        assert_eq!(status.display.len(), 4);
    }
}
