//! JSON management API.
//!
//! Handlers are thin clients of the configuration store: they read and write
//! the same document the control loop uses, under the store lock.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use hotwater_common::{
    check_manual_trigger, ConfigUpdateResponse, ManualTriggerResponse, RestartResponse,
    KEY_BOOT_NORMAL, KEY_CURRENT_TEMP, KEY_LOG_LEVEL, KEY_MANUAL_RELAY_TIME, KEY_RELAY_CLOSE_PIN,
    KEY_RELAY_OPEN_PIN, KEY_TIMER,
};

use crate::{
    boot::{apply_indicators, schedule_reboot, Reboot},
    hardware::{Pin, TEMP_SENTINEL_C},
    logging::{LogControl, DEFAULT_LOG_LEVEL},
    scheduler::{print_nominal_band, status_snapshot, ControlContext},
    store::Document,
};

const DEFAULT_MANUAL_RELAY_TIME_MS: i64 = 1200;
pub const RESTART_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct AppState {
    ctx: ControlContext,
    log: LogControl,
    reboot: Arc<dyn Reboot>,
    restart_delay: Duration,
}

impl AppState {
    pub fn new(ctx: ControlContext, log: LogControl, reboot: Arc<dyn Reboot>) -> Self {
        Self {
            ctx,
            log,
            reboot,
            restart_delay: RESTART_DELAY,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ManualTriggerParams {
    ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RestartRequest {
    #[serde(rename = "bootNormal")]
    boot_normal: bool,
}

#[derive(Debug, Clone, Copy)]
enum Valve {
    Open,
    Close,
}

impl Valve {
    fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }

    fn pin_key(self) -> &'static str {
        match self {
            Self::Open => KEY_RELAY_OPEN_PIN,
            Self::Close => KEY_RELAY_CLOSE_PIN,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/config", get(handle_get_config).put(handle_put_config))
        .route("/api/relay/open", post(handle_relay_open))
        .route("/api/relay/close", post(handle_relay_close))
        .route("/api/machine/reset", post(handle_machine_reset))
        .with_state(state)
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(status_snapshot(&state.ctx).await)
}

async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ctx.store.get_all().await)
}

/// Update keys that already exist in the document, then save and re-apply
/// the settings that take effect immediately.
async fn handle_put_config(
    State(state): State<AppState>,
    Json(update): Json<Document>,
) -> Response {
    let store = &state.ctx.store;
    let _guard = store.lock().await;

    let mut updated = Vec::new();
    let mut rejected = Vec::new();
    for (key, value) in update {
        let scalar = !matches!(value, Value::Array(_) | Value::Object(_));
        if scalar && store.contains(&key).await {
            store.set(&key, value).await;
            updated.push(key);
        } else {
            rejected.push(key);
        }
    }
    if !rejected.is_empty() {
        warn!("configuration partially updated, rejected keys: {rejected:?}");
    }
    apply_indicators(&state.ctx).await;

    if let Err(err) = store.save().await {
        error!("failed to save configuration: {err}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save configuration");
    }
    info!("configuration updated: {updated:?}");

    print_nominal_band(state.ctx.display.as_ref(), &store.nominal_band().await);
    state.log.apply(&store.get_str(KEY_LOG_LEVEL, DEFAULT_LOG_LEVEL).await);

    Json(ConfigUpdateResponse {
        updated,
        rejected,
        saved: true,
    })
    .into_response()
}

async fn handle_relay_open(
    State(state): State<AppState>,
    Query(params): Query<ManualTriggerParams>,
) -> Response {
    manual_trigger(&state, Valve::Open, params).await
}

async fn handle_relay_close(
    State(state): State<AppState>,
    Query(params): Query<ManualTriggerParams>,
) -> Response {
    manual_trigger(&state, Valve::Close, params).await
}

async fn manual_trigger(state: &AppState, valve: Valve, params: ManualTriggerParams) -> Response {
    let store = &state.ctx.store;
    let (duration, pin) = {
        let _guard = store.lock().await;
        let requested = match params.ms {
            Some(ms) => ms,
            None => {
                store
                    .get_int(KEY_MANUAL_RELAY_TIME, DEFAULT_MANUAL_RELAY_TIME_MS)
                    .await
            }
        };
        let timer = store.get_int(KEY_TIMER, 0).await;
        let reading = store.get_float(KEY_CURRENT_TEMP, TEMP_SENTINEL_C).await as f32;
        let pin = store.get_int(valve.pin_key(), 0).await;
        (check_manual_trigger(requested, timer, Some(reading)), pin)
    };

    let duration_ms = match duration {
        Ok(duration_ms) => duration_ms,
        Err(rejection) => {
            warn!("manual {} trigger rejected: {rejection}", valve.as_str());
            return error_response(StatusCode::CONFLICT, &rejection.to_string());
        }
    };

    let Some(relay) = Pin::new(pin)
        .ok()
        .and_then(|pin| state.ctx.hardware.relay(pin))
    else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &format!("{} relay is not configured", valve.as_str()),
        );
    };

    info!("manual {} trigger for {duration_ms} ms", valve.as_str());
    if let Err(err) = relay.toggle(Some(duration_ms)).await {
        error!("manual {} trigger failed: {err}", valve.as_str());
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
    }

    Json(ManualTriggerResponse {
        relay: valve.as_str(),
        duration_ms,
    })
    .into_response()
}

async fn handle_machine_reset(
    State(state): State<AppState>,
    Json(request): Json<RestartRequest>,
) -> Response {
    let store = &state.ctx.store;
    store
        .set(KEY_BOOT_NORMAL, i64::from(request.boot_normal))
        .await;
    if let Err(err) = store.save().await {
        error!("failed to save boot flag: {err}");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save configuration");
    }

    info!(boot_normal = request.boot_normal, "restart requested");
    schedule_reboot(Arc::clone(&state.reboot), state.restart_delay);

    Json(RestartResponse {
        boot_normal: request.boot_normal,
        restart_scheduled: true,
    })
    .into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};

    use super::*;
    use crate::{
        clock::TokioClock,
        display::TextDisplay,
        hardware::{sim::SimBackend, Hardware},
        store::{tests::scratch_dir, ConfigStore},
    };

    #[derive(Default)]
    struct RecordingReboot(AtomicUsize);

    impl Reboot for RecordingReboot {
        fn reboot(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        state: AppState,
        sim: SimBackend,
        reboot: Arc<RecordingReboot>,
    }

    async fn harness(label: &str, doc: Value) -> Harness {
        let Value::Object(doc) = doc else {
            panic!("test document must be an object");
        };
        let path = scratch_dir(label).join("config.json");
        let store = Arc::new(ConfigStore::with_document(path, doc));
        let sim = SimBackend::new();
        let hardware = Arc::new(Hardware::new(Arc::new(sim.clone()), Arc::clone(&store)));
        hardware.init_relay(10).await.unwrap();
        hardware.init_relay(11).await.unwrap();
        hardware.init_led(2).await.unwrap();

        let ctx = ControlContext::new(
            store,
            hardware,
            Arc::new(TextDisplay::default()),
            Arc::new(TokioClock::new()),
        );
        let reboot = Arc::new(RecordingReboot::default());
        Harness {
            state: AppState::new(ctx, LogControl::detached(), reboot.clone()),
            sim,
            reboot,
        }
    }

    fn base_doc() -> Value {
        json!({
            "RELAY_OPEN_PIN": 10,
            "RELAY_CLOSE_PIN": 11,
            "nominal_min_temp": 42.0,
            "nominal_max_temp": 57.0,
            "manual_relay_time": 1200,
            "log_level": "INFO",
            "timer": 60,
            "current_temp": 50.0,
            "LED": true,
            "lcd_i2c_backlight": true,
        })
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn put_config_updates_known_keys_only() {
        let harness = harness("web-put", base_doc()).await;
        let update: Map<String, Value> = serde_json::from_value(json!({
            "nominal_min_temp": 40.5,
            "bogus_key": 1,
        }))
        .unwrap();

        let response = handle_put_config(State(harness.state.clone()), Json(update)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "updated": ["nominal_min_temp"], "rejected": ["bogus_key"], "saved": true })
        );

        let store = &harness.state.ctx.store;
        assert_eq!(store.get("nominal_min_temp", json!(null)).await, json!(40.5));
        assert!(!store.contains("bogus_key").await);

        let saved: Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(saved["nominal_min_temp"], json!(40.5));
        assert_eq!(
            harness.state.ctx.display.lines()[1],
            "Set:  40.5 - 57.0 °C"
        );
    }

    #[tokio::test]
    async fn put_config_switches_led_and_backlight() {
        let harness = harness("web-indicators", base_doc()).await;
        let update: Map<String, Value> = serde_json::from_value(json!({
            "LED": "off",
            "lcd_i2c_backlight": false,
        }))
        .unwrap();

        let response = handle_put_config(State(harness.state.clone()), Json(update)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let led_pin = Pin::new(2).unwrap();
        assert_eq!(harness.sim.transitions(led_pin), vec![true, false]);
        assert!(!harness.state.ctx.display.backlight());
        let store = &harness.state.ctx.store;
        assert_eq!(store.get("LED", json!(null)).await, json!(false));

        let status = body_json(
            handle_get_status(State(harness.state.clone()))
                .await
                .into_response(),
        )
        .await;
        assert_eq!(status["led"], json!(false));
        assert_eq!(status["backlight"], json!(false));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_pulses_the_relay() {
        let harness = harness("web-manual", base_doc()).await;
        let params = ManualTriggerParams { ms: Some(500) };

        let response = handle_relay_close(State(harness.state.clone()), Query(params)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "relay": "close", "durationMs": 500 })
        );
        assert_eq!(
            harness.sim.transitions(Pin::new(11).unwrap()),
            vec![false, true, false]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_is_clamped_to_ten_seconds() {
        let mut doc = base_doc();
        doc["timer"] = json!(600);
        let harness = harness("web-clamp", doc).await;

        let started = tokio::time::Instant::now();
        let params = ManualTriggerParams { ms: Some(60_000) };
        let response = handle_relay_open(State(harness.state.clone()), Query(params)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(started.elapsed(), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn manual_trigger_rejected_near_countdown_end() {
        let mut doc = base_doc();
        doc["timer"] = json!(4);
        let harness = harness("web-timer", doc).await;

        let response =
            handle_relay_open(State(harness.state.clone()), Query(ManualTriggerParams::default()))
                .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(harness.sim.transitions(Pin::new(10).unwrap()), vec![false]);
    }

    #[tokio::test]
    async fn manual_trigger_rejected_on_sensor_fault() {
        let mut doc = base_doc();
        doc["current_temp"] = json!(-127.0);
        let harness = harness("web-fault", doc).await;

        let response =
            handle_relay_open(State(harness.state.clone()), Query(ManualTriggerParams::default()))
                .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "temperature reading is not plausible" })
        );
    }

    #[tokio::test]
    async fn manual_trigger_without_relay_is_unavailable() {
        let mut doc = base_doc();
        doc["RELAY_OPEN_PIN"] = json!(0);
        let harness = harness("web-no-relay", doc).await;

        let response =
            handle_relay_open(State(harness.state.clone()), Query(ManualTriggerParams::default()))
                .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test(start_paused = true)]
    async fn machine_reset_saves_flag_and_reboots() {
        let harness = harness("web-reset", base_doc()).await;

        let response = handle_machine_reset(
            State(harness.state.clone()),
            Json(RestartRequest { boot_normal: false }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "bootNormal": false, "restartScheduled": true })
        );
        assert_eq!(harness.reboot.0.load(Ordering::SeqCst), 0);

        tokio::time::sleep(RESTART_DELAY + Duration::from_millis(10)).await;
        assert_eq!(harness.reboot.0.load(Ordering::SeqCst), 1);

        let saved: Value = serde_json::from_slice(
            &std::fs::read(harness.state.ctx.store.path()).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["boot_normal"], json!(0));
    }

    #[tokio::test]
    async fn status_reflects_the_store() {
        let harness = harness("web-status", base_doc()).await;
        let response = handle_get_status(State(harness.state.clone()))
            .await
            .into_response();
        let status = body_json(response).await;

        assert_eq!(status["currentTemp"], json!(50.0));
        assert_eq!(status["timerSecs"], json!(60));
        assert_eq!(status["category"], json!("LOW"));
        assert_eq!(status["nominalBand"], json!({ "minTemp": 42.0, "maxTemp": 57.0 }));
        assert_eq!(status["lastActuation"], json!(null));
        assert_eq!(status["led"], json!(true));
        assert_eq!(status["backlight"], json!(true));
    }
}
