use std::{
    future::IntoFuture,
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use hotwater_common::{KEY_LCD_COLS, KEY_LCD_ROWS, KEY_LOG_LEVEL};

use crate::{
    boot::{self, FaultLog, ProcessRestart, Reboot},
    clock::TokioClock,
    display::{TextDisplay, MAX_COLS, MAX_ROWS},
    hardware::{
        sim::{SimBackend, DEFAULT_TEMPERATURE_C},
        Hardware,
    },
    logging::{self, DEFAULT_LOG_LEVEL},
    scheduler::ControlContext,
    store::ConfigStore,
    web::{self, AppState},
};

const CONFIG_FILE: &str = "config.json";
const FAULT_LOG_FILE: &str = "error.log";

pub async fn run() -> anyhow::Result<()> {
    let log = logging::init();

    let data_dir = std::env::var("HOTWATER_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.hotwater"));
    let store = Arc::new(ConfigStore::load(data_dir.join(CONFIG_FILE)).await);
    log.apply(&store.get_str(KEY_LOG_LEVEL, DEFAULT_LOG_LEVEL).await);

    let sim_temp_c = match std::env::var("HOTWATER_SIM_TEMP_C") {
        Ok(raw) => raw.parse::<f32>().unwrap_or_else(|err| {
            warn!("ignoring HOTWATER_SIM_TEMP_C={raw:?}: {err}");
            DEFAULT_TEMPERATURE_C
        }),
        Err(_) => DEFAULT_TEMPERATURE_C,
    };
    info!("simulated sensors report {sim_temp_c:.1} °C");
    let backend = Arc::new(SimBackend::with_default_temperature(sim_temp_c));
    let hardware = Arc::new(Hardware::new(backend, Arc::clone(&store)));

    let display = Arc::new(TextDisplay::new(
        store.get_int(KEY_LCD_COLS, MAX_COLS as i64).await,
        store.get_int(KEY_LCD_ROWS, MAX_ROWS as i64).await,
    ));
    let ctx = ControlContext::new(store, hardware, display, Arc::new(TokioClock::new()));
    let reboot: Arc<dyn Reboot> = Arc::new(ProcessRestart);

    let app = web::router(AppState::new(ctx.clone(), log, Arc::clone(&reboot)));
    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;
    info!("controller listening on http://{addr}");

    let fault_log = FaultLog::new(data_dir.join(FAULT_LOG_FILE));
    tokio::select! {
        served = axum::serve(listener, app).into_future() => {
            served.context("management server stopped")?;
        }
        message = boot::supervise(ctx, &fault_log, reboot.as_ref()) => {
            anyhow::bail!("control task stopped: {message}");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("shutting down");
        }
    }
    Ok(())
}
