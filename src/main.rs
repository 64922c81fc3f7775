use chrono::Local;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::fs;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use water_tracker::gauge::{
    start_loop, CancelToken, Dimensions, DrivenScheduler, Gauge, GaugeConfig, GaugeEngine,
    SvgSurface, ThemeColors,
};
use water_tracker::{load_data, persist_data, router, AppState, Config, Tracker};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    if let Some(parent) = config.data_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let store = load_data(&config.data_path).await;
    let mut tracker = Tracker::open(store, Local::now());
    if tracker.take_dirty() {
        persist_data(&config.data_path, tracker.store()).await?;
    }

    let engine = GaugeEngine::new(
        GaugeConfig {
            easing: config.easing,
            ..GaugeConfig::default()
        },
        tracker.level_reading(),
    );
    let surface = SvgSurface::new(Dimensions::default(), ThemeColors::default());
    let gauge = Arc::new(Mutex::new(Gauge::new(engine, surface)));
    // The page's animation frames advance this scheduler through /api/gauge/frame.
    let mut scheduler = DrivenScheduler::new();
    let frames = start_loop(&mut scheduler, Arc::clone(&gauge), tracker.level());

    let state = AppState::new(config.data_path.clone(), tracker, gauge, scheduler);
    let app = router(state);

    let addr = SocketAddr::new(config.bind, config.port);
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(frames))
        .await?;

    Ok(())
}

async fn shutdown_signal(frames: CancelToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    frames.cancel();
}
