use ramadan_companion::prayer::PrayerService;
use ramadan_companion::remote::{HttpRemote, RemoteStore};
use ramadan_companion::stats::local_today;
use ramadan_companion::{AppState, Config, Ledger, load_data, router};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    if let Some(parent) = config.data_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let store = load_data(&config.data_path).await;
    let ledger = Ledger::load(store);
    info!(streak = ledger.streak(local_today()), "ledger loaded from {}", config.data_path.display());

    let remote: Option<Arc<dyn RemoteStore>> = match config.remote_url.as_deref() {
        Some(url) => Some(Arc::new(HttpRemote::new(url)?)),
        None => {
            warn!("REMOTE_STORE_URL not set, remote sync disabled");
            None
        }
    };

    let state = AppState::new(
        config.data_path.clone(),
        ledger,
        PrayerService::new(config.prayer.clone()),
        remote,
    );
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
