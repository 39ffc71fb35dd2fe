mod config;
mod fleet;
mod geo;
mod motion;
mod session;
mod sync;

use anyhow::Result;
use config::FleetConfig;
use fleet::FleetRegistry;
use geo::GeoProjector;
use session::{ClientSession, SessionManager};
use std::sync::Arc;
use std::time::Duration;
use sync::FleetSynchronizer;
use sweep_shared::tuning;
use tokio::net::TcpListener;
use tokio::time::interval;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = FleetConfig::default();
    info!(
        "Fleet coordinator starting: {} drones sweeping a {}x{} area",
        config.drones, config.size, config.size
    );
    info!(
        "  origin: ({}, {}), scale: {} deg/unit",
        config.origin_lat, config.origin_lng, config.scale_factor
    );

    let projector = GeoProjector::new(config.origin_lat, config.origin_lng, config.scale_factor)?;
    let registry = FleetRegistry::new(&config);
    let sessions = Arc::new(SessionManager::new());
    let synchronizer = Arc::new(FleetSynchronizer::new(registry, projector, sessions.clone()));

    // Fixed-rate tick loop; all agent motion advances here
    let tick_sync = synchronizer.clone();
    tokio::spawn(async move {
        let dt = tuning::TICK_INTERVAL_MS as f64 / 1000.0;
        let mut ticker = interval(Duration::from_millis(tuning::TICK_INTERVAL_MS));
        loop {
            ticker.tick().await;
            tick_sync.tick(dt).await;
        }
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        info!(%addr, "dashboard client connected");

        let sessions = sessions.clone();
        let synchronizer = synchronizer.clone();
        tokio::spawn(async move {
            let client_id = sessions.next_client_id();
            let mut session = ClientSession::new(stream, addr, client_id);
            sessions.register(session.handle()).await;

            // Seed the new client with current positions so it renders
            // the fleet before the first tick lands
            synchronizer.greet(&session.handle()).await;

            while let Some(message) = session.recv().await {
                synchronizer.handle_message(message).await;
            }

            sessions.unregister(client_id).await;
            info!(%addr, "dashboard client disconnected");
        });
    }
}
