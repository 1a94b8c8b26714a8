//! Dashlink Server
//!
//! Run with: cargo run --bin dashlink -- --config dashlink.toml
//!
//! # Configuration
//!
//! Read from `--config`, or the first of `~/.config/dashlink/config.toml`,
//! `/etc/dashlink/config.toml`, `./config.toml`. Environment variables
//! override file values:
//! - `DASHLINK_HOST`, `DASHLINK_PORT`, `DASHLINK_STATIC_DIR`
//! - `DASHLINK_OBD_PATH`, `DASHLINK_OBD_SIMULATED`, `DASHLINK_CAMERA_PATH`
//! - `DASHLINK_LOG_LEVEL`, `DASHLINK_LOG_FORMAT`
//! - `RUST_LOG`: overrides the log filter entirely

use clap::Parser;
use dashlink::api::{bind, build_router, serve, shutdown_signal, AppState};
use dashlink::config::Config;
use dashlink::hub::{BroadcastScheduler, ConnectionRegistry, HubConfig, ShutdownCoordinator};
use dashlink::snapshot::SnapshotBuilder;
use dashlink::sources::{
    probe_camera, DeviceCamera, DiagnosticsSource, MediaSubscription, NullPlayer,
    OfflineDiagnostics, PlayerControl, PlayerFeed, SimulatedDiagnostics, SimulatedPlayer,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Time allowed for in-flight HTTP requests once the listener has stopped
const SERVER_STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "dashlink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live telemetry hub for the in-car dashboard")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Config loading logs to a plain stderr subscriber until the configured
    // one exists
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "dashlink=info".into()),
        )
        .with_writer(std::io::stderr)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || match &args.config {
        Some(path) => Config::load_with_env(path),
        None => Ok(Config::load_default()),
    })?;

    if args.print_config {
        println!("{:#?}", config);
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing(&config);

    tracing::info!("Starting Dashlink v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &args.config {
        tracing::info!("Config file: {:?}", path);
    }

    // Camera is probed once; it only matters when marked required
    let camera = DeviceCamera::new(&config.camera.device_path);
    probe_camera(&camera, config.camera.required).await?;

    let diagnostics: Arc<dyn DiagnosticsSource> = if config.diagnostics.simulated {
        tracing::info!("Using simulated diagnostics");
        Arc::new(SimulatedDiagnostics::new())
    } else {
        tracing::warn!(
            device = %config.diagnostics.device_path.display(),
            "No diagnostics driver available, vehicle panel will stay empty"
        );
        Arc::new(OfflineDiagnostics::new(format!(
            "no diagnostics driver for {}",
            config.diagnostics.device_path.display()
        )))
    };

    let feed: Arc<dyn PlayerFeed>;
    let player: Arc<dyn PlayerControl>;
    match config.media.player.as_str() {
        "simulated" => {
            let simulated = Arc::new(SimulatedPlayer::new());
            feed = simulated.clone();
            player = simulated;
        }
        other => {
            if other != "none" {
                tracing::warn!(player = other, "Unknown media player, music panel disabled");
            }
            feed = Arc::new(NullPlayer);
            player = Arc::new(NullPlayer);
        }
    }

    let (subscription, media) = MediaSubscription::new(feed, config.media.refresh_interval());
    let media_handle = subscription.start();

    let registry = Arc::new(ConnectionRegistry::new(HubConfig {
        max_connections: config.broadcast.max_connections,
        ..Default::default()
    }));
    let builder = Arc::new(SnapshotBuilder::new(
        diagnostics,
        media.clone(),
        config.broadcast.build_timeout(),
    ));

    let scheduler = Arc::new(BroadcastScheduler::new(
        Arc::clone(&builder),
        Arc::clone(&registry),
        config.broadcast.interval(),
    ));
    let broadcast_handle = scheduler.start();

    let state = AppState::new(Arc::clone(&registry), builder, media, player);
    let router = build_router(state, config.server.static_dir.clone());

    let listener = bind(&config.server).await?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server_handle = tokio::spawn(serve(listener, router, async move {
        let _ = stop_rx.await;
    }));

    let server_running = tokio::select! {
        _ = shutdown_signal() => true,
        result = &mut server_handle => {
            match result {
                Ok(Ok(())) => tracing::error!("Server exited unexpectedly"),
                Ok(Err(e)) => tracing::error!(error = %e, "Server failed"),
                Err(e) => tracing::error!(error = %e, "Server task panicked"),
            }
            false
        }
    };

    broadcast_handle.abort();
    media_handle.abort();

    // Stop accepting before the drain so no dashboard slips in behind it
    let _ = stop_tx.send(());

    let coordinator = ShutdownCoordinator::new(registry, config.broadcast.shutdown_deadline());
    let outcome = coordinator.drain().await;

    if server_running
        && tokio::time::timeout(SERVER_STOP_GRACE, &mut server_handle)
            .await
            .is_err()
    {
        tracing::warn!("Server did not stop in time, aborting");
        server_handle.abort();
    }

    if outcome.is_graceful() {
        tracing::info!("Dashlink stopped");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("Dashlink stopped with connections still open");
        Ok(ExitCode::FAILURE)
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter_directive().into());

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
