use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use ephemera_server::api::AppState;
use ephemera_server::asset_factory::create_asset_store;
use ephemera_server::config::EphemeraConfig;
use ephemera_server::templates::Templates;
use ephemera_store::{EphemeralStore, LifecycleService};
use ephemera_sweeper::{SweepConfig, SweepProcessorBuilder};

/// Ephemera HTTP server.
#[derive(Parser, Debug)]
#[command(name = "ephemera-server", about = "Share images that self-destruct after viewing")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "ephemera.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let config_found = Path::new(&cli.config).exists();
    let config: EphemeraConfig = if config_found {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };

    ephemera_server::telemetry::init(&config.logging);

    if !config_found {
        info!(path = %cli.config, "config file not found, using defaults");
    }
    config.validate()?;

    let policy = config.lifecycle.policy();
    info!(
        view_seconds = policy.view_duration.as_secs(),
        unviewed_expiry_seconds = policy.unviewed_expiry.as_secs(),
        cleanup_interval_seconds = policy.cleanup_interval.as_secs(),
        "lifecycle policy"
    );

    let assets = create_asset_store(&config.storage).await?;
    let store = EphemeralStore::new(Arc::clone(&assets), policy);
    let service = LifecycleService::new(store.clone());

    // Start the unviewed sweep.
    let (mut sweeper, sweep_shutdown) = SweepProcessorBuilder::new()
        .config(SweepConfig {
            interval: policy.cleanup_interval,
            enabled: true,
        })
        .store(store.clone())
        .build()?;
    let sweep_handle = tokio::spawn(async move { sweeper.run().await });

    let state = AppState {
        service,
        assets,
        templates: Arc::new(Templates::new()?),
        external_url: config.server.external_url.clone(),
        max_upload_bytes: config.storage.max_upload_bytes,
    };
    let app = ephemera_server::api::router(state);

    // Resolve the bind address (CLI overrides take precedence).
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "ephemera-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if sweep_shutdown.send(()).await.is_err() {
        warn!("sweep processor already stopped");
    }
    if let Err(e) = sweep_handle.await {
        warn!(error = %e, "sweep processor task failed");
    }

    // Records are memory-only; whatever is still live is lost on exit.
    info!(live_assets = store.len(), "ephemera-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
