use std::sync::Arc;

use clap::Parser;
use timeline_core::AppConfig;
use timeline_crypto::PayloadEncryptor;
use timeline_scheduler::{Scheduler, SchedulerConfig};
use timeline_server::{router, AppState};
use timeline_store::{MetadataStore, SnapshotStore};
use timeline_store_memory::{MemoryMetadataStore, MemorySnapshotStore};
use timeline_store_postgres::{PgMetadataStore, PgSnapshotStore};
use tokio::sync::mpsc;
use tracing::info;

/// Runs the timeline pipeline: the scheduler tick loop and the HTTP
/// read surface share one store pair and run side by side until
/// shutdown.
#[derive(Parser, Debug)]
#[command(name = "timeline-server", about = "Media timeline aggregation server")]
struct Cli {
    /// Address to bind the HTTP read surface to.
    #[arg(long, default_value = "0.0.0.0:8787")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(AppConfig::from_env()?);

    let (metadata, snapshots): (Arc<dyn MetadataStore>, Arc<dyn SnapshotStore>) = match &config.database_url {
        Some(database_url) => {
            let pool = timeline_store_postgres::connect(database_url).await?;
            (Arc::new(PgMetadataStore::new(pool.clone())), Arc::new(PgSnapshotStore::new(pool)))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory stores");
            (Arc::new(MemoryMetadataStore::new()), Arc::new(MemorySnapshotStore::new()))
        }
    };

    let encryptor = Arc::new(PayloadEncryptor::from_password(&config.encryption_key));

    let scheduler = Scheduler::new(metadata.clone(), snapshots.clone(), encryptor.clone(), SchedulerConfig::from(config.as_ref()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let scheduler_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let state = AppState { metadata, snapshots, encryptor, http: reqwest::Client::new(), config: config.clone() };
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    info!(bind = %cli.bind, "timeline-server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    let _ = shutdown_tx.send(()).await;
    scheduler_handle.await?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
}
