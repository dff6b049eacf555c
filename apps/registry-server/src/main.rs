use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use health_checker::Prober;
use health_supervisor::Supervisor;
use registry_bootstrap::{AcceptReq, Config, Db};
use registry_core::{registration_bus, InMemoryStore, ProbeCanceller, SqliteStore, Store};
use registry_ctrl::Controller;
use tokio_util::sync::CancellationToken;

/// Path to the SQLite database file used by the durable backend.
const SQLITE_PATH: &str = "discovery.db";

#[derive(Parser)]
#[command(name = "registry-server")]
#[command(about = "Service registry and health-supervision server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(default_value = "local.config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    registry_bootstrap::logging::init(&config.server.mode);

    tracing::info!(
        "starting server on {}://{}:{}",
        config.server.scheme,
        config.server.domain,
        config.server.port
    );

    let store: Arc<dyn Store> = match config.db {
        Db::InMem => Arc::new(InMemoryStore::new()),
        Db::Sqlite => Arc::new(
            SqliteStore::connect(SQLITE_PATH)
                .await
                .context("failed to open sqlite store")?,
        ),
    };

    let (bus_tx, bus_rx) = registration_bus(64);
    let cancel = CancellationToken::new();

    let prober = match config.checker.req {
        AcceptReq::Http => Prober::http(),
        AcceptReq::Grpc => Prober::grpc(),
    };

    let supervisor = Arc::new(Supervisor::new(
        store.clone(),
        prober,
        config.checker.max_retries_req,
        config.cooldown(),
        cancel.clone(),
    ));

    let probe_canceller: Arc<dyn ProbeCanceller> = supervisor.clone();
    let ctrl = Arc::new(Controller::with_probe_canceller(
        store.clone(),
        bus_tx,
        probe_canceller,
    ));

    let supervisor_handle = tokio::spawn(supervisor.run(bus_rx));

    let front_end_handle = {
        let ctrl = ctrl.clone();
        let cancel = cancel.clone();
        let port = config.server.port;
        match config.accept_req {
            AcceptReq::Http => tokio::spawn(async move { http_front::serve(ctrl, port, cancel).await }),
            AcceptReq::Grpc => tokio::spawn(async move { grpc_front::serve(ctrl, port, cancel).await }),
        }
    };

    registry_bootstrap::wait_for_shutdown().await?;

    cancel.cancel();

    match front_end_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "front-end server exited with an error"),
        Err(e) => tracing::error!(error = %e, "front-end task panicked"),
    }
    if let Err(e) = supervisor_handle.await {
        tracing::error!(error = %e, "supervisor task panicked");
    }

    store.close().await.ok();
    tracing::info!("shut down gracefully");

    Ok(())
}
