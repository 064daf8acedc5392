use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trader_fleet::cli::{self, CheckRow, Cli, Commands, OutputMode};
use trader_fleet::config::{AppConfig, LoggingConfig};
use trader_fleet::fleet::FleetController;
use trader_fleet::store::PostgresConfigStore;
use trader_fleet::worker::PaperWorkerFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config.logging);

    if let Err(problems) = config.validate() {
        for problem in &problems {
            error!("Invalid configuration: {}", problem);
        }
        anyhow::bail!("{} configuration problem(s)", problems.len());
    }

    let store =
        PostgresConfigStore::new(&config.database.url, config.database.max_connections).await?;
    let fleet = FleetController::new(
        Arc::new(store),
        Arc::new(PaperWorkerFactory),
        config.fleet.clone(),
    );

    match &cli.command {
        Commands::Run { no_restore } => {
            run_fleet(&fleet, config.fleet.restore_on_boot && !*no_restore).await?
        }
        Commands::Check { json, .. } => {
            let scope = match cli.command.scope() {
                Some(scope) => scope,
                None => fleet.fleet_mode().await?.scope(),
            };
            let resolution = fleet.resolve_scope(&scope).await?;
            cli::print_items(
                &CheckRow::from_resolution(&resolution),
                OutputMode::from_json_flag(*json),
            )?;
        }
    }

    Ok(())
}

async fn run_fleet(fleet: &FleetController, restore: bool) -> anyhow::Result<()> {
    let report = fleet.load_from_store().await?;
    info!("Boot load: {}", cli::describe_load(&report));
    for failure in &report.failed {
        warn!(worker_id = %failure.worker_id, "Not loaded: {}", failure.reason);
    }

    if restore {
        let restored = fleet.restore_all(None).await?;
        info!(
            "Restored {}/{} flagged workers",
            restored.started.len(),
            restored.eligible
        );
    }

    info!("Fleet running with {} workers, press Ctrl+C to stop", fleet.registry().len().await);
    shutdown_signal().await;

    info!("Shutting down...");
    let stopped = fleet.stop_all().await;
    info!("Stop requested for {} workers", stopped);
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},trader_fleet=debug,sqlx=warn", logging.level))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
