//! # Catalog Sync Main Entry Point
//!
//! Runs the admin API together with the daily sync scheduler, or performs a
//! single sync or import from the command line.

use std::sync::Arc;

use anyhow::{Context, Result};
use catalog_sync::{
    config::ConfigLoader,
    db,
    import::ImportOutcome,
    seeds::seed_platforms,
    server::{AppState, run_server},
    telemetry,
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "catalog-sync", version, about = "Game catalog import and sync service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Serve the admin API and run the daily sync scheduler (default)
    Serve,
    /// Sync every stale imported product now and print the count
    SyncNow,
    /// Import games by their game database ids
    Import {
        /// Game database ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Refresh the local genre table from the game database
    RefreshGenres,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing tracing")?;

    if let Ok(redacted_json) = config.redacted_json() {
        info!(profile = %config.profile, configuration = %redacted_json, "Loaded configuration");
    }
    if !config.igdb.has_credentials() {
        warn!("Game database credentials are not configured; imports and syncs will be rejected");
    }

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await.context("running migrations")?;
    seed_platforms(&db).await.context("seeding platforms")?;

    let state = AppState::new(config, db).context("building application state")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state).await,
        Commands::SyncNow => {
            let synced = state.scheduler.manual_trigger().await?;
            println!("Synced {synced} products");
            Ok(())
        }
        Commands::Import { ids } => {
            let report = state.orchestrator.import_games_batch(&ids).await;
            for outcome in &report.outcomes {
                match outcome {
                    ImportOutcome::Imported { external_id, product } => {
                        println!("{external_id}\timported\t{}", product.id)
                    }
                    ImportOutcome::Existing { external_id, product } => {
                        println!("{external_id}\texisting\t{}", product.id)
                    }
                    ImportOutcome::Failed { external_id, reason } => {
                        println!("{external_id}\tfailed\t{reason}")
                    }
                }
            }
            println!(
                "{} succeeded, {} failed",
                report.succeeded(),
                report.failed()
            );
            Ok(())
        }
        Commands::RefreshGenres => {
            let created = state.orchestrator.refresh_genres().await?;
            println!("Created {created} genres");
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> Result<()> {
    let shutdown = CancellationToken::new();

    let scheduler = Arc::clone(&state.scheduler);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.child_token()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        signal_token.cancel();
    });

    let result = run_server(state, shutdown.clone()).await;
    shutdown.cancel();
    if let Err(err) = scheduler_handle.await {
        warn!(error = %err, "Scheduler task ended abnormally");
    }
    result
}
