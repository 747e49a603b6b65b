// ABOUTME: Command-line entry point for running a sync and printing training load reports
// ABOUTME: Builds the Strava client from environment credentials; Ctrl-C cancels a running sync
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Fetch new activities, streams, metrics, and rebuild training load
//! fitness-sync sync
//!
//! # Print the latest training load and trends
//! fitness-sync report
//!
//! # Same, as JSON
//! fitness-sync report --json
//!
//! # Use an alternate database
//! fitness-sync --database-url sqlite:/tmp/fitness.db sync
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use fitness_intelligence::{FitnessSnapshot, MetricsEngine};
use fitness_providers::{
    initialize_shared_client, shared_client, RateLimiter, RefreshingTokenProvider,
    StaticTokenProvider, StravaClient, TokenProvider,
};
use fitness_sync::config::{ServerConfig, StravaCredentials};
use fitness_sync::database::{open_repository, SyncRepository};
use fitness_sync::logging;
use fitness_sync::sync::{ProgressReporter, SyncOrchestrator, SyncReport};
use fitness_sync::CancellationToken;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "fitness-sync",
    about = "Activity sync and training load analysis",
    long_about = "Fetches activity summaries and streams from Strava under its rate limits, \
                  computes aerobic efficiency metrics, and maintains a daily training load series."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override (`sqlite:...` or `memory`)
    #[arg(long, global = true)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full sync pipeline
    Sync,

    /// Print the latest training load and trends from storage
    Report {
        /// Emit the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_from_env()?;

    let mut config = ServerConfig::from_env()?;
    if let Some(database_url) = cli.database_url {
        config.database_url = database_url;
    }

    let repository = open_repository(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    match cli.command {
        Command::Sync => run_sync(&config, repository).await,
        Command::Report { json } => print_report(repository.as_ref(), json).await,
    }
}

async fn run_sync(config: &ServerConfig, repository: Arc<dyn SyncRepository>) -> Result<()> {
    initialize_shared_client(config.strava.http);
    let http = shared_client().clone();
    let tokens: Arc<dyn TokenProvider> = match &config.strava.credentials {
        Some(StravaCredentials::Refreshing {
            oauth,
            access_token,
        }) => {
            let provider =
                RefreshingTokenProvider::new(http.clone(), &config.strava.token_url, oauth.clone());
            Arc::new(match access_token {
                Some(token) => provider.with_access_token(token, None),
                None => provider,
            })
        }
        Some(StravaCredentials::Static(token)) => Arc::new(StaticTokenProvider::new(token)),
        None => {
            return Err(anyhow!(
                "no Strava credentials: set STRAVA_ACCESS_TOKEN or STRAVA_CLIENT_ID, \
                 STRAVA_CLIENT_SECRET and STRAVA_REFRESH_TOKEN"
            ))
        }
    };

    let client = StravaClient::new(
        http,
        &config.strava.base_url,
        Arc::new(RateLimiter::new(config.rate_limit)),
        tokens,
    );

    let (reporter, mut events) = ProgressReporter::channel(config.sync.progress_buffer);
    let orchestrator = SyncOrchestrator::new(
        Arc::new(client),
        repository,
        MetricsEngine::new(config.heart_rate),
        config.sync,
    )
    .with_progress(reporter);

    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{event}");
        }
    });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling sync");
            on_signal.cancel();
        }
    });

    let outcome = orchestrator.run(&cancel).await;
    drop(orchestrator);
    if let Err(e) = drain.await {
        warn!("progress printer stopped: {e}");
    }

    match outcome {
        Ok(report) => {
            print_sync_report(&report);
            Ok(())
        }
        Err(e) => {
            print_sync_report(e.partial_report());
            if e.is_cancelled() {
                info!("sync cancelled; persisted progress is kept");
                Ok(())
            } else {
                error!("sync failed: {e}");
                Err(e.into())
            }
        }
    }
}

fn print_sync_report(report: &SyncReport) {
    for phase in [&report.activities, &report.streams, &report.metrics] {
        println!(
            "{:<10} ok={} skipped={} failed={}",
            phase.phase.to_string(),
            phase.succeeded(),
            phase.skipped(),
            phase.failed()
        );
    }
    println!("training load rows: {}", report.trends_rows);
    if !report.watermark_advanced {
        println!("summary watermark not advanced; next sync retries the same window");
    }
    if let Some(snapshot) = &report.snapshot {
        print_snapshot(snapshot);
    }
}

async fn print_report(repository: &dyn SyncRepository, json: bool) -> Result<()> {
    let rows = repository.get_daily_training_loads().await?;
    let days = repository.get_all_daily_impulse().await?;

    let Some(snapshot) = FitnessSnapshot::build(&rows, &days) else {
        println!("no training load yet; run `fitness-sync sync` first");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if let Some(watermark) = repository.get_sync_watermark().await? {
        println!("last summary sync: {watermark}");
    }
    print_snapshot(&snapshot);
    Ok(())
}

fn print_snapshot(snapshot: &FitnessSnapshot) {
    let latest = &snapshot.latest;
    println!(
        "{}  CTL {:.1}  ATL {:.1}  TSB {:.1}  ({:?}, {})",
        latest.date,
        latest.ctl,
        latest.atl,
        latest.tsb,
        snapshot.status,
        snapshot.status.advice(),
    );
    println!("7-day distance: {:.1} km", latest.distance_7d_meters / 1000.0);
    if let Some(efficiency) = latest.efficiency_7d {
        println!("7-day efficiency factor: {efficiency:.2}");
    }
    println!(
        "fitness trend: {:?} ({:+.1}%, R² {:.2})",
        snapshot.fitness_trend.direction,
        snapshot.fitness_trend.percent_change,
        snapshot.fitness_trend.r_squared,
    );
    println!(
        "efficiency trend: {:?} ({:+.1}%, R² {:.2})",
        snapshot.efficiency_trend.direction,
        snapshot.efficiency_trend.percent_change,
        snapshot.efficiency_trend.r_squared,
    );
}
