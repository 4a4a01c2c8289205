use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use logwatch_core::{
    pipeline_from_config, Config, LogLevel, LogStore, LogWindow, RealtimeMonitor, RealtimeStreamer,
    RemoteLogClient, TracingAlertSink,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

mod output;

#[derive(Parser)]
#[command(name = "logwatch")]
#[command(about = "Fetch, analyze and watch logs of hosted services", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List services visible to the configured API key
    Services {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show recent logs of a service
    Logs {
        service_id: String,

        /// How far back to look
        #[arg(long, default_value = "1", value_parser = hours_parser())]
        hours: u32,

        /// Maximum number of entries to request
        #[arg(long)]
        limit: Option<usize>,

        /// Only show entries of this level (error, warning, info, debug)
        #[arg(long)]
        level: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Analyze recent logs of a service and report anomalies
    Analyze {
        service_id: String,

        #[arg(long, default_value = "1", value_parser = hours_parser())]
        hours: u32,

        #[arg(long)]
        json: bool,
    },

    /// Follow a service in realtime, archiving every entry and alerting on errors
    Watch {
        service_id: String,

        /// Alert target (defaults to the configured one)
        #[arg(long)]
        target: Option<String>,

        /// Disable the periodic retention task
        #[arg(long)]
        no_retention: bool,
    },

    /// Query the local archive
    History {
        service_id: Option<String>,

        #[arg(long, default_value = "24", value_parser = hours_parser())]
        hours: u32,

        #[arg(long)]
        level: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Delete archived entries older than the given horizon
    Purge {
        /// Horizon in hours (defaults to the configured retention)
        #[arg(long, value_parser = hours_parser())]
        hours: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Services { json } => services(&config, json).await,
        Commands::Logs {
            service_id,
            hours,
            limit,
            level,
            json,
        } => logs(&config, &service_id, hours, limit, level.as_deref(), json).await,
        Commands::Analyze {
            service_id,
            hours,
            json,
        } => analyze(&config, &service_id, hours, json).await,
        Commands::Watch {
            service_id,
            target,
            no_retention,
        } => watch_service(&config, &service_id, target, !no_retention).await,
        Commands::History {
            service_id,
            hours,
            level,
            json,
        } => history(&config, service_id.as_deref(), hours, level.as_deref(), json).await,
        Commands::Purge { hours } => purge(&config, hours).await,
    }
}

/// Whole hours, at least one.
fn hours_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..)
}

fn parse_level(level: Option<&str>) -> Result<Option<LogLevel>> {
    level.map(|l| l.parse::<LogLevel>()).transpose()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_store(config: &Config) -> Result<LogStore> {
    LogStore::open_with(
        config.store.resolved_database_path(),
        config.store.pool_settings(),
    )
    .await
}

async fn services(config: &Config, json: bool) -> Result<()> {
    let pipeline = pipeline_from_config(config)?;
    let services = pipeline.services().await?;

    if json {
        return print_json(&services);
    }
    if let Some(failure) = &services.failure {
        eprintln!("Could not list services: {}", failure);
    }
    print!("{}", output::ServiceTable(&services.items));
    Ok(())
}

async fn logs(
    config: &Config,
    service_id: &str,
    hours: u32,
    limit: Option<usize>,
    level: Option<&str>,
    json: bool,
) -> Result<()> {
    let level = parse_level(level)?;
    let mut pipeline = pipeline_from_config(config)?;
    if let Some(limit) = limit {
        pipeline = pipeline.with_fetch_limit(limit);
    }

    let mut fetched = pipeline
        .recent_logs(service_id, LogWindow::trailing_hours(hours))
        .await?;
    if let Some(level) = level {
        fetched.items.retain(|entry| entry.level() == level);
    }

    if json {
        return print_json(&fetched);
    }
    if let Some(failure) = &fetched.failure {
        eprintln!("Could not fetch logs: {}", failure);
    }
    print!("{}", output::EntryList(&fetched.items));
    Ok(())
}

async fn analyze(config: &Config, service_id: &str, hours: u32, json: bool) -> Result<()> {
    let pipeline = pipeline_from_config(config)?;
    let report = pipeline
        .report(service_id, LogWindow::trailing_hours(hours))
        .await?;

    if json {
        return print_json(&report);
    }
    print!("{}", output::ReportText(&report));
    Ok(())
}

async fn watch_service(
    config: &Config,
    service_id: &str,
    target: Option<String>,
    retention: bool,
) -> Result<()> {
    let client = RemoteLogClient::from_config(&config.remote)?;
    let store = open_store(config).await?;

    let target = target
        .or_else(|| config.alerts.target.clone())
        .unwrap_or_else(|| "default".to_string());

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let retention_task = retention.then(|| {
        let store = store.clone();
        let hours = config.store.retention_hours;
        let every = std::time::Duration::from_secs(config.store.retention_interval_secs.max(1));
        let mut cancel = cancel_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = store.purge_older_than(hours).await {
                            warn!("Retention purge failed: {:#}", e);
                        }
                    }
                    _ = cancel.changed() => break,
                }
            }
        })
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, stopping"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        let _ = cancel_tx.send(true);
    });

    let streamer = RealtimeStreamer::new(client, service_id, config.stream.clone());
    let monitor = RealtimeMonitor::new(store, TracingAlertSink, target);
    let summary = monitor.run(streamer, cancel_rx).await;

    if let Some(task) = retention_task {
        task.abort();
    }

    println!(
        "Watched {}: {} received, {} archived, {} alerts, {} failed polls",
        service_id, summary.received, summary.stored, summary.alerted, summary.failed_cycles
    );
    if let Some(failure) = &summary.last_failure {
        eprintln!("Last poll failure: {}", failure);
    }
    Ok(())
}

async fn history(
    config: &Config,
    service_id: Option<&str>,
    hours: u32,
    level: Option<&str>,
    json: bool,
) -> Result<()> {
    let level = parse_level(level)?;
    let store = open_store(config).await?;
    let entries = store
        .query(service_id, hours, level)
        .await
        .context("Failed to read archive")?;

    if json {
        return print_json(&entries);
    }
    print!("{}", output::EntryList(&entries));
    Ok(())
}

async fn purge(config: &Config, hours: Option<u32>) -> Result<()> {
    let hours = hours.unwrap_or(config.store.retention_hours);
    let store = open_store(config).await?;
    let removed = store.purge_older_than(hours).await?;
    println!("Purged {} entries older than {} hours", removed, hours);
    Ok(())
}
