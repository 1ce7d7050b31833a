//! news-watch - announces new 5IC Udine homepage posts on Telegram.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_watch::{Pipeline, ScheduleConfig, Scheduler, WatchConfig};

/// Watch the school homepage and announce new posts.
///
/// Configuration comes from the environment: TELEGRAM_BOT_TOKEN,
/// TELEGRAM_BOT_CHATID, CSV_FILE_PATH and optionally
/// SCHEDULE_INTERVAL_SECONDS, SCHOOL_URL, DELIVERY_MODE, HTTP_TIMEOUT_SECONDS.
#[derive(Parser)]
#[command(name = "news-watch")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run a single poll cycle and exit (for CronJob use)
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = WatchConfig::from_env().context("failed to load configuration")?;
    info!(
        school_url = %config.school_url,
        store = %config.store_path.display(),
        interval_secs = config.interval.as_secs(),
        delivery = %config.delivery,
        "Starting news-watch"
    );

    let pipeline = Pipeline::from_config(&config)?;
    info!(recorded = pipeline.store().len()?, "Loaded dedup store");

    if cli.once {
        let result = pipeline.poll_cycle().await?;
        if !result.errors.is_empty() {
            anyhow::bail!(
                "{} of {} new posts could not be announced",
                result.failed,
                result.failed + result.sent
            );
        }
        return Ok(());
    }

    let scheduler = Scheduler::new(
        Arc::new(pipeline),
        ScheduleConfig::with_interval(config.interval),
    );
    let shutdown = CancellationToken::new();

    let mut handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { scheduler.run(shutdown).await }
    });

    tokio::select! {
        () = shutdown_signal() => {
            shutdown.cancel();
            (&mut handle).await??;
        }
        result = &mut handle => {
            result??;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "news_watch=debug,notify=debug,info"
    } else {
        "news_watch=info,notify=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
