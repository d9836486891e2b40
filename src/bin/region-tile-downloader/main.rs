mod args;
mod validators;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use args::Args;
use region_tile_downloader::{count_tiles, Config, Downloader, Progress, ProgressEvent};

/// Rough tile size used for the dry run estimate.
const BYTES_PER_TILE: f64 = 10_000_f64;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = Args::parse()?;
    let dry = args.dry_run;
    let config = Config::try_from(args)?;

    if dry {
        dry_run(&config);
        return Ok(());
    }

    let downloader = Downloader::with_http(config)?;

    let total = downloader.total_tiles();
    info!("{} tiles in total", total);

    let (progress, events) = Progress::with_events(total);
    let progress = Arc::new(progress);
    let display = tokio::spawn(show_progress(progress_bar(total)?, events));

    let result = downloader.run(&progress).await;
    // last sender gone, the display task drains and exits
    drop(progress);
    display.await?;

    let report = result?;
    info!(
        "stored {} tiles ({}), skipped {} already present",
        report.stored,
        pretty_bytes::converter::convert(report.bytes as f64),
        report.skipped,
    );
    if report.failed() > 0 {
        warn!(
            "{} tiles failed ({} HTTP errors, {} transport errors, {} storage errors), run again to retry",
            report.failed(),
            report.http_failures,
            report.transport_failures,
            report.storage_failures,
        );
    }
    if report.storage_failures > 0 {
        bail!(
            "{} tiles could not be written, check the output folder",
            report.storage_failures
        );
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn dry_run(config: &Config) {
    for batch in config.batches() {
        eprintln!(
            "zoom {:>2} {}: {} tiles ({} columns x {} rows)",
            batch.zoom,
            batch.region,
            batch.tile_count(),
            batch.columns(),
            batch.rows(),
        );
    }

    let tile_count = count_tiles(&config.regions, config.zoom_levels());
    eprintln!(
        "would download {} tiles (approx {}, assuming 10 kb per tile)",
        tile_count,
        pretty_bytes::converter::convert((tile_count as f64) * BYTES_PER_TILE)
    );
}

fn progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} ETA: {eta} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

async fn show_progress(pb: ProgressBar, mut events: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ProgressEvent::BatchStarted { region, zoom, .. } => {
                pb.set_message(format!("{} z{}", region, zoom));
            }
            ProgressEvent::TileFinished(tile) => {
                pb.inc(1);
                pb.set_message(tile.to_string());
            }
            ProgressEvent::BatchFinished(_) => {}
        }
    }

    pb.finish_and_clear();
}
