use anyhow::{bail, Context, Result};
use std::{ops::RangeInclusive, path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{error, info};

use crate::batch::{batches, TileBatch};
use crate::config::Config;
use crate::error::ConfigError;
use crate::pool::WorkerPool;
use crate::progress::{count_tiles, Progress};
use crate::region::Region;
use crate::scheduler::{BatchReport, Scheduler};
use crate::source::{HttpTileSource, TileSource};
use crate::store::TileStore;

/// Totals over all batches of a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunReport {
    pub batches: usize,
    pub stored: u64,
    pub skipped: u64,
    pub http_failures: u64,
    pub transport_failures: u64,
    pub storage_failures: u64,
    pub bytes: u64,
}

impl RunReport {
    fn add(&mut self, batch: &BatchReport) {
        self.batches += 1;
        self.stored += batch.stored;
        self.skipped += batch.skipped;
        self.http_failures += batch.http_failures;
        self.transport_failures += batch.transport_failures;
        self.storage_failures += batch.storage_failures;
        self.bytes += batch.bytes;
    }

    pub fn failed(&self) -> u64 {
        self.http_failures + self.transport_failures + self.storage_failures
    }
}

/// Downloads every tile of the configured regions and zoom levels into the
/// output folder.
///
/// Batches (one region at one zoom level) run one after another, zoom levels
/// outermost, sharing one pool of workers. Tiles already on disk are skipped,
/// so an interrupted run can simply be started again.
///
/// # Example
/// ```rust,no_run
/// use region_tile_downloader::{parse_regions, Config, Downloader, Progress, UrlFormat};
/// use std::{sync::Arc, time::Duration};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let config = Config {
///     regions: parse_regions("aachen:50.7492,6.031,50.811,6.1649")?,
///     workers: 10,
///     output_folder: "./maps".into(),
///     extension: "png".into(),
///     url: UrlFormat::new(
///         "https://{s}.tile.openstreetmap.de/{z}/{x}/{y}.{ext}",
///         "",
///         "",
///         "png",
///         "",
///     )?,
///     timeout: Duration::from_secs(30),
///     min_zoom: 1,
///     max_zoom: 12,
/// };
///
/// let downloader = Downloader::with_http(config)?;
/// let progress = Arc::new(Progress::new(downloader.total_tiles()));
/// let report = downloader.run(&progress).await?;
/// println!("{} tiles stored", report.stored);
/// # Ok(())
/// # }
/// ```
pub struct Downloader {
    regions: Vec<Region>,
    zooms: RangeInclusive<u8>,
    output_folder: PathBuf,
    scheduler: Scheduler,
}

impl Downloader {
    pub fn new(cfg: Config, source: Arc<dyn TileSource>) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let zooms = cfg.zoom_levels();
        let Config {
            regions,
            workers,
            output_folder,
            extension,
            url,
            ..
        } = cfg;

        let scheduler = Scheduler::new(
            WorkerPool::new(workers),
            source,
            Arc::new(TileStore::new(output_folder.clone(), extension)),
            Arc::new(url),
        );

        Ok(Self {
            regions,
            zooms,
            output_folder,
            scheduler,
        })
    }

    /// Creates a downloader fetching over HTTP with the configured timeout.
    pub fn with_http(cfg: Config) -> Result<Self> {
        let source =
            HttpTileSource::new(cfg.timeout).context("failed creating HTTP client")?;
        Ok(Self::new(cfg, Arc::new(source))?)
    }

    /// Creates an iterator over the batches in processing order.
    pub fn batches(&self) -> impl Iterator<Item = TileBatch> + '_ {
        batches(&self.regions, self.zooms.clone())
    }

    pub fn total_tiles(&self) -> u64 {
        count_tiles(&self.regions, self.zooms.clone())
    }

    /// Runs all batches, reporting every finished tile to `progress`.
    ///
    /// Failed tiles are skipped over and counted in the returned report,
    /// storage failures included; the remaining batches still run. An error
    /// means the output folder is unusable or the worker pool broke down.
    pub async fn run(&self, progress: &Arc<Progress>) -> Result<RunReport> {
        let output_folder = self.output_folder.as_path();
        if output_folder.exists() && !output_folder.is_dir() {
            bail!("output {} must be a directory", output_folder.display());
        }

        fs::create_dir_all(output_folder)
            .await
            .context("failed to create root output directory")?;

        let mut report = RunReport::default();
        for batch in self.batches() {
            let batch = Arc::new(batch);
            info!(
                region = %batch.region,
                zoom = batch.zoom,
                "downloading {} tiles ({} columns x {} rows)",
                batch.tile_count(),
                batch.columns(),
                batch.rows(),
            );

            let batch_report = self.scheduler.run_batch(&batch, progress).await?;
            info!(
                region = %batch.region,
                zoom = batch.zoom,
                stored = batch_report.stored,
                skipped = batch_report.skipped,
                failed = batch_report.failed(),
                "batch done"
            );
            report.add(&batch_report);

            if batch_report.storage_failures > 0 {
                error!(
                    region = %batch.region,
                    zoom = batch.zoom,
                    "{} tiles could not be written to {}",
                    batch_report.storage_failures,
                    output_folder.display(),
                );
            }
        }

        Ok(report)
    }
}
