use anyhow::{Context, Result};
use futures::{
    future::{BoxFuture, FutureExt},
    stream::{FuturesUnordered, StreamExt},
};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, warn};

use crate::batch::TileBatch;
use crate::error::FetchError;
use crate::pool::WorkerPool;
use crate::progress::{Progress, TileStatus};
use crate::source::TileSource;
use crate::store::TileStore;
use crate::tile::Tile;
use crate::url::UrlFormat;
use crate::worker::{download, DownloadTask, TileOutcome};

/// What happened to the tiles of one batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchReport {
    pub region: Arc<str>,
    pub zoom: u8,
    pub stored: u64,
    pub skipped: u64,
    /// Non-2xx answers.
    pub http_failures: u64,
    /// Timeouts, connection and body errors, bad URLs and crashed tasks.
    pub transport_failures: u64,
    pub storage_failures: u64,
    pub bytes: u64,
}

impl BatchReport {
    fn new(batch: &TileBatch) -> Self {
        Self {
            region: Arc::clone(&batch.region),
            zoom: batch.zoom,
            stored: 0,
            skipped: 0,
            http_failures: 0,
            transport_failures: 0,
            storage_failures: 0,
            bytes: 0,
        }
    }

    pub fn failed(&self) -> u64 {
        self.http_failures + self.transport_failures + self.storage_failures
    }

    pub fn finished(&self) -> u64 {
        self.stored + self.skipped + self.failed()
    }

    fn record(&mut self, result: &Result<TileOutcome, FetchError>) {
        match result {
            Ok(TileOutcome::Stored { bytes }) => {
                self.stored += 1;
                self.bytes += bytes;
            }
            Ok(TileOutcome::Skipped) => self.skipped += 1,
            Err(FetchError::Status { .. }) => self.http_failures += 1,
            Err(FetchError::Storage(_)) => self.storage_failures += 1,
            Err(FetchError::Transport { .. }) | Err(FetchError::Url(_)) => {
                self.transport_failures += 1
            }
        }
    }
}

type Settled = (Tile, Result<Result<TileOutcome, FetchError>, JoinError>);

/// Submitted tasks of a batch whose results were not collected yet.
#[derive(Default)]
struct InFlight {
    tasks: FuturesUnordered<BoxFuture<'static, Settled>>,
}

impl InFlight {
    fn push(&mut self, tile: Tile, handle: JoinHandle<Result<TileOutcome, FetchError>>) {
        self.tasks.push(async move { (tile, handle.await) }.boxed());
    }

    /// Takes the result of a task that already finished, without waiting.
    fn try_next(&mut self) -> Option<Settled> {
        self.tasks.next().now_or_never().flatten()
    }

    async fn next(&mut self) -> Option<Settled> {
        self.tasks.next().await
    }

    fn len(&self) -> usize {
        self.tasks.len()
    }
}

/// Everything a fetch worker needs, shared between all of a run's tasks.
#[derive(Clone)]
pub struct Scheduler {
    pool: WorkerPool,
    source: Arc<dyn TileSource>,
    store: Arc<TileStore>,
    url: Arc<UrlFormat>,
}

impl Scheduler {
    pub fn new(
        pool: WorkerPool,
        source: Arc<dyn TileSource>,
        store: Arc<TileStore>,
        url: Arc<UrlFormat>,
    ) -> Self {
        Self {
            pool,
            source,
            store,
            url,
        }
    }

    /// Downloads every tile of `batch` and waits until all of them are done.
    ///
    /// Results are collected while tiles are still being submitted, so only
    /// the running tasks are held at any time. Single tile failures are logged
    /// and counted, never returned; an error here means the pool itself is
    /// unusable.
    pub async fn run_batch(
        &self,
        batch: &Arc<TileBatch>,
        progress: &Arc<Progress>,
    ) -> Result<BatchReport> {
        progress.batch_started(batch);

        let mut report = BatchReport::new(batch);
        let mut in_flight = InFlight::default();
        for tile in batch.tiles() {
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let url = Arc::clone(&self.url);
            let shared = Arc::clone(batch);
            let tracker = Arc::clone(progress);

            let handle = self
                .pool
                .submit(async move {
                    let result = match url.tile_url(&tile) {
                        Ok(url) => {
                            let task = DownloadTask {
                                region: Arc::clone(&shared.region),
                                tile,
                                url,
                            };
                            download(&task, source.as_ref(), &store).await
                        }
                        Err(e) => Err(e),
                    };

                    let status = match &result {
                        Ok(TileOutcome::Stored { .. }) => TileStatus::Stored,
                        Ok(TileOutcome::Skipped) => TileStatus::Skipped,
                        Err(e) => {
                            log_failure(&shared.region, &tile, e);
                            TileStatus::Failed
                        }
                    };
                    tracker.on_complete(&shared, tile, status);

                    result
                })
                .await
                .context("worker pool closed")?;

            in_flight.push(tile, handle);
            while let Some(settled) = in_flight.try_next() {
                settle(&mut report, batch, progress, settled);
            }
        }

        while let Some(settled) = in_flight.next().await {
            settle(&mut report, batch, progress, settled);
        }

        progress.batch_finished(&report);
        Ok(report)
    }
}

fn settle(report: &mut BatchReport, batch: &TileBatch, progress: &Progress, settled: Settled) {
    match settled {
        (_, Ok(result)) => report.record(&result),
        (tile, Err(e)) => {
            error!(region = %batch.region, tile = %tile, "fetch task crashed: {}", e);
            progress.on_complete(batch, tile, TileStatus::Failed);
            report.transport_failures += 1;
        }
    }
}

fn log_failure(region: &str, tile: &Tile, err: &FetchError) {
    match err {
        FetchError::Storage(e) => match std::error::Error::source(e) {
            Some(cause) => error!(region, tile = %tile, "{}: {}", e, cause),
            None => error!(region, tile = %tile, "{}", e),
        },
        e => warn!(region, tile = %tile, "failed fetching tile: {}", e),
    }
}
