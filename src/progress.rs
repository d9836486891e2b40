//! Run-wide progress accounting.
//!
//! [`Progress`] counts finished tiles and, when created with
//! [`Progress::with_events`], publishes a [`ProgressEvent`] stream that a
//! presentation layer (the CLI's progress bar) consumes.

use std::{
    fmt,
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::batch::{batches, TileBatch};
use crate::region::Region;
use crate::scheduler::BatchReport;
use crate::tile::Tile;

/// Terminal state of a single tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileStatus {
    Stored,
    Skipped,
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    BatchStarted {
        region: Arc<str>,
        zoom: u8,
        columns: u32,
        rows: u32,
        tiles: u64,
    },
    TileFinished(TileProgress),
    BatchFinished(BatchReport),
}

/// A finished tile and where the run stands after it.
#[derive(Clone, Debug, PartialEq)]
pub struct TileProgress {
    pub region: Arc<str>,
    pub tile: Tile,
    pub status: TileStatus,
    /// 1-based column within the batch.
    pub column: u32,
    pub columns: u32,
    /// 1-based row within the batch.
    pub row: u32,
    pub rows: u32,
    pub completed: u64,
    pub total: u64,
}

impl TileProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1_f64
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

impl fmt::Display for TileProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} z{} col {}/{} row {}/{}",
            self.region, self.tile.z, self.column, self.columns, self.row, self.rows
        )
    }
}

/// Number of tiles a run over `regions` and `zooms` covers, without fetching.
pub fn count_tiles(regions: &[Region], zooms: RangeInclusive<u8>) -> u64 {
    batches(regions, zooms).map(|b| b.tile_count()).sum()
}

/// Completion counter shared by all fetch workers of a run.
#[derive(Debug)]
pub struct Progress {
    total: u64,
    completed: AtomicU64,
    events: Option<UnboundedSender<ProgressEvent>>,
}

impl Progress {
    /// A counter that publishes no events.
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            events: None,
        }
    }

    /// A counter along with the receiving end of its event stream.
    pub fn with_events(total: u64) -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Self {
            events: Some(tx),
            ..Self::new(total)
        };
        (progress, rx)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.events {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }

    pub(crate) fn batch_started(&self, batch: &TileBatch) {
        self.emit(ProgressEvent::BatchStarted {
            region: Arc::clone(&batch.region),
            zoom: batch.zoom,
            columns: batch.columns(),
            rows: batch.rows(),
            tiles: batch.tile_count(),
        });
    }

    pub(crate) fn batch_finished(&self, report: &BatchReport) {
        self.emit(ProgressEvent::BatchFinished(report.clone()));
    }

    /// Records one finished tile. Returns the new completed count.
    pub fn on_complete(&self, batch: &TileBatch, tile: Tile, status: TileStatus) -> u64 {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let (column, row) = batch.position(&tile);

        self.emit(ProgressEvent::TileFinished(TileProgress {
            region: Arc::clone(&batch.region),
            tile,
            status,
            column,
            columns: batch.columns(),
            row,
            rows: batch.rows(),
            completed,
            total: self.total,
        }));

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<Region> {
        crate::region::parse_regions("test:10,10,20,20;aachen:50.7492,6.031,50.811,6.1649")
            .unwrap()
    }

    #[test]
    fn total_sums_batches() {
        let regions = regions();
        let expected: u64 = (1..=8)
            .flat_map(|z| regions.iter().map(move |r| TileBatch::new(r, z).tile_count()))
            .sum();
        assert_eq!(count_tiles(&regions, 1..=8), expected);
        assert_eq!(count_tiles(&regions[..1], 5..=5), 4);
    }

    #[test]
    fn on_complete_emits_position() {
        let batch = TileBatch::new(&regions()[0], 5);
        let (progress, mut rx) = Progress::with_events(4);

        progress.on_complete(&batch, Tile::new(17, 14, 5), TileStatus::Stored);

        match rx.try_recv().unwrap() {
            ProgressEvent::TileFinished(p) => {
                assert_eq!((p.column, p.columns, p.row, p.rows), (2, 2, 1, 2));
                assert_eq!((p.completed, p.total), (1, 4));
                assert_eq!(p.fraction(), 0.25);
                assert_eq!(p.to_string(), "test z5 col 2/2 row 1/2");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn concurrent_completions_are_counted_once() {
        let batch = Arc::new(TileBatch::new(&regions()[1], 16));
        let tiles: Vec<_> = batch.tiles().collect();
        let progress = Arc::new(Progress::new(tiles.len() as u64));

        std::thread::scope(|s| {
            for chunk in tiles.chunks(7) {
                let progress = Arc::clone(&progress);
                let batch = Arc::clone(&batch);
                s.spawn(move || {
                    for tile in chunk {
                        progress.on_complete(&batch, *tile, TileStatus::Skipped);
                    }
                });
            }
        });

        assert_eq!(progress.completed(), tiles.len() as u64);
    }

    #[test]
    fn works_without_receiver() {
        let batch = TileBatch::new(&regions()[0], 5);
        let (progress, rx) = Progress::with_events(4);
        drop(rx);
        assert_eq!(progress.on_complete(&batch, Tile::new(16, 14, 5), TileStatus::Failed), 1);
    }
}
