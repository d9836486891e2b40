//! Download map tiles for named regions to your disk en-masse.
//!
//! **Use with absolute caution.** Downloading tiles en-masse can hog
//! down a tile server easily. Check the terms of the server you fetch from.
//!
//! # Usage
//!
//! The `region-tile-downloader` binary reads its settings from flags or the
//! environment (`REGIONS`, `MINZOOM`, `MAXZOOM`, `WORKERS`, `API_KEY`, ...).
//! See `--help` for the full list.
//!
//! Tiles end up in `<output>/<region>/<z>/<x>/<y>.<ext>`. A tile whose file
//! already exists is never downloaded again, so re-running the same command
//! resumes an interrupted download.
//!
//! # CLI Example
//!
//! ```bash
//! REGIONS="aachen:50.7492,6.031,50.811,6.1649;cologne:50.83,6.77,51.08,7.16" \
//! API_KEY=... \
//! region-tile-downloader --min-zoom 1 --max-zoom 14 --workers 10
//! ```
//!
//! It is also available as a library, see [`Downloader`].

mod batch;
mod config;
mod error;
mod fetch;
mod pool;
mod progress;
mod region;
mod scheduler;
mod source;
mod store;
mod tile;
mod url;
mod worker;

pub use batch::{batches, TileBatch};
pub use config::Config;
pub use error::{ConfigError, FetchError, StoreError, TransportKind};
pub use fetch::{Downloader, RunReport};
pub use pool::WorkerPool;
pub use progress::{count_tiles, Progress, ProgressEvent, TileProgress, TileStatus};
pub use region::{parse_regions, Region};
pub use scheduler::{BatchReport, Scheduler};
pub use source::{HttpTileSource, TileSource};
pub use store::TileStore;
pub use tile::{tile_x, tile_y, Tile, MAX_LATITUDE, MAX_ZOOM};
pub use url::{UrlFormat, DEFAULT_URL_TEMPLATE};
pub use worker::{download, DownloadTask, TileOutcome};
