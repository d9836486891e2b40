use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

use crate::batch::{batches, TileBatch};
use crate::error::ConfigError;
use crate::region::Region;
use crate::tile::MAX_ZOOM;
use crate::url::UrlFormat;

/// Tile fetching configuration.
#[derive(Debug, PartialEq)]
pub struct Config {
    /// Regions to download, in the order they are processed at each zoom level.
    pub regions: Vec<Region>,

    /// Maximum number of parallel downloads.
    pub workers: usize,

    /// The folder to output the data to.
    pub output_folder: PathBuf,

    /// File extension of the stored tiles.
    pub extension: String,

    /// The URL to download individual tiles from.
    pub url: UrlFormat,

    /// Timeout for fetching a single tile.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,

    /// The minimum zoom level to download.
    pub min_zoom: u8,

    /// The maximum zoom level to download.
    pub max_zoom: u8,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.regions.is_empty() {
            return Err(ConfigError::NoRegions);
        }
        if self.min_zoom > self.max_zoom || self.max_zoom > MAX_ZOOM {
            return Err(ConfigError::ZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
                limit: MAX_ZOOM,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }

    pub fn zoom_levels(&self) -> RangeInclusive<u8> {
        self.min_zoom..=self.max_zoom
    }

    /// Creates an iterator over all batches, zoom levels outermost.
    pub fn batches(&self) -> impl Iterator<Item = TileBatch> + '_ {
        batches(&self.regions, self.zoom_levels())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::DEFAULT_URL_TEMPLATE;

    fn config(regions: &str, min_zoom: u8, max_zoom: u8) -> Config {
        Config {
            regions: crate::region::parse_regions(regions).unwrap(),
            workers: 4,
            output_folder: "maps".into(),
            extension: "png".into(),
            url: UrlFormat::new(DEFAULT_URL_TEMPLATE, "https://t", "atlas", "png", "k")
                .unwrap(),
            timeout: Duration::from_secs(30),
            min_zoom,
            max_zoom,
        }
    }

    #[test]
    fn valid_config() {
        assert!(config("a:1,2,3,4", 1, 14).validate().is_ok());
        assert!(config("a:1,2,3,4", 0, 0).validate().is_ok());
    }

    #[test]
    fn rejects_bad_zoom_range() {
        assert!(matches!(
            config("a:1,2,3,4", 5, 4).validate(),
            Err(ConfigError::ZoomRange { min: 5, max: 4, .. })
        ));
        assert!(matches!(
            config("a:1,2,3,4", 1, MAX_ZOOM + 1).validate(),
            Err(ConfigError::ZoomRange { .. })
        ));
    }

    #[test]
    fn rejects_zero_workers_and_no_regions() {
        let mut cfg = config("a:1,2,3,4", 1, 2);
        cfg.workers = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NoWorkers)));

        let mut cfg = config("a:1,2,3,4", 1, 2);
        cfg.regions.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoRegions)));
    }

    #[test]
    fn batches_cover_zoom_range() {
        let cfg = config("a:1,2,3,4;b:5,6,7,8", 2, 4);
        assert_eq!(cfg.batches().count(), 6);
    }
}
