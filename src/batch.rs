use std::{fmt::Debug, ops::RangeInclusive, sync::Arc};

use crate::region::Region;
use crate::tile::{tile_x, tile_y, Tile};

/// All tiles covering one region at one zoom level.
///
/// Bounds are inclusive and always ordered low to high.
#[derive(Clone, Debug, PartialEq)]
pub struct TileBatch {
    pub region: Arc<str>,
    pub zoom: u8,
    pub start_x: u32,
    pub end_x: u32,
    pub start_y: u32,
    pub end_y: u32,
}

impl TileBatch {
    /// Expands `region` into its tile rectangle at `zoom`.
    ///
    /// The northern edge (`max_lat()`) yields the first row since tile rows grow
    /// southwards.
    pub fn new(region: &Region, zoom: u8) -> Self {
        let (x0, x1) = (tile_x(region.min_lon(), zoom), tile_x(region.max_lon(), zoom));
        let (y0, y1) = (tile_y(region.max_lat(), zoom), tile_y(region.min_lat(), zoom));

        TileBatch {
            region: region.shared_name(),
            zoom,
            start_x: x0.min(x1),
            end_x: x0.max(x1),
            start_y: y0.min(y1),
            end_y: y0.max(y1),
        }
    }

    pub fn columns(&self) -> u32 {
        self.end_x - self.start_x + 1
    }

    pub fn rows(&self) -> u32 {
        self.end_y - self.start_y + 1
    }

    pub fn tile_count(&self) -> u64 {
        u64::from(self.columns()) * u64::from(self.rows())
    }

    /// Creates an iterator over every tile of the batch, column by column.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + Debug {
        let zoom = self.zoom;
        let rows: RangeInclusive<u32> = self.start_y..=self.end_y;

        (self.start_x..=self.end_x)
            .flat_map(move |x| rows.clone().map(move |y| Tile::new(x, y, zoom)))
    }

    /// 1-based `(column, row)` of `tile` within the batch.
    pub fn position(&self, tile: &Tile) -> (u32, u32) {
        (tile.x - self.start_x + 1, tile.y - self.start_y + 1)
    }
}

/// Creates an iterator over the batches of `regions` for every zoom level in
/// `zooms`, zoom levels outermost.
pub fn batches<'a>(
    regions: &'a [Region],
    zooms: RangeInclusive<u8>,
) -> impl Iterator<Item = TileBatch> + 'a {
    zooms.flat_map(move |zoom| regions.iter().map(move |r| TileBatch::new(r, zoom)))
}
