use std::{f64::consts::PI, fmt};

/// Northern and southern limit of the Web-Mercator projection in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Highest zoom level whose tile indices still fit into a `u32`.
pub const MAX_ZOOM: u8 = 30;

/// A slippy-map tile with x, y and z-coordinate.
/// ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The tile containing the given point (in degrees) at `zoom`.
    ///
    /// # Example
    /// ```rust
    /// # use region_tile_downloader::Tile;
    /// let tile = Tile::from_coords_and_zoom(50.7929, 6.0402, 18);
    /// assert_eq!((tile.x, tile.y), (135470, 87999));
    /// ```
    pub fn from_coords_and_zoom(lat_deg: f64, lon_deg: f64, zoom: u8) -> Self {
        Self::new(tile_x(lon_deg, zoom), tile_y(lat_deg, zoom), zoom)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

fn scale(zoom: u8) -> f64 {
    assert!(zoom <= MAX_ZOOM, "zoom {} exceeds {}", zoom, MAX_ZOOM);
    (1_u64 << zoom) as f64
}

// Floors a non-negative grid position into a valid tile index.
fn to_index(pos: f64, n: f64) -> u32 {
    pos.floor().max(0_f64).min(n - 1_f64) as u32
}

/// Tile column of longitude `lon_deg` at `zoom`.
///
/// Longitudes are clamped to [-180, 180]; 180° maps onto the last column.
pub fn tile_x(lon_deg: f64, zoom: u8) -> u32 {
    let n = scale(zoom);
    let lon = lon_deg.max(-180_f64).min(180_f64);

    to_index((lon + 180_f64) / 360_f64 * n, n)
}

/// Tile row of latitude `lat_deg` at `zoom`.
///
/// Latitudes are clamped to ±[`MAX_LATITUDE`] since the projection diverges at
/// the poles.
pub fn tile_y(lat_deg: f64, zoom: u8) -> u32 {
    let n = scale(zoom);
    let lat_rad = (lat_deg.max(-MAX_LATITUDE).min(MAX_LATITUDE) * PI) / 180_f64;

    let y = (1_f64 - (lat_rad.tan() + 1_f64 / lat_rad.cos()).ln() / PI) / 2_f64 * n;
    to_index(y, n)
}
