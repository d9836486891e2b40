use std::{collections::HashSet, fmt, str::FromStr, sync::Arc};

use tracing::warn;

use crate::error::ConfigError;

/// A named bounding box, given in degrees.
///
/// Construction guarantees `min_lat <= max_lat` and `min_lon <= max_lon`.
///
/// # Example
/// ```rust
/// # use region_tile_downloader::Region;
/// let aachen: Region = "aachen:50.7492,6.031,50.811,6.1649".parse().unwrap();
/// assert_eq!(aachen.name(), "aachen");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    name: Arc<str>,
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
}

impl Region {
    /// Creates a region, swapping inverted bounds instead of rejecting them.
    pub fn new(
        name: impl Into<Arc<str>>,
        min_lat: f64,
        min_lon: f64,
        max_lat: f64,
        max_lon: f64,
    ) -> Self {
        let name = name.into();
        let (mut min_lat, mut min_lon, mut max_lat, mut max_lon) =
            (min_lat, min_lon, max_lat, max_lon);

        if min_lon > max_lon {
            warn!(
                region = %name,
                "min_lon ({}) > max_lon ({}), swapping", min_lon, max_lon
            );
            std::mem::swap(&mut min_lon, &mut max_lon);
        }
        if min_lat > max_lat {
            warn!(
                region = %name,
                "min_lat ({}) > max_lat ({}), swapping", min_lat, max_lat
            );
            std::mem::swap(&mut min_lat, &mut max_lat);
        }

        Region {
            name,
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{},{},{},{}",
            self.name, self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

fn check_name(name: &str) -> Result<(), ConfigError> {
    let unsafe_name = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| c == '/' || c == '\\');

    if unsafe_name {
        return Err(ConfigError::RegionName(name.to_owned()));
    }
    Ok(())
}

fn check_range(
    name: &str,
    axis: &'static str,
    value: f64,
    limit: f64,
) -> Result<f64, ConfigError> {
    if !(-limit..=limit).contains(&value) {
        return Err(ConfigError::RegionOutOfRange {
            name: name.to_owned(),
            axis,
            value,
            min: -limit,
            max: limit,
        });
    }
    Ok(value)
}

impl FromStr for Region {
    type Err = ConfigError;

    /// Parses a single `name:min_lat,min_lon,max_lat,max_lon` entry.
    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let (name, coords) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::RegionSyntax {
                entry: entry.trim().to_owned(),
            })?;
        let name = name.trim();
        check_name(name)?;

        let values = coords
            .split(',')
            .map(|v| {
                let v = v.trim();
                v.parse::<f64>().map_err(|_| ConfigError::RegionCoordinate {
                    name: name.to_owned(),
                    value: v.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let [min_lat, min_lon, max_lat, max_lon] = values[..] else {
            return Err(ConfigError::RegionFieldCount {
                name: name.to_owned(),
                found: values.len(),
            });
        };

        Ok(Region::new(
            name,
            check_range(name, "latitude", min_lat, 90_f64)?,
            check_range(name, "longitude", min_lon, 180_f64)?,
            check_range(name, "latitude", max_lat, 90_f64)?,
            check_range(name, "longitude", max_lon, 180_f64)?,
        ))
    }
}

/// Parses a semicolon-separated list of region entries.
///
/// Blank entries are skipped. An empty result is an error, as is a name that
/// appears twice (both would share one output directory).
pub fn parse_regions(spec: &str) -> Result<Vec<Region>, ConfigError> {
    let mut seen = HashSet::new();
    let mut regions = Vec::new();

    for entry in spec.split(';').filter(|e| !e.trim().is_empty()) {
        let region: Region = entry.parse()?;
        if !seen.insert(region.shared_name()) {
            return Err(ConfigError::DuplicateRegion(region.name().to_owned()));
        }
        regions.push(region);
    }

    if regions.is_empty() {
        return Err(ConfigError::NoRegions);
    }
    Ok(regions)
}
