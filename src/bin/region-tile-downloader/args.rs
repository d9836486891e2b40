use anyhow::{Context, Result};
use clap::{command, value_parser, Arg, ArgAction, ArgMatches};
use std::{path::PathBuf, time::Duration};

use crate::validators::*;
use region_tile_downloader::{
    parse_regions, Config, ConfigError, Region, UrlFormat, DEFAULT_URL_TEMPLATE,
};

const REGIONS_ARG: &str = "regions";
const ZOOM_ARG: &str = "zoom";
const MIN_ZOOM_ARG: &str = "min_zoom";
const MAX_ZOOM_ARG: &str = "max_zoom";
const WORKERS_ARG: &str = "workers";
const OUTPUT_DIR_ARG: &str = "output_dir";
const URL_ARG: &str = "url";
const BASE_URL_ARG: &str = "base_url";
const STYLE_ARG: &str = "style";
const EXTENSION_ARG: &str = "extension";
const API_KEY_ARG: &str = "api_key";
const TIMEOUT_ARG: &str = "timeout";
const DRY_RUN_ARG: &str = "dry_run";

pub struct Args {
    pub regions: Vec<Region>,
    pub workers: usize,
    pub timeout: Duration,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub output_dir: PathBuf,
    pub url: String,
    pub base_url: String,
    pub style: String,
    pub extension: String,
    pub api_key: String,
    pub dry_run: bool,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let url = UrlFormat::new(
            args.url,
            &args.base_url,
            &args.style,
            &args.extension,
            &args.api_key,
        )?;

        let config = Self {
            regions: args.regions,
            workers: args.workers,
            output_folder: args.output_dir,
            extension: args.extension,
            url,
            timeout: args.timeout,
            min_zoom: args.min_zoom,
            max_zoom: args.max_zoom,
        };
        config.validate()?;

        Ok(config)
    }
}

fn value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .with_context(|| format!("missing value for `{}`", id))
}

impl Args {
    pub fn parse() -> Result<Self> {
        let matches = get_matches();

        let (min_zoom, max_zoom) = match matches.get_one::<u8>(ZOOM_ARG) {
            // if `zoom` is set, use it for both min/max
            Some(&zoom) => (zoom, zoom),
            // otherwise, parse min/max separately
            None => (
                value(&matches, MIN_ZOOM_ARG)?,
                value(&matches, MAX_ZOOM_ARG)?,
            ),
        };

        let regions = parse_regions(&value::<String>(&matches, REGIONS_ARG)?)
            .context("invalid region specification")?;

        Ok(Self {
            regions,
            min_zoom,
            max_zoom,
            workers: value(&matches, WORKERS_ARG)?,
            timeout: Duration::from_secs(value(&matches, TIMEOUT_ARG)?),
            output_dir: value(&matches, OUTPUT_DIR_ARG)?,
            url: value(&matches, URL_ARG)?,
            base_url: value(&matches, BASE_URL_ARG)?,
            style: value(&matches, STYLE_ARG)?,
            extension: value(&matches, EXTENSION_ARG)?,
            api_key: matches
                .get_one::<String>(API_KEY_ARG)
                .cloned()
                .unwrap_or_default(),
            dry_run: matches.get_flag(DRY_RUN_ARG),
        })
    }
}

fn get_matches() -> ArgMatches {
    command!()
        .arg(
            Arg::new(REGIONS_ARG)
                .help("Regions to download as `name:min_lat,min_lon,max_lat,max_lon`, separated by `;`")
                .required(true)
                .allow_hyphen_values(true)
                .env("REGIONS")
                .long("regions"),
        )
        .arg(
            Arg::new(MIN_ZOOM_ARG)
                .help("The minimum zoom level to fetch")
                .value_parser(is_zoom)
                .default_value("1")
                .env("MINZOOM")
                .long("min-zoom"),
        )
        .arg(
            Arg::new(MAX_ZOOM_ARG)
                .help("The maximum zoom level to fetch")
                .value_parser(is_zoom)
                .default_value("14")
                .env("MAXZOOM")
                .long("max-zoom"),
        )
        .arg(
            Arg::new(ZOOM_ARG)
                .help("Only fetch a single zoom level (implies min=x/max=x)")
                .value_parser(is_zoom)
                .long("zoom")
                .short('z'),
        )
        .arg(
            Arg::new(WORKERS_ARG)
                .help("The amount of tiles fetched in parallel.")
                .value_parser(is_numeric_min(1))
                .default_value("10")
                .env("WORKERS")
                .short('w')
                .long("workers"),
        )
        .arg(
            Arg::new(TIMEOUT_ARG)
                .help("The timeout (in seconds) for fetching a single tile. Pass 0 for no timeout.")
                .value_parser(value_parser!(u64))
                .default_value("30")
                .env("TIMEOUT")
                .short('t')
                .long("timeout"),
        )
        .arg(
            Arg::new(OUTPUT_DIR_ARG)
                .help("The folder to output the tiles to, one subfolder per region.")
                .value_parser(value_parser!(PathBuf))
                .default_value("./maps")
                .env("OUTPUT_DIR")
                .short('o')
                .long("output"),
        )
        .arg(
            Arg::new(URL_ARG)
                .help("The URL template with format specifiers `{base}`, `{style}`, `{z}`, `{x}`, `{y}`, `{ext}` and `{key}`. Also supports `{s}`, which cycles through `a`, `b` and `c` to spread the load between servers.")
                .default_value(DEFAULT_URL_TEMPLATE)
                .env("TILE_URL")
                .short('u')
                .long("url"),
        )
        .arg(
            Arg::new(BASE_URL_ARG)
                .help("Substituted for `{base}` in the URL template")
                .default_value("https://tile.thunderforest.com")
                .env("TILE_BASE_URL")
                .long("base-url"),
        )
        .arg(
            Arg::new(STYLE_ARG)
                .help("Map style, substituted for `{style}` in the URL template")
                .default_value("mobile-atlas")
                .env("MAP_STYLE")
                .short('s')
                .long("style"),
        )
        .arg(
            Arg::new(EXTENSION_ARG)
                .help("File extension of the tiles, used for the URL and the stored files")
                .value_parser(is_extension)
                .default_value("png")
                .env("TILE_EXT")
                .long("ext"),
        )
        .arg(
            Arg::new(API_KEY_ARG)
                .help("Access key, substituted for `{key}` in the URL template")
                .env("API_KEY")
                .hide_env_values(true)
                .long("api-key"),
        )
        .arg(
            Arg::new(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many tiles would be fetched.")
                .action(ArgAction::SetTrue)
                .long("dry-run"),
        )
        .get_matches()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(min_zoom: u8, max_zoom: u8) -> Args {
        Args {
            regions: parse_regions("test:10,10,20,20").unwrap(),
            workers: 4,
            timeout: Duration::from_secs(30),
            min_zoom,
            max_zoom,
            output_dir: "maps".into(),
            url: DEFAULT_URL_TEMPLATE.to_owned(),
            base_url: "https://tiles.test".to_owned(),
            style: "atlas".to_owned(),
            extension: "png".to_owned(),
            api_key: "k".to_owned(),
            dry_run: true,
        }
    }

    #[test]
    fn converts_valid_args() {
        let config = Config::try_from(args(1, 3)).unwrap();
        assert_eq!(config.zoom_levels(), 1..=3);
        assert_eq!(config.regions.len(), 1);
    }

    #[test]
    fn dry_run_args_are_validated() {
        assert!(matches!(
            Config::try_from(args(5, 3)),
            Err(ConfigError::ZoomRange { min: 5, max: 3, .. })
        ));

        let mut bad_url = args(1, 3);
        bad_url.url = "{base}/{layer}/{z}/{x}/{y}".to_owned();
        assert!(matches!(
            Config::try_from(bad_url),
            Err(ConfigError::UrlTemplate { .. })
        ));

        let mut no_workers = args(1, 3);
        no_workers.workers = 0;
        assert!(matches!(
            Config::try_from(no_workers),
            Err(ConfigError::NoWorkers)
        ));
    }
}
