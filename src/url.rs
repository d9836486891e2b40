use maplit::hashmap;
use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};
use strfmt::strfmt;

use crate::error::{ConfigError, FetchError};
use crate::tile::Tile;

/// Default tile URL, in the Thunderforest layout.
pub const DEFAULT_URL_TEMPLATE: &str = "{base}/{style}/{z}/{x}/{y}.{ext}?apikey={key}";

const SUBDOMAINS: &[&str] = &["a", "b", "c"];

/// A tile URL template together with the fixed values substituted into it.
///
/// Supported specifiers are `{base}`, `{style}`, `{ext}`, `{key}` (or
/// `{apikey}`), `{z}` (or `{zoom}`), `{x}`, `{y}` and `{s}`, which cycles
/// through `a`, `b` and `c` to spread the load between servers.
pub struct UrlFormat {
    inc: AtomicUsize,
    format_str: String,
    fixed: HashMap<String, String>,
}

impl UrlFormat {
    /// Creates a URL format, rejecting templates with unknown specifiers.
    ///
    /// # Example
    /// ```rust
    /// # use region_tile_downloader::{Tile, UrlFormat, DEFAULT_URL_TEMPLATE};
    /// let url = UrlFormat::new(
    ///     DEFAULT_URL_TEMPLATE,
    ///     "https://tile.thunderforest.com",
    ///     "outdoors",
    ///     "png",
    ///     "secret",
    /// )
    /// .unwrap();
    /// assert_eq!(
    ///     url.tile_url(&Tile::new(1, 2, 3)).unwrap(),
    ///     "https://tile.thunderforest.com/outdoors/3/1/2.png?apikey=secret",
    /// );
    /// ```
    pub fn new(
        format_str: impl Into<String>,
        base: &str,
        style: &str,
        ext: &str,
        key: &str,
    ) -> Result<Self, ConfigError> {
        let fixed = hashmap! {
            "base".to_owned() => base.trim_end_matches('/').to_owned(),
            "style".to_owned() => style.to_owned(),
            "ext".to_owned() => ext.to_owned(),
            "key".to_owned() => key.to_owned(),
            "apikey".to_owned() => key.to_owned(),
        };

        let url = Self {
            inc: AtomicUsize::new(0),
            format_str: format_str.into(),
            fixed,
        };

        // render once so bad templates fail before any download starts
        url.render(&Tile::new(0, 0, 0), 0)
            .map_err(|e| ConfigError::UrlTemplate {
                template: url.format_str.clone(),
                reason: e.to_string(),
            })?;

        Ok(url)
    }

    fn render(&self, tile: &Tile, inc: usize) -> Result<String, strfmt::FmtError> {
        let mut vars = self.fixed.clone();
        vars.extend(hashmap! {
            "s".to_owned() => SUBDOMAINS[inc % SUBDOMAINS.len()].to_owned(),
            "x".to_owned() => tile.x.to_string(),
            "y".to_owned() => tile.y.to_string(),
            "z".to_owned() => tile.z.to_string(),
            "zoom".to_owned() => tile.z.to_string(),
        });

        strfmt(&self.format_str, &vars)
    }

    pub fn tile_url(&self, tile: &Tile) -> Result<String, FetchError> {
        let inc = self.inc.fetch_add(1, Ordering::Relaxed);
        self.render(tile, inc)
            .map_err(|e| FetchError::Url(e.to_string()))
    }
}

impl PartialEq for UrlFormat {
    fn eq(&self, other: &Self) -> bool {
        self.format_str == other.format_str && self.fixed == other.fixed
    }
}

// the key is left out on purpose
impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormat")
            .field("format_str", &self.format_str)
            .field("base", &self.fixed.get("base"))
            .field("style", &self.fixed.get("style"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_format() -> UrlFormat {
        UrlFormat::new(DEFAULT_URL_TEMPLATE, "https://tiles.test/", "atlas", "png", "k")
            .unwrap()
    }

    #[test]
    fn formats_default_template() {
        assert_eq!(
            default_format().tile_url(&Tile::new(16, 14, 5)).unwrap(),
            "https://tiles.test/atlas/5/16/14.png?apikey=k"
        );
    }

    #[test]
    fn rotates_subdomains() {
        let fmt = UrlFormat::new("https://{s}.tile.test/{zoom}/{x}/{y}.{ext}", "", "", "png", "")
            .unwrap();
        let tile = Tile::new(0, 0, 1);
        let urls: Vec<_> = (0..4).map(|_| fmt.tile_url(&tile).unwrap()).collect();
        assert_eq!(
            urls,
            [
                "https://a.tile.test/1/0/0.png",
                "https://b.tile.test/1/0/0.png",
                "https://c.tile.test/1/0/0.png",
                "https://a.tile.test/1/0/0.png",
            ]
        );
    }

    #[test]
    fn rejects_unknown_specifier() {
        let err = UrlFormat::new("{base}/{layer}/{z}/{x}/{y}", "b", "s", "png", "k").unwrap_err();
        assert!(matches!(err, ConfigError::UrlTemplate { .. }));
    }

    #[test]
    fn debug_hides_key() {
        let out = format!("{:?}", default_format());
        assert!(!out.contains("apikey=k"));
        assert!(!out.contains("\"k\""));
    }
}
