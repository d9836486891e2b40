use std::{io, path::PathBuf};

use thiserror::Error;

/// Invalid configuration. Always fatal and reported before any tile is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("region entry `{entry}` must look like `name:min_lat,min_lon,max_lat,max_lon`")]
    RegionSyntax { entry: String },

    #[error("region `{name}` needs 4 coordinates, got {found}")]
    RegionFieldCount { name: String, found: usize },

    #[error("region `{name}` has a non-numeric coordinate `{value}`")]
    RegionCoordinate { name: String, value: String },

    #[error("region `{name}`: {axis} {value} is outside [{min}, {max}]")]
    RegionOutOfRange {
        name: String,
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("region name `{0}` can't be used as a directory name")]
    RegionName(String),

    #[error("region `{0}` is defined more than once")]
    DuplicateRegion(String),

    #[error("no regions configured")]
    NoRegions,

    #[error("invalid zoom range {min}..={max} (must satisfy 0 <= min <= max <= {limit})")]
    ZoomRange { min: u8, max: u8, limit: u8 },

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("invalid tile URL template `{template}`: {reason}")]
    UrlTemplate { template: String, reason: String },
}

/// Failure writing a tile to the local cache.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed creating tile directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed writing tile file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Broad class of a transport-level failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Body,
    Other,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connection error",
            TransportKind::Body => "body error",
            TransportKind::Other => "request error",
        };
        f.write_str(s)
    }
}

/// Failure of a single tile fetch. Local to the tile, never fatal to a batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("server responded {status} {reason}")]
    Status { status: u16, reason: String },

    /// The request never produced a complete response.
    #[error("{kind}: {message}")]
    Transport { kind: TransportKind, message: String },

    #[error("invalid tile URL: {0}")]
    Url(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl FetchError {
    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        FetchError::Transport {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportKind::Body
        } else {
            TransportKind::Other
        };

        // the URL carries the access key
        FetchError::transport(kind, err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_includes_code_and_reason() {
        let err = FetchError::Status {
            status: 404,
            reason: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "server responded 404 Not Found");
    }

    #[test]
    fn storage_error_converts() {
        let err: FetchError = StoreError::Write {
            path: "maps/a/1/0/0.png".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(matches!(err, FetchError::Storage(StoreError::Write { .. })));
    }
}
