use std::sync::Arc;

use tracing::debug;

use crate::error::FetchError;
use crate::source::TileSource;
use crate::store::TileStore;
use crate::tile::Tile;

/// One tile to download, owned by the worker processing it.
#[derive(Clone, Debug)]
pub struct DownloadTask {
    pub region: Arc<str>,
    pub tile: Tile,
    pub url: String,
}

/// How a tile reached its terminal state, unless it failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TileOutcome {
    /// Downloaded and written to the store.
    Stored { bytes: u64 },
    /// Already present in the store; nothing was fetched.
    Skipped,
}

/// Fetches one tile and writes it through `store`.
///
/// Cached tiles are skipped without touching the network. Nothing is retried
/// and no file is written for a failed fetch.
pub async fn download(
    task: &DownloadTask,
    source: &dyn TileSource,
    store: &TileStore,
) -> Result<TileOutcome, FetchError> {
    if store.has(&task.region, &task.tile).await {
        return Ok(TileOutcome::Skipped);
    }

    let data = source.fetch(&task.url).await?;
    let path = store.put(&task.region, &task.tile, &data).await?;
    debug!(tile = %task.tile, path = %path.display(), "stored {} bytes", data.len());

    Ok(TileOutcome::Stored {
        bytes: data.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        calls: AtomicUsize,
        status: Option<u16>,
    }

    #[async_trait]
    impl TileSource for Fixed {
        async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.status {
                Some(status) => Err(FetchError::Status {
                    status,
                    reason: "Not Found".into(),
                }),
                None => Ok(Bytes::from_static(b"png")),
            }
        }
    }

    fn task() -> DownloadTask {
        DownloadTask {
            region: "r".into(),
            tile: Tile::new(1, 2, 3),
            url: "http://tiles.test/3/1/2.png".into(),
        }
    }

    #[tokio::test]
    async fn stores_then_skips() {
        let dir = tempfile::tempdir().unwrap();
        let store = TileStore::new(dir.path(), "png");
        let source = Fixed {
            calls: AtomicUsize::new(0),
            status: None,
        };
        let task = task();
        let path = store.path(&task.region, &task.tile);

        let first = download(&task, &source, &store).await.unwrap();
        assert_eq!(first, TileOutcome::Stored { bytes: 3 });
        assert!(path.exists());

        let second = download(&task, &source, &store).await.unwrap();
        assert_eq!(second, TileOutcome::Skipped);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn status_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TileStore::new(dir.path(), "png");
        let source = Fixed {
            calls: AtomicUsize::new(0),
            status: Some(404),
        };
        let task = task();
        let path = store.path(&task.region, &task.tile);

        let err = download(&task, &source, &store).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!path.exists());
    }
}
