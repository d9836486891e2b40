use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;

use crate::error::StoreError;
use crate::tile::Tile;

/// File system tile cache laid out as `<root>/<region>/<z>/<x>/<y>.<ext>`.
///
/// A tile counts as cached once its file exists; nothing else is recorded.
#[derive(Clone, Debug)]
pub struct TileStore {
    root: PathBuf,
    ext: String,
}

impl TileStore {
    pub fn new(root: impl Into<PathBuf>, ext: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ext: ext.into(),
        }
    }

    pub fn path(&self, region: &str, tile: &Tile) -> PathBuf {
        let mut target = self.root.join(region);
        target.push(tile.z.to_string());
        target.push(tile.x.to_string());
        target.push(format!("{}.{}", tile.y, self.ext));
        target
    }

    pub async fn has(&self, region: &str, tile: &Tile) -> bool {
        fs::try_exists(self.path(region, tile))
            .await
            .unwrap_or(false)
    }

    /// Writes `data` as the tile's file, creating parent directories on demand.
    ///
    /// The payload goes to a `.part` sibling first and is renamed into place,
    /// so an interrupted write never looks like a cached tile.
    pub async fn put(
        &self,
        region: &str,
        tile: &Tile,
        data: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let path = self.path(region, tile);

        if let Some(dir) = path.parent() {
            create_dir_all(dir).await?;
        }

        let tmp_path = path.with_extension(format!("{}.part", self.ext));
        fs::write(&tmp_path, data)
            .await
            .map_err(|source| StoreError::Write {
                path: tmp_path.clone(),
                source,
            })?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }
}

// Sibling tiles race on their shared parents, so "already exists" is fine.
async fn create_dir_all(dir: &Path) -> Result<(), StoreError> {
    match fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(StoreError::CreateDir {
            path: dir.to_owned(),
            source,
        }),
    }
}
