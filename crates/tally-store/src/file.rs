use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::PersistenceAdapter;

/// File-backed adapter: one `<key>.json` file inside a data directory.
///
/// Writes go to a temporary sibling file which is synced and then renamed
/// over the target, so a crash mid-write leaves the previous blob intact.
#[derive(Clone, Debug)]
pub struct FileAdapter {
    dir: PathBuf,
    path: PathBuf,
    tmp_path: PathBuf,
}

impl FileAdapter {
    /// Bind an adapter to `key` inside `dir`.
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>, key: &str) -> StoreResult<Self> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(|c: char| c == '/' || c == '\\' || c.is_control())
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        let dir = dir.into();
        let path = dir.join(format!("{key}.json"));
        let tmp_path = dir.join(format!(".{key}.json.tmp"));
        Ok(Self {
            dir,
            path,
            tmp_path,
        })
    }

    /// Path of the blob file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceAdapter for FileAdapter {
    async fn read(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                debug!(path = %self.path.display(), bytes = bytes.len(), "blob read");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, bytes: Vec<u8>) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let mut file = fs::File::create(&self.tmp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "blob replaced");
        Ok(())
    }
}
