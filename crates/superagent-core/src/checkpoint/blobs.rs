use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{CheckpointError, ContentHash};

/// Sharded content-addressed blob directory.
///
/// Layout: `<root>/blobs/<first 2 hex chars>/<remaining hex chars>`. Writes go
/// through a temp file in the shard and are renamed into place.
#[derive(Debug)]
pub struct BlobStore {
    blobs_dir: PathBuf,
}

impl BlobStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let blobs_dir = root.as_ref().join("blobs");
        fs::create_dir_all(&blobs_dir)?;
        Ok(Self { blobs_dir })
    }

    fn path_for(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        self.blobs_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Store `data`, returning its hash. Existing blobs are not rewritten.
    pub fn put(&self, data: &[u8]) -> Result<ContentHash, CheckpointError> {
        let hash = ContentHash::of(data);
        let path = self.path_for(&hash);
        if path.exists() {
            return Ok(hash);
        }

        let shard = self.blobs_dir.join(&hash.to_hex()[..2]);
        fs::create_dir_all(&shard)?;
        let mut tmp = NamedTempFile::new_in(&shard)?;
        tmp.write_all(data)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(hash)
    }

    /// Read a blob back, verifying its hash.
    pub fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, CheckpointError> {
        let data = fs::read(self.path_for(hash)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CheckpointError::MissingBlob(hash.to_hex()),
            _ => CheckpointError::Io(e),
        })?;
        if ContentHash::of(&data) != *hash {
            return Err(CheckpointError::Corrupt(hash.to_hex()));
        }
        Ok(data)
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.path_for(hash).exists()
    }

    /// Delete every blob not in `live`, returning how many were removed.
    /// Files that are not blobs (in-flight temp files) are left alone.
    pub fn retain(&self, live: &BTreeSet<ContentHash>) -> Result<usize, CheckpointError> {
        let mut removed = 0;
        for shard in fs::read_dir(&self.blobs_dir)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            let prefix = shard.file_name().to_string_lossy().into_owned();
            for blob in fs::read_dir(shard.path())? {
                let blob = blob?;
                let name = format!("{}{}", prefix, blob.file_name().to_string_lossy());
                let Ok(hash) = name.parse::<ContentHash>() else {
                    continue;
                };
                if !live.contains(&hash) {
                    fs::remove_file(blob.path())?;
                    removed += 1;
                }
            }
            // Only succeeds once the shard is empty.
            let _ = fs::remove_dir(shard.path());
        }
        Ok(removed)
    }
}
