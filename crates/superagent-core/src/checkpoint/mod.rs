//! Workspace checkpoints used as the pre/post-build safety net.
//!
//! A checkpoint is an opaque handle. The pipeline only creates checkpoints
//! and rolls back to them; it never inspects their contents.

mod blobs;
mod fs;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use blobs::BlobStore;
pub use fs::FsCheckpointStore;

/// SHA-256 of a file's contents, hex-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn of(data: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(data));
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

impl FromStr for ContentHash {
    type Err = CheckpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CheckpointError::InvalidHash(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CheckpointError::InvalidHash(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = CheckpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Errors from checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint not found: {0}")]
    NotFound(String),

    #[error("blob missing from store: {0}")]
    MissingBlob(String),

    #[error("blob {0} failed its integrity check")]
    Corrupt(String),

    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint task failed: {0}")]
    Task(String),
}

/// Handle to a stored workspace snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub file_count: usize,
}

/// Snapshot and restore collaborator.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Snapshot the workspace.
    async fn create_checkpoint(&self, description: &str) -> Result<Checkpoint, CheckpointError>;

    /// Restore the workspace to a snapshot. Files created since are removed.
    async fn rollback_to_checkpoint(&self, checkpoint_id: &str) -> Result<(), CheckpointError>;

    /// All checkpoints, oldest first.
    async fn list_checkpoints(&self) -> Result<Vec<Checkpoint>, CheckpointError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_roundtrip() {
        let hash = ContentHash::of(b"hello world");
        let parsed: ContentHash = hash.to_hex().parse().unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn test_hash_rejects_bad_input() {
        assert!("zz".parse::<ContentHash>().is_err());
        assert!("abcd".parse::<ContentHash>().is_err());
    }

    #[test]
    fn test_hash_serializes_as_hex_string() {
        let hash = ContentHash::of(b"x");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
