use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use super::{BlobStore, Checkpoint, CheckpointError, CheckpointStore, ContentHash};

const STATE_DIR: &str = ".superagent";

/// Checkpoints kept by [`FsCheckpointStore::open`].
pub const DEFAULT_RETAINED: usize = 20;

/// Directory names never captured or touched by rollback.
const IGNORED: &[&str] = &[STATE_DIR, "node_modules", "__pycache__", ".venv", "venv", ".git"];

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    checkpoint: Checkpoint,
    files: BTreeMap<String, ContentHash>,
    dirs: BTreeSet<String>,
}

struct Tree {
    files: BTreeMap<String, PathBuf>,
    dirs: BTreeSet<String>,
}

/// Checkpoint store over a workspace directory.
///
/// State lives in `<workspace>/.superagent/checkpoints`: file contents in a
/// [`BlobStore`] and one JSON manifest per checkpoint. Operations are
/// serialized and run on the blocking pool.
///
/// Only the newest `retained` checkpoints are kept. Each new checkpoint
/// prunes older manifests and deletes blobs no surviving manifest uses.
#[derive(Clone)]
pub struct FsCheckpointStore {
    inner: Arc<Inner>,
    lock: Arc<tokio::sync::Mutex<()>>,
    retained: usize,
}

struct Inner {
    workspace: PathBuf,
    manifests_dir: PathBuf,
    blobs: BlobStore,
}

impl FsCheckpointStore {
    /// Open (creating if needed) the store for `workspace`.
    pub fn open(workspace: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let workspace = workspace.into();
        let root = workspace.join(STATE_DIR).join("checkpoints");
        let manifests_dir = root.join("manifests");
        fs::create_dir_all(&manifests_dir)?;
        let blobs = BlobStore::open(&root)?;
        Ok(Self {
            inner: Arc::new(Inner {
                workspace,
                manifests_dir,
                blobs,
            }),
            lock: Arc::new(tokio::sync::Mutex::new(())),
            retained: DEFAULT_RETAINED,
        })
    }

    /// Keep at most `retained` checkpoints (at least one).
    pub fn with_retention(mut self, retained: usize) -> Self {
        self.retained = retained.max(1);
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.inner.workspace
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, CheckpointError>
    where
        F: FnOnce(&Inner) -> Result<T, CheckpointError> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| CheckpointError::Task(e.to_string()))?
    }
}

#[async_trait]
impl CheckpointStore for FsCheckpointStore {
    async fn create_checkpoint(&self, description: &str) -> Result<Checkpoint, CheckpointError> {
        let description = description.to_string();
        let retained = self.retained;
        let (checkpoint, pruned) = self
            .blocking(move |inner| {
                let checkpoint = inner.snapshot(description)?;
                let pruned = inner.prune(retained)?;
                Ok((checkpoint, pruned))
            })
            .await?;
        info!(
            checkpoint_id = %checkpoint.checkpoint_id,
            files = checkpoint.file_count,
            "checkpoint created"
        );
        if let Some((manifests, blobs)) = pruned {
            info!(manifests, blobs, "old checkpoints pruned");
        }
        Ok(checkpoint)
    }

    async fn rollback_to_checkpoint(&self, checkpoint_id: &str) -> Result<(), CheckpointError> {
        let id = checkpoint_id.to_string();
        self.blocking(move |inner| inner.restore(&id)).await?;
        info!(checkpoint_id, "workspace rolled back");
        Ok(())
    }

    async fn list_checkpoints(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        self.blocking(|inner| inner.list()).await
    }
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED.contains(&name))
}

fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Inner {
    fn key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.workspace).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    fn scan(&self) -> Result<Tree, CheckpointError> {
        let mut tree = Tree {
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
        };
        let walker = WalkDir::new(&self.workspace)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_ignored(e));
        for entry in walker {
            let entry = entry.map_err(std::io::Error::from)?;
            let Some(key) = self.key(entry.path()) else {
                continue;
            };
            let file_type = entry.file_type();
            if file_type.is_dir() {
                tree.dirs.insert(key);
            } else if file_type.is_file() {
                tree.files.insert(key, entry.into_path());
            }
        }
        Ok(tree)
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        self.manifests_dir.join(format!("{}.json", id))
    }

    fn snapshot(&self, description: String) -> Result<Checkpoint, CheckpointError> {
        let tree = self.scan()?;
        let mut files = BTreeMap::new();
        for (key, path) in &tree.files {
            let data = fs::read(path)?;
            files.insert(key.clone(), self.blobs.put(&data)?);
        }

        let created_at = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let checkpoint = Checkpoint {
            checkpoint_id: format!("cp_{}_{}", created_at.format("%Y%m%d%H%M%S"), &suffix[..8]),
            description,
            created_at,
            file_count: files.len(),
        };
        let manifest = Manifest {
            checkpoint: checkpoint.clone(),
            files,
            dirs: tree.dirs,
        };

        let mut tmp = NamedTempFile::new_in(&self.manifests_dir)?;
        serde_json::to_writer_pretty(&mut tmp, &manifest)?;
        tmp.flush()?;
        tmp.persist(self.manifest_path(&checkpoint.checkpoint_id))
            .map_err(|e| e.error)?;
        Ok(checkpoint)
    }

    fn load(&self, id: &str) -> Result<Manifest, CheckpointError> {
        if !valid_id(id) {
            return Err(CheckpointError::NotFound(id.to_string()));
        }
        let raw = fs::read(self.manifest_path(id)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CheckpointError::NotFound(id.to_string()),
            _ => CheckpointError::Io(e),
        })?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn restore(&self, id: &str) -> Result<(), CheckpointError> {
        let manifest = self.load(id)?;
        // Every blob must be readable before anything is deleted.
        for hash in manifest.files.values() {
            if !self.blobs.contains(hash) {
                return Err(CheckpointError::MissingBlob(hash.to_hex()));
            }
        }

        let current = self.scan()?;

        // BTreeSet order visits parents before children.
        for dir in current.dirs.difference(&manifest.dirs) {
            let path = self.workspace.join(dir);
            if path.exists() {
                debug!(dir = %dir, "removing directory created after checkpoint");
                fs::remove_dir_all(&path)?;
            }
        }
        for (key, path) in &current.files {
            if !manifest.files.contains_key(key) && path.exists() {
                debug!(file = %key, "removing file created after checkpoint");
                fs::remove_file(path)?;
            }
        }

        for dir in &manifest.dirs {
            fs::create_dir_all(self.workspace.join(dir))?;
        }
        for (key, hash) in &manifest.files {
            let path = self.workspace.join(key);
            let unchanged = match fs::read(&path) {
                Ok(existing) => ContentHash::of(&existing) == *hash,
                Err(_) => false,
            };
            if !unchanged {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&path, self.blobs.get(hash)?)?;
                debug!(file = %key, "restored");
            }
        }
        Ok(())
    }

    /// Manifests with their paths, oldest first.
    fn manifests(&self) -> Result<Vec<(PathBuf, Manifest)>, CheckpointError> {
        let mut manifests = Vec::new();
        for entry in fs::read_dir(&self.manifests_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let manifest: Manifest = serde_json::from_slice(&fs::read(&path)?)?;
            manifests.push((path, manifest));
        }
        manifests.sort_by(|(_, a), (_, b)| {
            a.checkpoint
                .created_at
                .cmp(&b.checkpoint.created_at)
                .then_with(|| a.checkpoint.checkpoint_id.cmp(&b.checkpoint.checkpoint_id))
        });
        Ok(manifests)
    }

    fn list(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        Ok(self
            .manifests()?
            .into_iter()
            .map(|(_, manifest)| manifest.checkpoint)
            .collect())
    }

    /// Drop all but the newest `retained` manifests, then every blob the
    /// survivors do not reference. Returns `(manifests, blobs)` removed, or
    /// `None` when nothing was over the limit.
    fn prune(&self, retained: usize) -> Result<Option<(usize, usize)>, CheckpointError> {
        let mut manifests = self.manifests()?;
        if manifests.len() <= retained {
            return Ok(None);
        }
        let survivors = manifests.split_off(manifests.len() - retained);
        for (path, manifest) in &manifests {
            debug!(checkpoint_id = %manifest.checkpoint.checkpoint_id, "pruning checkpoint");
            fs::remove_file(path)?;
        }

        let live: BTreeSet<ContentHash> = survivors
            .iter()
            .flat_map(|(_, manifest)| manifest.files.values().copied())
            .collect();
        let blobs = self.blobs.retain(&live)?;
        Ok(Some((manifests.len(), blobs)))
    }
}
