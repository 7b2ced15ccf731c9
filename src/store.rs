use crate::{
    error::{LoadError, NotFound, SaveError},
    id,
    models::UrlRecord,
};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::{
    collections::{BTreeMap, HashMap},
    fs::Permissions,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;

/// Process-wide mapping of short id -> [`UrlRecord`], backed by a JSON file.
///
/// One `RwLock` guards the whole map. Anything that changes it (`create`,
/// `resolve`, the replace step of `load`) takes the write half; `save` only
/// needs the read half, so concurrent saves never block each other but
/// always see a map no writer is touching.
#[derive(Debug)]
pub struct UrlStore {
    path: PathBuf,
    urls: RwLock<HashMap<String, UrlRecord>>,
    /// Bumped on every change to `urls`, only while the write lock is held.
    version: AtomicU64,
    /// Version of the snapshot most recently renamed into place.
    persisted: Arc<Mutex<Option<u64>>>,
}

impl UrlStore {
    /// An empty store that persists to `path`. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            urls: RwLock::new(HashMap::new()),
            version: AtomicU64::new(0),
            persisted: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory map with the contents of the persisted file and
    /// return how many records it held.
    ///
    /// A missing file is the first-run case and leaves the store as it is.
    /// On any error the in-memory map is not touched.
    pub async fn load(&self) -> Result<usize, LoadError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No data file at {}, starting empty", self.path.display());
                return Ok(0);
            }
            Err(source) => {
                return Err(LoadError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let loaded: HashMap<String, UrlRecord> =
            serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let count = loaded.len();
        let mut urls = self.urls.write().await;
        *urls = loaded;
        self.version.fetch_add(1, Ordering::Relaxed);
        drop(urls);

        tracing::info!("Loaded {} record(s) from {}", count, self.path.display());
        Ok(count)
    }

    /// Rewrite the persisted file with the full current map.
    ///
    /// The map is encoded under the read lock, so the file always reflects a
    /// single point in time. Writing happens on the blocking pool and runs to
    /// completion even if this future is dropped; a snapshot older than the
    /// one already on disk is discarded instead of written.
    pub async fn save(&self) -> Result<(), SaveError> {
        let urls = self.urls.read().await;
        let version = self.version.load(Ordering::Relaxed);

        // Sorted keys keep the file stable between saves.
        let sorted: BTreeMap<&str, &UrlRecord> =
            urls.iter().map(|(id, record)| (id.as_str(), record)).collect();

        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
        sorted.serialize(&mut ser)?;

        let path = self.path.clone();
        let persisted = Arc::clone(&self.persisted);
        let written =
            tokio::task::spawn_blocking(move || persist_snapshot(&path, &buf, version, &persisted))
                .await
                .unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)));

        if let Err(source) = written {
            return Err(SaveError::Write {
                path: self.path.clone(),
                source,
            });
        }

        tracing::debug!("Saved {} record(s) to {}", urls.len(), self.path.display());
        Ok(())
    }

    /// Store `original_url` under a freshly generated short id and return the id.
    ///
    /// The id is not checked against existing keys: a collision replaces the
    /// older record.
    pub async fn create(&self, original_url: impl Into<String>) -> String {
        let short_id = id::short_id();
        let record = UrlRecord::new(original_url);

        let mut urls = self.urls.write().await;
        if urls.insert(short_id.clone(), record).is_some() {
            tracing::warn!("Short id '{}' collided, previous record overwritten", short_id);
        }
        self.version.fetch_add(1, Ordering::Relaxed);

        short_id
    }

    /// Look up `short_id`, bump its click counter and return the target URL.
    ///
    /// Takes the write lock even though callers treat this as a read.
    pub async fn resolve(&self, short_id: &str) -> Result<String, NotFound> {
        let mut urls = self.urls.write().await;
        match urls.get_mut(short_id) {
            Some(record) => {
                record.clicks += 1;
                self.version.fetch_add(1, Ordering::Relaxed);
                Ok(record.original_url.clone())
            }
            None => Err(NotFound(short_id.to_owned())),
        }
    }
}

/// Write `bytes` to a scratch file beside the data file, fsync it, and rename
/// it over the data file. The scratch file is removed on any failure.
///
/// A symlinked data file is written through, and an existing file keeps its
/// permissions; a new one gets 0644 on unix.
fn persist_snapshot(
    path: &Path,
    bytes: &[u8],
    version: u64,
    persisted: &Mutex<Option<u64>>,
) -> io::Result<()> {
    // A poisoned lock still holds a valid version number.
    let mut last = persisted.lock().unwrap_or_else(|e| e.into_inner());
    if matches!(*last, Some(v) if v > version) {
        return Ok(());
    }

    let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut scratch = NamedTempFile::new_in(dir)?;
    scratch.write_all(bytes)?;
    let permissions = match std::fs::metadata(&target) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    };
    if let Some(permissions) = permissions {
        scratch.as_file().set_permissions(permissions)?;
    }
    scratch.as_file().sync_all()?;
    scratch.persist(&target).map_err(|e| e.error)?;

    *last = Some(version);
    Ok(())
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
