//! Uploaded file bytes.

use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// An open byte stream over a stored blob.
pub struct BlobStream {
    /// Readable bytes.
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Total length in bytes.
    pub len: u64,
}

impl fmt::Debug for BlobStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStream")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Byte storage for uploaded files.
///
/// `put` returns the location to record in the file catalog; `open` and
/// `delete` take that location back.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key` (a single file-name component).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for keys that are not a plain
    /// file name, [`StorageError::Conflict`] if the key is taken.
    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<PathBuf>;

    /// Open a stored blob for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored there.
    async fn open(&self, location: &Path) -> StorageResult<BlobStream>;

    /// Remove a stored blob. Missing blobs are not an error.
    async fn delete(&self, location: &Path) -> StorageResult<()>;
}

/// Check that `key` is a single normal path component.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for empty keys, separators, `.`/`..`
/// or NUL bytes.
pub fn validate_blob_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains('\0') || key.contains('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!("{key:?}")));
    }
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::InvalidKey(format!("{key:?}"))),
    }
}

// ---------------------------------------------------------------------------
// Local filesystem
// ---------------------------------------------------------------------------

/// Blobs as files in one directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Use `root` as the upload directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The upload directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_inside(&self, location: &Path) -> StorageResult<()> {
        let inside = location
            .strip_prefix(&self.root)
            .ok()
            .and_then(|rest| rest.to_str())
            .is_some_and(|name| validate_blob_key(name).is_ok());
        if inside {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(format!(
                "{} is outside the upload directory",
                location.display()
            )))
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        validate_blob_key(key)?;
        let path = self.root.join(key);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::Conflict(format!("blob exists: {key}")));
            },
            Err(e) => return Err(e.into()),
        };
        write_or_discard(&path, file, bytes).await?;

        debug!(path = %path.display(), len = bytes.len(), "blob written");
        Ok(path)
    }

    async fn open(&self, location: &Path) -> StorageResult<BlobStream> {
        self.ensure_inside(location)?;
        match fs::File::open(location).await {
            Ok(file) => {
                let len = file.metadata().await?.len();
                Ok(BlobStream {
                    reader: Box::new(file),
                    len,
                })
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(location.display().to_string()))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, location: &Path) -> StorageResult<()> {
        self.ensure_inside(location)?;
        match fs::remove_file(location).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `bytes` to a freshly created file at `path`, removing the file if
/// the write does not complete.
async fn write_or_discard<W>(path: &Path, mut file: W, bytes: &[u8]) -> StorageResult<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    drop(file);

    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %cleanup, "failed to remove partial blob");
        }
        return Err(e.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// In-memory [`BlobStore`] for tests.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(blobs.len())
    }

    /// Whether the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        self.len().map(|n| n == 0)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        validate_blob_key(key)?;
        let location = PathBuf::from(key);
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        if blobs.contains_key(&location) {
            return Err(StorageError::Conflict(format!("blob exists: {key}")));
        }
        blobs.insert(location.clone(), bytes.to_vec());
        Ok(location)
    }

    async fn open(&self, location: &Path) -> StorageResult<BlobStream> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let bytes = blobs
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.display().to_string()))?;
        Ok(BlobStream {
            len: bytes.len() as u64,
            reader: Box::new(Cursor::new(bytes)),
        })
    }

    async fn delete(&self, location: &Path) -> StorageResult<()> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        blobs.remove(location);
        Ok(())
    }
}
