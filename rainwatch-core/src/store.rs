//! On-disk persistence of the latest result and the rendered feed.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime},
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::RainResult;

const RESULT_FILE: &str = "last.json";
const FEED_FILE: &str = "feed.xml";
const LOCK_FILE: &str = "last.lock";

const LOCK_ATTEMPTS: u32 = 500;
const LOCK_RETRY: Duration = Duration::from_millis(10);
// A lock older than this was left behind by a crashed writer.
const STALE_LOCK: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stored result at {path} is not valid JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("timed out waiting for store lock {path}")]
    Locked { path: PathBuf },

    #[error("stored result changed since it was read; refusing to overwrite")]
    Conflict,
}

impl StoreError {
    /// I/O failures and lock timeouts may succeed on retry; the others will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io { .. } | StoreError::Locked { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

/// Exclusive hold on the result file, released on drop.
#[derive(Debug)]
struct StoreLock {
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The last persisted result, or `None` before the first update.
    pub fn load_result(&self) -> Result<Option<RainResult>, StoreError> {
        let path = self.dir.join(RESULT_FILE);
        let Some(bytes) = read_optional(&path)? else {
            return Ok(None);
        };
        let result =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Json { path, source })?;
        Ok(Some(result))
    }

    /// Writes `next` only if the stored result still equals `expected`.
    ///
    /// The read, compare and write happen under the store lock, so of two
    /// writers holding the same `expected` only one succeeds.
    pub fn compare_and_swap(
        &self,
        expected: Option<&RainResult>,
        next: &RainResult,
    ) -> Result<(), StoreError> {
        let _lock = self.lock()?;

        let current = self.load_result()?;
        if current.as_ref() != expected {
            return Err(StoreError::Conflict);
        }
        self.write_result(next)
    }

    /// Replaces a stored result that can no longer be decoded.
    ///
    /// Fails with [`StoreError::Conflict`] if the record became readable
    /// (or disappeared) since the caller looked at it.
    pub fn replace_unreadable(&self, next: &RainResult) -> Result<(), StoreError> {
        let _lock = self.lock()?;

        match self.load_result() {
            Err(StoreError::Json { .. }) => self.write_result(next),
            Err(err) => Err(err),
            Ok(_) => Err(StoreError::Conflict),
        }
    }

    pub fn load_feed(&self) -> Result<Option<String>, StoreError> {
        let path = self.dir.join(FEED_FILE);
        Ok(read_optional(&path)?.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    pub fn save_feed(&self, document: &str) -> Result<(), StoreError> {
        let path = self.dir.join(FEED_FILE);
        self.write_atomic(&path, document.as_bytes())?;
        debug!(path = %path.display(), "stored feed");
        Ok(())
    }

    fn write_result(&self, next: &RainResult) -> Result<(), StoreError> {
        let path = self.dir.join(RESULT_FILE);
        let json = serde_json::to_vec_pretty(next).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        self.write_atomic(&path, &json)?;
        debug!(status = %next.status, path = %path.display(), "stored result");
        Ok(())
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        let path = self.dir.join(LOCK_FILE);
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        for _ in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(StoreLock { path }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "removing stale store lock");
                        // Another writer may have removed it first.
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    thread::sleep(LOCK_RETRY);
                }
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }

        Err(StoreError::Locked { path })
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(contents).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

fn is_stale(lock: &Path) -> bool {
    fs::metadata(lock)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
