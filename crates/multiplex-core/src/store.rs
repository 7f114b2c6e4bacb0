//! Durable storage of finished jobs' results.
//!
//! One `<id>.json` file per successful job, holding the JSON array of
//! [`FetchResult`]s in submission order. A missing file means the job is
//! running, unknown, failed, cancelled or evicted.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::AppError;
use crate::models::FetchResult;

const EXTENSION: &str = ".json";

/// Directory-backed result store.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::StorageError(io::Error::new(
                e.kind(),
                format!("failed to create {}: {e}", dir.display()),
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}{EXTENSION}"))
    }

    /// Highest job id found among stored results, or 0 for an empty store.
    ///
    /// Files whose name is not `<u64>.json` are ignored.
    pub fn last_id(&self) -> Result<u64, AppError> {
        let mut max_id = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(id) = entry.file_name().to_str().and_then(parse_id) {
                max_id = max_id.max(id);
            }
        }
        Ok(max_id)
    }

    /// Store a job's results.
    ///
    /// An empty result set is never written. Failures are logged and
    /// swallowed: the submitter will simply see "not found" when polling.
    pub async fn persist(&self, id: u64, results: &[FetchResult]) {
        if results.is_empty() {
            return;
        }

        match self.write(id, results).await {
            Ok(path) => tracing::debug!(job_id = id, path = %path.display(), "Results persisted"),
            Err(e) => tracing::error!(job_id = id, error = %e, "Failed to persist results"),
        }
    }

    async fn write(&self, id: u64, results: &[FetchResult]) -> Result<PathBuf, AppError> {
        let body = serde_json::to_vec(results)?;
        let dir = self.dir.clone();
        let target = self.path_for(id);

        tokio::task::spawn_blocking(move || -> Result<PathBuf, AppError> {
            // The temp file is removed on drop unless persisted.
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&body)?;
            tmp.flush()?;
            tmp.as_file_mut().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(target)
        })
        .await
        .map_err(|e| AppError::StorageError(io::Error::other(e)))?
    }

    /// Raw JSON of a stored result set, or `None` if there is none.
    pub async fn load(&self, id: u64) -> Result<Option<Vec<u8>>, AppError> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_id(file_name: &str) -> Option<u64> {
    let digits = file_name.strip_suffix(EXTENSION)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
