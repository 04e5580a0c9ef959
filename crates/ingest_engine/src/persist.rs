use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ingest_core::BatchResult;
use serde_json::json;
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

/// Hidden so directory readers that skip dotfiles do not index it.
pub const MANIFEST_FILENAME: &str = ".manifest.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Create `{root}/{batch_id}` empty, removing whatever a previous run left.
pub fn prepare_batch_dir(root: &Path, batch_id: &str) -> Result<PathBuf, PersistError> {
    let dir = root.join(batch_id);
    match fs::symlink_metadata(&dir) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(&dir)?,
        Ok(_) => fs::remove_file(&dir)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(PersistError::OutputDir(err.to_string())),
    }
    ensure_output_dir(&dir)?;
    Ok(dir)
}

/// Random, collision-free file name: `{uuid-v4}{extension}`.
pub fn unique_filename(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), extension)
}

/// Writes files into one directory without ever exposing partial content.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Replace existing file if present.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Write content under a fresh unique name with the given extension.
    pub fn write_unique(&self, extension: &str, content: &str) -> Result<PathBuf, PersistError> {
        self.write(&unique_filename(extension), content)
    }

    /// Move a finished download to a fresh unique name.
    ///
    /// On failure the temp file is dropped, which deletes it.
    pub fn promote(&self, download: NamedTempFile, extension: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(unique_filename(extension));
        download
            .persist_noclobber(&target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Write the batch's positional records next to its documents.
pub fn write_manifest(dir: &Path, result: &BatchResult) -> Result<PathBuf, PersistError> {
    let documents = serde_json::to_value(&result.slots).map_err(io::Error::other)?;
    let manifest = json!({
        "batch_id": result.batch_id,
        "document_count": result.succeeded(),
        "failed_count": result.failed(),
        "documents_downloaded": documents,
    });
    let content = serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?;
    AtomicFileWriter::new(dir.to_path_buf()).write(MANIFEST_FILENAME, &content)
}
