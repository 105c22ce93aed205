//! Persisted record of uploaded resources
//!
//! The ledger file is a newline-delimited list of absolute resource URLs. It is
//! read in full when the ledger is opened and only ever appended to afterwards,
//! one line per successful upload.

use crate::HarvestError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Upload ledger shared by every in-flight upload
///
/// The in-memory set holds committed entries plus claims for uploads that are
/// still in progress. [`UploadLedger::claim`] is the at-most-once guard: only
/// the caller that inserts a URL gets to upload it.
#[derive(Debug)]
pub struct UploadLedger {
    path: PathBuf,
    entries: Mutex<HashSet<String>>,
    file: tokio::sync::Mutex<File>,
}

impl UploadLedger {
    /// Opens the ledger at `path`, creating an empty file if it does not exist
    ///
    /// Blank lines and surrounding whitespace are ignored.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let path = path.as_ref().to_path_buf();
        let contents = read_existing(&path).await?;
        let entries = parse_entries(&contents);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| ledger_error(&path, source))?;

        // A last line without its newline would merge with the next entry
        if !contents.is_empty() && !contents.ends_with('\n') {
            file.write_all(b"\n")
                .await
                .map_err(|source| ledger_error(&path, source))?;
            file.flush()
                .await
                .map_err(|source| ledger_error(&path, source))?;
        }

        tracing::debug!(
            "Opened upload ledger {} with {} entries",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            file: tokio::sync::Mutex::new(file),
        })
    }

    /// Returns true if `url` is uploaded or currently being uploaded
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Claims `url` for upload
    ///
    /// Returns false if it is already uploaded or claimed by another branch.
    pub fn claim(&self, url: &str) -> bool {
        let mut entries = self.lock();
        if entries.contains(url) {
            return false;
        }
        entries.insert(url.to_string())
    }

    /// Drops the claim on `url` after a failed upload
    pub fn release(&self, url: &str) {
        self.lock().remove(url);
    }

    /// Appends `url` to the ledger file
    ///
    /// Called once the object store has accepted the upload. The entry is
    /// flushed before returning.
    pub async fn commit(&self, url: &str) -> Result<(), HarvestError> {
        let mut file = self.file.lock().await;
        file.write_all(format!("{}\n", url).as_bytes())
            .await
            .map_err(|source| ledger_error(&self.path, source))?;
        file.flush()
            .await
            .map_err(|source| ledger_error(&self.path, source))?;
        Ok(())
    }

    /// Number of known entries, including in-progress claims
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reads the entries of a ledger file without opening it for writing
///
/// A missing file has no entries.
pub async fn read_ledger_entries(path: impl AsRef<Path>) -> Result<HashSet<String>, HarvestError> {
    let contents = read_existing(path.as_ref()).await?;
    Ok(parse_entries(&contents))
}

async fn read_existing(path: &Path) -> Result<String, HarvestError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ledger_error(path, source)),
    }
}

fn parse_entries(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn ledger_error(path: &Path, source: std::io::Error) -> HarvestError {
    tracing::error!("Upload ledger {} failed: {}", path.display(), source);
    HarvestError::Ledger {
        path: path.display().to_string(),
        source,
    }
}
