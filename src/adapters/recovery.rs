//! Recovery record storage adapters.
//!
//! - [`FileRecoveryStore`]: the on-robot text file.  Writes go to a
//!   sibling temp file and are renamed into place, so a crash leaves
//!   either the old record or the new one.
//! - [`MemoryRecoveryStore`]: in-memory store that keeps every write,
//!   for host testing and simulation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::debug;

use crate::app::ports::RecoveryStore;
use crate::error::RecoveryError;
use crate::recovery::RecoveryRecord;

pub struct FileRecoveryStore {
    path: PathBuf,
}

impl FileRecoveryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RecoveryStore for FileRecoveryStore {
    fn save(&self, record: &RecoveryRecord) -> Result<(), RecoveryError> {
        let tmp = self.temp_path();
        fs::write(&tmp, record.encode())?;
        fs::rename(&tmp, &self.path)?;
        debug!("recovery record written to {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<RecoveryRecord>, RecoveryError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => RecoveryRecord::parse(&text).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store.  Clones share the same history.
#[derive(Clone, Default)]
pub struct MemoryRecoveryStore {
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record written so far, encoded, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn save(&self, record: &RecoveryRecord) -> Result<(), RecoveryError> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.encode());
        Ok(())
    }

    fn load(&self) -> Result<Option<RecoveryRecord>, RecoveryError> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .last()
            .map(String::as_str)
            .map(RecoveryRecord::parse)
            .transpose()
    }
}
