//! JSON Lines Record Store
//!
//! Append-only file with one serialized `SignedRoot` per line.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::crypto::SignedRoot;
use crate::error::{Result, SealError};
use crate::store::RootStore;

/// Signed root log backed by an append-only JSONL file.
#[derive(Debug)]
pub struct JsonlRootStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlRootStore {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!("Opened signed root log: {:?}", path);

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back from disk.
    pub fn load_all(&self) -> Result<Vec<SignedRoot>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: SignedRoot = serde_json::from_str(&line).map_err(|e| {
                SealError::StorageError(format!(
                    "Failed to parse record on line {}: {}",
                    line_no + 1,
                    e
                ))
            })?;
            records.push(record);
        }

        Ok(records)
    }
}

impl RootStore for JsonlRootStore {
    fn store(&self, record: &SignedRoot) -> Result<()> {
        let json = serde_json::to_string(record)?;

        let mut file = self
            .file
            .lock()
            .map_err(|_| SealError::StorageError("Record log lock poisoned".to_string()))?;
        writeln!(file, "{}", json)?;
        file.sync_data()?;

        debug!("Stored signed root {} for batch {}", record.id, record.batch_id);
        Ok(())
    }
}
