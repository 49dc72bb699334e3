//! File-backed usage ledger writing one JSON object per line.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::{LedgerError, UsageLedger, UsageRecord};

/// Append-only JSON-lines ledger.
///
/// Each record is serialized outside the lock, then appended and flushed
/// synchronously on the calling thread, which is a dispatch's async worker.
/// Keep the file on local storage.
pub struct JsonlUsageLedger {
    path: PathBuf,
    /// Appends are serialized through this handle.
    file: Mutex<File>,
}

impl JsonlUsageLedger {
    /// Open (creating if needed) the ledger file at `path` for appending.
    ///
    /// # Errors
    ///
    /// Directory creation or open failures.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Location of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back from disk in append order.
    ///
    /// # Errors
    ///
    /// I/O failures or a line that is not a valid record.
    pub fn read_all(&self) -> Result<Vec<UsageRecord>, LedgerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(OpenOptions::new().read(true).open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl UsageLedger for JsonlUsageLedger {
    fn record(&self, entry: UsageRecord) -> Result<(), LedgerError> {
        let line = serde_json::to_string(&entry)?;
        let mut file = self.file.lock();
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}
