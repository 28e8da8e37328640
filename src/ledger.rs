//! Archive ledger
//!
//! Per-feed, append-only record of the guids whose media file has been fully
//! written. Backed by `archive.txt` in the feed's archive directory, one guid per
//! line. The file is read once when the ledger is opened; after that it is only
//! ever appended to, one durable line per completed episode.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Name of the ledger file inside an archive directory
pub const LEDGER_FILE_NAME: &str = "archive.txt";

/// Open handle on a feed's archive ledger
#[derive(Debug)]
pub struct ArchiveLedger {
    path: PathBuf,
    file: File,
    known: HashSet<String>,
    loaded: usize,
}

impl ArchiveLedger {
    /// Open the ledger in `directory`, creating the directory and an empty
    /// `archive.txt` if needed, and load every recorded guid
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the directory or file cannot be created,
    /// opened or read (permissions, a non-directory in the way, ...).
    pub async fn open(directory: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| Error::storage(directory, e))?;

        let path = directory.join(LEDGER_FILE_NAME);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .await
            .map_err(|e| Error::storage(&path, e))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .await
            .map_err(|e| Error::storage(&path, e))?;

        let mut known = HashSet::new();
        let mut lines = 0usize;
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            lines += 1;
            if !known.insert(line.to_string()) {
                warn!(path = %path.display(), guid = line, "Duplicate guid in archive ledger");
            }
        }

        // A crash mid-append can leave a final line without its terminator;
        // terminate it so the next append starts on a fresh line.
        if !content.is_empty() && !content.ends_with('\n') {
            file.write_all(b"\n")
                .await
                .map_err(|e| Error::storage(&path, e))?;
            file.flush().await.map_err(|e| Error::storage(&path, e))?;
            file.sync_data()
                .await
                .map_err(|e| Error::storage(&path, e))?;
        }

        debug!(path = %path.display(), guids = known.len(), "Opened archive ledger");

        Ok(Self {
            path,
            file,
            known,
            loaded: lines,
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `guid` has been recorded
    pub fn contains(&self, guid: &str) -> bool {
        self.known.contains(guid)
    }

    /// Whether the ledger held no guids when it was opened
    ///
    /// Distinguishes a first-ever sync from an incremental one.
    pub fn is_empty(&self) -> bool {
        self.loaded == 0
    }

    /// Number of distinct guids known
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Append `guid` to the ledger and force it to storage before returning
    ///
    /// A guid that is already known is not written again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the write or sync fails, or if `guid` contains
    /// a line break (it could not be read back as a single entry).
    pub async fn record(&mut self, guid: &str) -> Result<()> {
        if guid.contains(['\n', '\r']) {
            return Err(Error::storage(
                &self.path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("guid {:?} contains a line break", guid),
                ),
            ));
        }
        if self.known.contains(guid) {
            debug!(guid, "Guid already recorded");
            return Ok(());
        }

        let line = format!("{}\n", guid);
        self.file
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::storage(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| Error::storage(&self.path, e))?;
        self.file
            .sync_data()
            .await
            .map_err(|e| Error::storage(&self.path, e))?;

        self.known.insert(guid.to_string());
        Ok(())
    }
}
