//! Append-only JSONL record log.
//!
//! Every appended record is written as one self-contained JSON line and
//! flushed to disk before the append returns. Loading replays every line into
//! a fresh index. Existing lines are never rewritten, so an interrupted append
//! can only leave a torn final line behind; replay drops such a tail and
//! trims it from the file. Any other unreadable line marks the whole log as
//! corrupt: the file is moved aside and the store starts empty.

use crate::error::MemoryError;
use crate::model::Record;
use chrono::Utc;
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log file name inside the store root.
pub const LOG_FILE_NAME: &str = "memory_store.jsonl";

/// Outcome of loading the persisted log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// No log existed yet.
    Fresh,
    /// The log replayed cleanly.
    Restored {
        /// Number of replayed records.
        records: usize,
    },
    /// The log could not be replayed; the store started empty.
    Recovered {
        /// Why the log was rejected.
        reason: String,
        /// Where the rejected log was moved, when the move succeeded.
        quarantined: Option<PathBuf>,
    },
}

/// Records read back from disk together with the load status.
pub(crate) struct Replay {
    pub(crate) records: Vec<Record>,
    pub(crate) status: LoadStatus,
}

/// File-backed append-only record log.
#[derive(Debug, Clone)]
pub struct RecordLog {
    /// Path to the JSONL file.
    path: PathBuf,
}

impl RecordLog {
    /// Open the log under `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|err| {
            MemoryError::persistence(format!("create store root {}", root.display()), err)
        })?;
        Ok(Self {
            path: root.join(LOG_FILE_NAME),
        })
    }

    /// Path to the JSONL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one record as a single line.
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// line never precedes later appends.
    pub fn append(&self, record: &Record) -> Result<(), MemoryError> {
        let operation = || format!("append record {} ({})", record.id, record.scope);
        let mut line =
            serde_json::to_string(record).map_err(|err| MemoryError::persistence(operation(), err))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| MemoryError::persistence(operation(), err))?;
        let committed = file
            .metadata()
            .map_err(|err| MemoryError::persistence(operation(), err))?
            .len();

        let written = file
            .write_all(line.as_bytes())
            .and_then(|()| file.sync_data());
        if let Err(err) = written {
            if let Err(trim_err) = file.set_len(committed) {
                warn!(
                    "failed to trim partial append (path={}, err={})",
                    self.path.display(),
                    trim_err
                );
            }
            return Err(MemoryError::persistence(operation(), err));
        }
        debug!(
            "appended record (id={}, bytes={}, path={})",
            record.id,
            line.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Replay the log. Never fails: unreadable logs are quarantined and
    /// reported through [`LoadStatus::Recovered`].
    pub(crate) fn replay(&self, dimension: usize) -> Replay {
        if !self.path.exists() {
            info!("no record log yet (path={})", self.path.display());
            return Replay {
                records: Vec::new(),
                status: LoadStatus::Fresh,
            };
        }
        match self.read_records(dimension) {
            Ok(records) => {
                let count = records.len();
                Replay {
                    records,
                    status: LoadStatus::Restored { records: count },
                }
            }
            Err(reason) => {
                let quarantined = self.quarantine();
                warn!(
                    "record log unreadable, starting empty (path={}, reason={}, quarantined={})",
                    self.path.display(),
                    reason,
                    quarantined
                        .as_ref()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|| "no".to_string())
                );
                Replay {
                    records: Vec::new(),
                    status: LoadStatus::Recovered {
                        reason,
                        quarantined,
                    },
                }
            }
        }
    }

    fn read_records(&self, dimension: usize) -> Result<Vec<Record>, String> {
        let bytes = fs::read(&self.path).map_err(|err| format!("read failed: {err}"))?;
        let complete_len = bytes
            .iter()
            .rposition(|byte| *byte == b'\n')
            .map_or(0, |idx| idx + 1);
        let (complete, tail) = bytes.split_at(complete_len);

        let mut records = Vec::new();
        for (idx, line) in complete.split(|byte| *byte == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record = parse_line(line, dimension).map_err(|err| format!("line {}: {err}", idx + 1))?;
            records.push(record);
        }

        if !tail.iter().all(u8::is_ascii_whitespace) {
            self.repair_tail(tail, complete_len, dimension, &mut records)?;
        }
        Ok(records)
    }

    /// Handle bytes after the last newline left by an interrupted append.
    fn repair_tail(
        &self,
        tail: &[u8],
        complete_len: usize,
        dimension: usize,
        records: &mut Vec<Record>,
    ) -> Result<(), String> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|err| format!("open for tail repair failed: {err}"))?;
        match parse_line(tail, dimension) {
            Ok(record) => {
                let mut file = file;
                file.write_all(b"\n")
                    .and_then(|()| file.sync_data())
                    .map_err(|err| format!("terminating final line failed: {err}"))?;
                debug!("terminated unterminated final line (id={})", record.id);
                records.push(record);
            }
            Err(err) => {
                file.set_len(complete_len as u64)
                    .and_then(|()| file.sync_data())
                    .map_err(|trim_err| format!("dropping torn tail failed: {trim_err}"))?;
                warn!(
                    "dropped torn final line (path={}, bytes={}, err={})",
                    self.path.display(),
                    tail.len(),
                    err
                );
            }
        }
        Ok(())
    }

    /// Move an unreadable log aside so new appends start a clean file.
    fn quarantine(&self) -> Option<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
        let target = self
            .path
            .with_file_name(format!("{LOG_FILE_NAME}.corrupt-{stamp}"));
        match fs::rename(&self.path, &target) {
            Ok(()) => Some(target),
            Err(err) => {
                warn!(
                    "failed to quarantine record log (path={}, err={})",
                    self.path.display(),
                    err
                );
                None
            }
        }
    }
}

fn parse_line(line: &[u8], dimension: usize) -> Result<Record, String> {
    let record: Record = serde_json::from_slice(line).map_err(|err| err.to_string())?;
    record.scope.validate().map_err(|err| err.to_string())?;
    if record.vector.len() != dimension {
        return Err(format!(
            "vector has {} components, store expects {dimension}",
            record.vector.len()
        ));
    }
    Ok(record)
}
