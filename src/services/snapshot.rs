use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Upper bound on same-second collisions before giving up.
const MAX_SUFFIX: u32 = 1000;

/// Writes timestamp-named, write-once copies of fetched payloads.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `body` verbatim under `<label>_<timestamp>.json`.
    ///
    /// Files are created with create-new semantics; a collision within the
    /// same second gets a numeric suffix instead of replacing the earlier
    /// snapshot.
    pub fn write(
        &self,
        label: &str,
        body: &str,
        captured_at: DateTime<Local>,
    ) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let stamp = captured_at.format(TIMESTAMP_FORMAT).to_string();

        for attempt in 0..MAX_SUFFIX {
            let path = self.dir.join(snapshot_file_name(label, &stamp, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(body.as_bytes())?;
                    file.sync_all()?;
                    tracing::info!(path = %path.display(), bytes = body.len(), "Snapshot written");
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(SnapshotError::Io(e)),
            }
        }

        Err(SnapshotError::Exhausted {
            label: label.to_string(),
            stamp,
        })
    }
}

fn snapshot_file_name(label: &str, stamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}_{}.json", label, stamp)
    } else {
        format!("{}_{}_{}.json", label, stamp, attempt)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("No free snapshot name for {label} at {stamp}")]
    Exhausted { label: String, stamp: String },
}
