use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::SessionSnapshot;

#[derive(Serialize)]
struct SnapshotRecord<'a> {
    label: &'a str,
    frame: u64,
    written_at: DateTime<Utc>,
    session: &'a SessionSnapshot,
}

/// Writes `<dir>/<label>/frame_NNNNNN.json` every `interval` frames.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: &Path, interval: u64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            interval,
        }
    }

    pub fn maybe_write(
        &self,
        frame: u64,
        label: &str,
        snapshot: &SessionSnapshot,
    ) -> Result<Option<PathBuf>> {
        if self.interval == 0 || frame % self.interval != 0 {
            return Ok(None);
        }
        let dir = self.dir.join(label);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
        let path = dir.join(format!("frame_{frame:06}.json"));
        let record = SnapshotRecord {
            label,
            frame,
            written_at: Utc::now(),
            session: snapshot,
        };
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        Ok(Some(path))
    }
}
