//! Persistence of snapshots as pretty JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::models::{Snapshot, SNAPSHOT_FORMAT_VERSION};

/// Directory under the output root that holds the snapshot.
pub const SNAPSHOT_DIR: &str = "json";

/// Snapshot file name.
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Reads and writes snapshots.
pub struct SnapshotStore;

impl SnapshotStore {
    /// `<output>/json/snapshot.json`.
    pub fn default_path(output_dir: impl AsRef<Path>) -> PathBuf {
        output_dir.as_ref().join(SNAPSHOT_DIR).join(SNAPSHOT_FILE)
    }

    /// Write the snapshot atomically: a temp file in the same directory is
    /// persisted over the target.
    pub fn save(snapshot: &Snapshot, path: impl AsRef<Path>) -> ModelResult<()> {
        let path = path.as_ref();
        debug!("Writing snapshot to {:?}", path);

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut content = serde_json::to_string_pretty(snapshot)?;
        content.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| ModelError::Io(e.error))?;
        Ok(())
    }

    /// Load a snapshot, checking its format version.
    pub fn load(path: impl AsRef<Path>) -> ModelResult<Snapshot> {
        let path = path.as_ref();
        debug!("Reading snapshot from {:?}", path);

        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| ModelError::InvalidFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(ModelError::InvalidFormat {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported format version {} (expected {})",
                    snapshot.format_version, SNAPSHOT_FORMAT_VERSION
                ),
            });
        }

        Ok(snapshot)
    }

    /// Load if present, `None` when the file does not exist.
    pub fn load_optional(path: impl AsRef<Path>) -> ModelResult<Option<Snapshot>> {
        match Self::load(path) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(ModelError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
