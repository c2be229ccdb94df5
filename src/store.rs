use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::StoreRecord;
use crate::error::BackupError;

#[derive(Debug, Clone)]
pub struct Snapshot {
    path: Utf8PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn temp_path(&self) -> Utf8PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Missing, unreadable and corrupt snapshots all load as empty.
    pub fn load(&self) -> Vec<StoreRecord> {
        if !self.path.as_std_path().exists() {
            return Vec::new();
        }
        let content = match fs::read_to_string(self.path.as_std_path()) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %self.path, error = %err, "snapshot unreadable, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<StoreRecord>>(&content) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(path = %self.path, error = %err, "snapshot corrupt, starting empty");
                Vec::new()
            }
        }
    }

    pub fn save(&self, records: &[StoreRecord]) -> Result<(), BackupError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| BackupError::Filesystem(err.to_string()))?;
        }
        let content = serde_json::to_vec_pretty(records)
            .map_err(|err| BackupError::Filesystem(err.to_string()))?;
        let tmp_path = self.temp_path();
        let mut file = fs::File::create(tmp_path.as_std_path())
            .map_err(|err| BackupError::Filesystem(format!("create {tmp_path}: {err}")))?;
        file.write_all(&content)
            .map_err(|err| BackupError::Filesystem(format!("write {tmp_path}: {err}")))?;
        file.sync_all()
            .map_err(|err| BackupError::Filesystem(format!("sync {tmp_path}: {err}")))?;
        drop(file);
        fs::rename(tmp_path.as_std_path(), self.path.as_std_path())
            .map_err(|err| BackupError::Filesystem(format!("rename {tmp_path}: {err}")))?;
        Ok(())
    }
}
