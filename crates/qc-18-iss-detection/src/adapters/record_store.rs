//! Durable "last ISS round" storage

use crate::domain::Round;
use crate::error::{IssError, IssResult};
use crate::ports::outbound::IssRecordStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Volatile store for tests and nodes without persistence.
#[derive(Debug, Default)]
pub struct InMemoryIssRecordStore {
    last_iss_round: Mutex<Option<Round>>,
}

impl InMemoryIssRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously recorded round.
    pub fn with_round(round: Round) -> Self {
        Self {
            last_iss_round: Mutex::new(Some(round)),
        }
    }
}

impl IssRecordStore for InMemoryIssRecordStore {
    fn load_last_iss_round(&self) -> IssResult<Option<Round>> {
        Ok(*self.last_iss_round.lock())
    }

    fn save_last_iss_round(&self, round: Round) -> IssResult<()> {
        *self.last_iss_round.lock() = Some(round);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IssRecord {
    last_iss_round: Round,
}

/// JSON file store.
///
/// Writes go to a sibling temp file which is then renamed over the
/// target, so a crash never leaves a half-written record.
#[derive(Debug)]
pub struct FileIssRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileIssRecordStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, action: &str, e: impl std::fmt::Display) -> IssError {
        IssError::Storage {
            reason: format!("{action} {}: {e}", self.path.display()),
        }
    }
}

impl IssRecordStore for FileIssRecordStore {
    fn load_last_iss_round(&self) -> IssResult<Option<Round>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_error("failed to read", e)),
        };
        let record: IssRecord =
            serde_json::from_str(&content).map_err(|e| self.storage_error("failed to parse", e))?;
        Ok(Some(record.last_iss_round))
    }

    fn save_last_iss_round(&self, round: Round) -> IssResult<()> {
        let _guard = self.write_lock.lock();
        let content = serde_json::to_string(&IssRecord {
            last_iss_round: round,
        })
        .map_err(|e| self.storage_error("failed to encode", e))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content).map_err(|e| self.storage_error("failed to write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.storage_error("failed to replace", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemoryIssRecordStore::new();
        assert_eq!(store.load_last_iss_round().unwrap(), None);
        store.save_last_iss_round(12).unwrap();
        assert_eq!(store.load_last_iss_round().unwrap(), Some(12));
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIssRecordStore::new(dir.path().join("iss.json"));
        assert_eq!(store.load_last_iss_round().unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iss.json");

        FileIssRecordStore::new(&path)
            .save_last_iss_round(42)
            .unwrap();
        let reopened = FileIssRecordStore::new(&path);
        assert_eq!(reopened.load_last_iss_round().unwrap(), Some(42));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iss.json");
        fs::write(&path, "not json").unwrap();

        let store = FileIssRecordStore::new(&path);
        assert!(matches!(
            store.load_last_iss_round(),
            Err(IssError::Storage { .. })
        ));
    }
}
