use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("record could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Whole-record key/value storage. Writes overwrite, last writer wins.
pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One `<key>.json` file per record inside `dir`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Identities are user supplied; keep them from escaping the directory
        let file_name: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl Storage for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        records.remove(key);
        Ok(())
    }
}

/// Reads and decodes a record. Unparseable records are dropped and logged.
pub fn read_json<T: serde::de::DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::error!("Failed to read record {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Discarding malformed record {}: {}", key, e);
            None
        }
    }
}

pub fn write_json<T: serde::Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(value)?;
    storage.write(key, &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        assert_eq!(store.read("roster").unwrap(), None);
        store.write("roster", "[]").unwrap();
        assert_eq!(store.read("roster").unwrap().as_deref(), Some("[]"));

        store.remove("roster").unwrap();
        store.remove("roster").unwrap();
        assert_eq!(store.read("roster").unwrap(), None);
    }

    #[test]
    fn file_store_keeps_hostile_keys_inside_its_directory() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("data")).unwrap();

        store.write("progress_../../etc", "{}").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path().join("data")).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.read("progress_../../etc").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn malformed_record_reads_as_missing() {
        let store = MemoryStore::new();
        store.write("broken", "{not json").unwrap();

        let value: Option<Vec<u32>> = read_json(&store, "broken");
        assert_eq!(value, None);
    }

    #[test]
    fn json_helpers_round_trip() {
        let store = MemoryStore::new();
        write_json(&store, "numbers", &vec![1u32, 2, 3]).unwrap();

        let value: Option<Vec<u32>> = read_json(&store, "numbers");
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
