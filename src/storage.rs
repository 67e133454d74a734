use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{error, warn};

pub const WORSHIP_HISTORY_KEY: &str = "worshipHistory";
pub const FASTING_HISTORY_KEY: &str = "fastingHistory";
pub const FASTING_STATUS_KEY: &str = "fastingStatus";
pub const BOOKMARK_KEY: &str = "quranBookmark";
pub const TASKS_KEY_PREFIX: &str = "worshipTasks_";

pub fn tasks_key(date_key: &str) -> String {
    format!("{TASKS_KEY_PREFIX}{date_key}")
}

/// String key/value persistence seam the ledger is written against.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// Reads `key` as JSON. A missing key and an unparsable value both read as
/// `None`; the latter is logged.
pub fn read_json<T, S>(store: &S, key: &str) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
    S: KeyValueStore + ?Sized,
{
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, "ignoring malformed stored value: {err}");
            None
        }
    }
}

pub fn write_json<T, S>(store: &mut S, key: &str, value: &T)
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, raw),
        Err(err) => error!(key, "failed to encode value: {err}"),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalStore {
    entries: BTreeMap<String, String>,
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "failed to write data file: {err}"),
            StorageError::Encode(err) => write!(f, "failed to encode data file: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub async fn load_data(path: &Path) -> LocalStore {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                LocalStore::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalStore::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            LocalStore::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &LocalStore) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(data).map_err(StorageError::Encode)?;
    fs::write(path, payload).await.map_err(StorageError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "ramadan_storage_{tag}_{}_{nanos}.json",
            std::process::id()
        ))
    }

    #[test]
    fn malformed_json_reads_as_absent() {
        let mut store = LocalStore::default();
        store.set(WORSHIP_HISTORY_KEY, "{not json".to_string());
        let parsed: Option<BTreeMap<String, u8>> = read_json(&store, WORSHIP_HISTORY_KEY);
        assert!(parsed.is_none());
        let missing: Option<Vec<String>> = read_json(&store, FASTING_HISTORY_KEY);
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn missing_file_loads_empty_store() {
        let data = load_data(&temp_path("missing")).await;
        assert!(data.keys().is_empty());
    }

    #[tokio::test]
    async fn unparsable_file_loads_empty_store() {
        let path = temp_path("garbage");
        fs::write(&path, b"[1, 2").await.unwrap();
        let data = load_data(&path).await;
        assert!(data.keys().is_empty());
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn persisted_store_is_a_flat_string_map() {
        let path = temp_path("persist");
        let mut data = LocalStore::default();
        data.set(FASTING_STATUS_KEY, "true".to_string());
        persist_data(&path, &data).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "fastingStatus": "true" }));
        assert_eq!(load_data(&path).await, data);
        let _ = fs::remove_file(&path).await;
    }
}
