//! Schema-versioned JSON blobs: `{"version": 1, "data": ...}`.
//!
//! Loading never fails. A blob that does not parse, or carries another schema
//! version, is copied to `<key>:backup:<unix-ms>` and removed so the caller
//! starts from empty state. Only the newest `MAX_BACKUPS_PER_KEY` backups of
//! a key are kept.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::KeyValueStore;
use crate::constants::{BACKUP_KEY_SEGMENT, MAX_BACKUPS_PER_KEY, STORAGE_SCHEMA_VERSION};
use crate::error::{ClientError, Result};
use crate::utils::now_millis;

#[derive(Serialize, Deserialize)]
struct VersionedBlob<T> {
    version: u32,
    data: T,
}

pub fn backup_key(key: &str) -> String {
    format!("{}:{}:{}", key, BACKUP_KEY_SEGMENT, now_millis())
}

pub fn load_versioned<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::error!("[Storage] Failed to read '{}': {}", key, e);
            return None;
        }
    };

    match decode::<T>(key, &raw) {
        Ok(data) => Some(data),
        Err(e) => {
            log::warn!("[Storage] {} - backing up and resetting", e);
            quarantine(store, key, &raw);
            None
        }
    }
}

pub fn save_versioned<T: Serialize>(store: &dyn KeyValueStore, key: &str, data: &T) -> Result<()> {
    let blob = VersionedBlob {
        version: STORAGE_SCHEMA_VERSION,
        data,
    };
    let json = serde_json::to_string(&blob)
        .map_err(|e| ClientError::Storage(format!("failed to encode '{}': {}", key, e)))?;
    store.set(key, &json)
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    let corrupt = |reason: String| ClientError::StorageCorrupt {
        key: key.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| corrupt("missing schema version".to_string()))?;
    if version != STORAGE_SCHEMA_VERSION as u64 {
        return Err(corrupt(format!(
            "schema version {} (expected {})",
            version, STORAGE_SCHEMA_VERSION
        )));
    }

    let blob: VersionedBlob<T> =
        serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
    Ok(blob.data)
}

fn quarantine(store: &dyn KeyValueStore, key: &str, raw: &str) {
    let backup = backup_key(key);
    if let Err(e) = store.set(&backup, raw) {
        log::error!("[Storage] Failed to back up '{}' to '{}': {}", key, backup, e);
    } else {
        log::info!("[Storage] Backed up corrupt '{}' to '{}'", key, backup);
    }
    if let Err(e) = store.remove(key) {
        log::error!("[Storage] Failed to reset '{}': {}", key, e);
    }
    prune_backups(store, key);
}

fn prune_backups(store: &dyn KeyValueStore, key: &str) {
    let prefix = format!("{}:{}:", key, BACKUP_KEY_SEGMENT);
    let mut backups = match store.keys_with_prefix(&prefix) {
        Ok(keys) => keys,
        Err(e) => {
            log::error!("[Storage] Failed to list backups of '{}': {}", key, e);
            return;
        }
    };
    if backups.len() <= MAX_BACKUPS_PER_KEY {
        return;
    }

    // Newest first by the millisecond suffix
    backups.sort_by_key(|backup| {
        std::cmp::Reverse(backup[prefix.len()..].parse::<u64>().unwrap_or(0))
    });
    for old in &backups[MAX_BACKUPS_PER_KEY..] {
        match store.remove(old) {
            Ok(()) => log::debug!("[Storage] Pruned old backup '{}'", old),
            Err(e) => log::error!("[Storage] Failed to prune backup '{}': {}", old, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn saved_blob_loads_back() {
        let store = MemoryStore::new();
        save_versioned(&store, "k", &vec![1, 2, 3]).unwrap();
        assert_eq!(load_versioned::<Vec<i32>>(&store, "k"), Some(vec![1, 2, 3]));
        assert!(store.get("k").unwrap().unwrap().contains("\"version\":1"));
    }

    #[test]
    fn missing_key_is_none_without_backup() {
        let store = MemoryStore::new();
        assert_eq!(load_versioned::<Vec<i32>>(&store, "k"), None);
        assert!(store.keys_with_prefix("k:backup").unwrap().is_empty());
    }

    #[test]
    fn unparseable_blob_is_backed_up_and_cleared() {
        let store = MemoryStore::new();
        store.set("k", "{not json").unwrap();

        assert_eq!(load_versioned::<Vec<i32>>(&store, "k"), None);
        assert_eq!(store.get("k").unwrap(), None);

        let backups = store.keys_with_prefix("k:backup:").unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(store.get(&backups[0]).unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn other_schema_version_is_treated_as_corrupt() {
        let store = MemoryStore::new();
        store.set("k", r#"{"version": 2, "data": [1]}"#).unwrap();

        assert_eq!(load_versioned::<Vec<i32>>(&store, "k"), None);
        assert_eq!(store.keys_with_prefix("k:backup:").unwrap().len(), 1);
    }

    #[test]
    fn repeated_corruption_keeps_only_the_newest_backups() {
        let store = MemoryStore::new();
        for ms in [1000u64, 3000, 2000, 4000] {
            store.set(&format!("k:backup:{}", ms), "old").unwrap();
        }
        store.set("other:backup:1000", "untouched").unwrap();
        store.set("k", "garbage").unwrap();

        assert_eq!(load_versioned::<Vec<i32>>(&store, "k"), None);

        let mut backups = store.keys_with_prefix("k:backup:").unwrap();
        backups.sort();
        assert_eq!(backups.len(), MAX_BACKUPS_PER_KEY);
        assert!(backups.contains(&"k:backup:3000".to_string()));
        assert!(backups.contains(&"k:backup:4000".to_string()));
        assert!(backups.iter().any(|b| store.get(b).unwrap().as_deref() == Some("garbage")));
        assert!(store.get("other:backup:1000").unwrap().is_some());
    }
}
