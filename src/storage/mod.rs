//! Device-local key/value storage.
//!
//! The core only needs string blobs under namespaced keys; each platform shell
//! plugs in its own adapter. SQLite is the desktop/CLI default, the memory
//! store backs tests and ephemeral sessions.

pub mod encrypted;
pub mod sqlite;
pub mod versioned;

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::utils::safe_lock;

pub use encrypted::EncryptedStore;
pub use sqlite::SqliteStore;
pub use versioned::{load_versioned, save_versioned};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// All keys starting with `prefix`, sorted
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(safe_lock(&self.entries, "MemoryStore").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        safe_lock(&self.entries, "MemoryStore").insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        safe_lock(&self.entries, "MemoryStore").remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(safe_lock(&self.entries, "MemoryStore")
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
