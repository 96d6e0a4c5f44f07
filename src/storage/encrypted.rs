use std::sync::Arc;

use super::KeyValueStore;
use crate::error::Result;
use crate::utils::crypto::SecretBox;

/// Decorator that seals every value before handing it to the inner store.
///
/// Values that fail to open are reported as plain text so the versioned
/// loader can treat them like any other corrupt blob.
pub struct EncryptedStore {
    inner: Arc<dyn KeyValueStore>,
    secret: SecretBox,
}

impl EncryptedStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, secret: SecretBox) -> Self {
        Self { inner, secret }
    }
}

impl KeyValueStore for EncryptedStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.inner.get(key)? {
            None => Ok(None),
            Some(raw) => match self.secret.open(&raw) {
                Ok(plain) => Ok(Some(plain)),
                Err(e) => {
                    log::warn!("[Storage] Could not open sealed value '{}': {}", key, e);
                    Ok(Some(raw))
                }
            },
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let sealed = self.secret.seal(value)?;
        self.inner.set(key, &sealed)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.keys_with_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn inner_store_never_sees_plain_text() {
        let inner = Arc::new(MemoryStore::new());
        let store = EncryptedStore::new(inner.clone(), SecretBox::from_passphrase("pw"));

        store.set("swipetune:auth_session", "refresh-token-123").unwrap();

        let raw = inner.get("swipetune:auth_session").unwrap().unwrap();
        assert!(!raw.contains("refresh-token-123"));
        assert_eq!(
            store.get("swipetune:auth_session").unwrap().as_deref(),
            Some("refresh-token-123")
        );
    }
}
