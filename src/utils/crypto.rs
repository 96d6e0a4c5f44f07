//! AES-256-GCM sealing for secrets kept in device storage (auth tokens).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{ClientError, Result};

const SEALED_PREFIX: &str = "gcm1:";
const NONCE_LEN: usize = 12;

pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    /// Derive the 256-bit key from an arbitrary passphrase
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(digest.as_slice());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Passphrase bound to this machine's user and data directory.
    ///
    /// Keeps tokens unreadable when the database file is copied elsewhere;
    /// set `SWIPETUNE_STORAGE_SECRET` for a real secret.
    pub fn for_device(data_dir: &std::path::Path) -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        Self::from_passphrase(&format!(
            "{}|{}|{}",
            crate::constants::APP_NAME,
            user,
            data_dir.display()
        ))
    }

    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| ClientError::Storage("failed to encrypt secret".to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", SEALED_PREFIX, STANDARD.encode(payload)))
    }

    pub fn open(&self, sealed: &str) -> Result<String> {
        let encoded = sealed
            .strip_prefix(SEALED_PREFIX)
            .ok_or_else(|| ClientError::Storage("value is not sealed".to_string()))?;
        let payload = STANDARD
            .decode(encoded)
            .map_err(|e| ClientError::Storage(format!("invalid sealed encoding: {}", e)))?;
        if payload.len() <= NONCE_LEN {
            return Err(ClientError::Storage("sealed value too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| ClientError::Storage("failed to decrypt secret".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| ClientError::Storage(format!("decrypted secret is not UTF-8: {}", e)))
    }

    pub fn is_sealed(value: &str) -> bool {
        value.starts_with(SEALED_PREFIX)
    }
}
