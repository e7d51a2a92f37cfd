//! Encrypted provider API keys.
//!
//! Keys are global, not per session, and stored in `apiKeys.json` keyed by
//! lowercase provider name. Each value is AES-256-GCM ciphertext encoded as
//! hex `iv:tag:ciphertext`. The cipher key is the SHA-256 digest of
//! `MOCKINGBIRD_ENCRYPTION_KEY`, or of a development default when unset.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use async_trait::async_trait;
use mockingbird_client::{ClientError, EnvKeys, KeySource};
use mockingbird_common::Provider;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::error::{Result, StoreError};
use crate::storage::{Storage, read_json, write_json};

/// Environment variable holding the encryption secret.
pub const ENCRYPTION_KEY_VAR: &str = "MOCKINGBIRD_ENCRYPTION_KEY";

const DEV_ENCRYPTION_SECRET: &str = "default-dev-key-change-in-production";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MASK: &str = "••••••••";

/// Masks a key for display: the first and last four characters around a
/// fixed run of dots, or only dots for keys shorter than eight characters.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 8 {
        return MASK.to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{MASK}{tail}")
}

/// AES-256-GCM over API keys.
pub struct KeyCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for KeyCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCipher").finish_non_exhaustive()
    }
}

impl KeyCipher {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = Sha256::digest(secret.expose_secret().as_bytes());
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Uses `MOCKINGBIRD_ENCRYPTION_KEY`, falling back to the development
    /// default.
    #[must_use]
    pub fn from_env() -> Self {
        let secret = std::env::var(ENCRYPTION_KEY_VAR)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                warn!("{ENCRYPTION_KEY_VAR} is not set, using the development encryption key");
                DEV_ENCRYPTION_SECRET.to_string()
            });
        Self::new(&SecretString::from(secret))
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encryption`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0_u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| StoreError::Encryption(e.to_string()))?;

        // The tag trails the ciphertext.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypts a value produced by [`encrypt`](Self::encrypt).
    ///
    /// Returns `None` for malformed input, a wrong key or tampered data.
    #[must_use]
    pub fn decrypt(&self, encoded: &str) -> Option<String> {
        let mut parts = encoded.split(':');
        let (Some(nonce), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        let nonce = hex::decode(nonce).ok().filter(|n| n.len() == NONCE_LEN)?;
        let tag = hex::decode(tag).ok().filter(|t| t.len() == TAG_LEN)?;
        let mut sealed = hex::decode(ciphertext).ok()?;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .ok()?;
        String::from_utf8(plaintext).ok()
    }
}

/// A stored key as listed: never the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedKey {
    pub encrypted: bool,
    pub masked: String,
}

type StoredKeys = BTreeMap<String, String>;

/// The global API key store.
///
/// As a [`KeySource`], a stored key wins over the environment.
#[derive(Debug, Clone)]
pub struct KeyStore {
    storage: Arc<Storage>,
    cipher: Arc<KeyCipher>,
}

impl KeyStore {
    /// Creates a key store encrypting with the secret from the environment.
    #[must_use]
    pub fn new(storage: Arc<Storage>) -> Self {
        Self::with_cipher(storage, KeyCipher::from_env())
    }

    #[must_use]
    pub fn with_cipher(storage: Arc<Storage>, cipher: KeyCipher) -> Self {
        Self {
            storage,
            cipher: Arc::new(cipher),
        }
    }

    /// Encrypts and stores `api_key` for `provider`, returning its mask.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedProvider`] for an unknown provider,
    /// [`StoreError::Validation`] for an empty key, and an error if storage
    /// fails.
    #[instrument(skip(self, api_key))]
    pub fn set(&self, provider: &str, api_key: &str) -> Result<String> {
        let provider = parse_provider(provider)?;
        if api_key.is_empty() {
            return Err(StoreError::Validation("API key is required".to_string()));
        }

        let encrypted = self.cipher.encrypt(api_key)?;
        let _guard = self.storage.lock_keys()?;
        let mut keys: StoredKeys = read_json(self.storage.keys_path())?;
        keys.insert(provider.as_str().to_string(), encrypted);
        write_json(self.storage.keys_path(), &keys)?;

        debug!(provider = %provider, "Stored API key");
        Ok(mask_key(api_key))
    }

    /// Removes the stored key for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedProvider`] for an unknown provider,
    /// [`StoreError::KeyNotFound`] when no key is stored, and an error if
    /// storage fails.
    #[instrument(skip(self))]
    pub fn remove(&self, provider: &str) -> Result<()> {
        let provider = parse_provider(provider)?;

        let _guard = self.storage.lock_keys()?;
        let mut keys: StoredKeys = read_json(self.storage.keys_path())?;
        if keys.remove(provider.as_str()).is_none() {
            return Err(StoreError::KeyNotFound(provider.as_str().to_string()));
        }
        write_json(self.storage.keys_path(), &keys)
    }

    /// Lists the stored keys, masked. Entries that no longer decrypt are
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be read.
    pub fn list(&self) -> Result<BTreeMap<String, MaskedKey>> {
        let keys: StoredKeys = read_json(self.storage.keys_path())?;

        Ok(keys
            .into_iter()
            .filter_map(|(provider, encrypted)| {
                let key = self.decrypt_entry(&provider, &encrypted)?;
                Some((
                    provider,
                    MaskedKey {
                        encrypted: true,
                        masked: mask_key(&key),
                    },
                ))
            })
            .collect())
    }

    /// Returns the decrypted key stored for `provider`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be read.
    pub fn get(&self, provider: Provider) -> Result<Option<SecretString>> {
        let keys: StoredKeys = read_json(self.storage.keys_path())?;

        Ok(keys
            .get(provider.as_str())
            .and_then(|encrypted| self.decrypt_entry(provider.as_str(), encrypted))
            .filter(|key| !key.is_empty())
            .map(SecretString::from))
    }

    fn decrypt_entry(&self, provider: &str, encrypted: &str) -> Option<String> {
        let key = self.cipher.decrypt(encrypted);
        if key.is_none() {
            warn!(provider, "Stored API key could not be decrypted, ignoring it");
        }
        key
    }
}

fn parse_provider(provider: &str) -> Result<Provider> {
    Provider::from_str(provider).map_err(|_| StoreError::UnsupportedProvider(provider.to_string()))
}

#[async_trait]
impl KeySource for KeyStore {
    async fn api_key(&self, provider: Provider) -> std::result::Result<SecretString, ClientError> {
        let store = self.clone();
        let stored = self
            .storage
            .run(move |_| store.get(provider))
            .await
            .map_err(|e| ClientError::KeySourceError(e.to_string()))?;

        stored
            .or_else(|| EnvKeys::lookup(provider))
            .ok_or_else(|| ClientError::CredentialsMissing {
                provider: provider.as_str().to_string(),
            })
    }
}
