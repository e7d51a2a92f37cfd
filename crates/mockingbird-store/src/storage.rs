//! Session storage and persistence.
//!
//! Each session owns a directory of JSON documents. The API key store is
//! global. The session the CLI is working in is tracked in a `session` file.
//!
//! ## File Layout
//!
//! ```text
//! ~/.local/share/mockingbird/
//! ├── sessions/
//! │   └── 3f2c9a1e-..../
//! │       ├── functions.json     (function stubs)
//! │       └── instructions.json  (assistant instructions)
//! ├── apiKeys.json               (encrypted provider keys)
//! └── session                    (current session id)
//! ```

use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};

const MAX_SESSION_ID_LEN: usize = 128;

/// Manages session data on disk.
#[derive(Debug)]
pub struct Storage {
    /// Per-session directories
    sessions_dir: PathBuf,

    /// Current session marker
    session_file: PathBuf,

    /// Encrypted API keys
    keys_file: PathBuf,

    /// One lock per session, serializing read-modify-write sequences.
    /// `std::sync::Mutex` is held only on the blocking pool via [`Storage::run`].
    session_locks: DashMap<String, Arc<Mutex<()>>>,

    /// Serializes API key read-modify-write operations.
    keys_lock: Mutex<()>,
}

impl Storage {
    /// Creates a storage manager under the user's local data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data directory cannot be determined
    /// - Directory creation fails
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| StoreError::Storage("Failed to determine data directory".to_string()))?
            .join("mockingbird");

        Self::with_data_dir(&data_dir)
    }

    /// Creates a storage manager rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn with_data_dir(data_dir: &Path) -> Result<Self> {
        let sessions_dir = data_dir.join("sessions");

        // Owner-only: the directory holds encrypted keys
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&sessions_dir)
            .map_err(|e| StoreError::Storage(format!("Failed to create sessions directory: {e}")))?;

        fs::set_permissions(data_dir, fs::Permissions::from_mode(0o700)).map_err(|e| {
            StoreError::Storage(format!("Failed to set data directory permissions: {e}"))
        })?;

        Ok(Self {
            sessions_dir,
            session_file: data_dir.join("session"),
            keys_file: data_dir.join("apiKeys.json"),
            session_locks: DashMap::new(),
            keys_lock: Mutex::new(()),
        })
    }

    /// Runs a synchronous closure on the blocking thread pool.
    ///
    /// Async callers go through here so file I/O never blocks tokio
    /// worker threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocking task panics or the closure fails.
    pub async fn run<F, T>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&this))
            .await
            .map_err(|e| StoreError::Storage(format!("Task join error: {e}")))?
    }

    /// Gets the current session ID, if one has been started.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be read or holds an invalid ID.
    pub fn current_session(&self) -> Result<Option<String>> {
        if !self.session_file.exists() {
            return Ok(None);
        }

        let id = fs::read_to_string(&self.session_file)?.trim().to_string();
        if id.is_empty() {
            return Ok(None);
        }

        validate_session_id(&id)?;
        Ok(Some(id))
    }

    /// Makes `id` the current session.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is invalid or the marker cannot be written.
    pub fn set_current_session(&self, id: &str) -> Result<()> {
        validate_session_id(id)?;
        write_atomic(&self.session_file, id.as_bytes())
    }

    /// Starts a fresh session and makes it current.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be written.
    #[instrument(skip(self))]
    pub fn new_session(&self) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.set_current_session(&id)?;
        debug!(session_id = %id, "Started session");
        Ok(id)
    }

    /// Returns the current session, starting one on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be read or written.
    pub fn ensure_session(&self) -> Result<String> {
        match self.current_session()? {
            Some(id) => Ok(id),
            None => self.new_session(),
        }
    }

    /// Runs `f` while holding the lock for `session_id`.
    ///
    /// Read-modify-write sequences on one session's documents go through
    /// here so concurrent writers do not lose each other's updates.
    pub(crate) fn with_session_lock<T>(
        &self,
        session_id: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let lock = Arc::clone(
            self.session_locks
                .entry(session_id.to_string())
                .or_default()
                .value(),
        );
        let _guard = lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("Session lock poisoned: {e}")))?;
        f()
    }

    pub(crate) fn lock_keys(&self) -> Result<MutexGuard<'_, ()>> {
        self.keys_lock
            .lock()
            .map_err(|e| StoreError::Storage(format!("Key store lock poisoned: {e}")))
    }

    /// Returns the path of a document in a session's directory.
    pub(crate) fn session_path(&self, session_id: &str, name: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.sessions_dir.join(session_id).join(name))
    }

    pub(crate) fn keys_path(&self) -> &Path {
        &self.keys_file
    }
}

/// Checks that a session ID is non-empty and safe to use as a directory name.
///
/// # Errors
///
/// Returns [`StoreError::InvalidSessionId`] otherwise.
pub fn validate_session_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId(id.to_string()))
    }
}

/// Reads a JSON document, yielding the default when the file does not exist.
pub(crate) fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Writes a JSON document atomically, creating its directory if needed.
#[instrument(skip_all, fields(path = %path.display()))]
pub(crate) fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    if let Some(parent) = path.parent() {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(parent)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())?;

    debug!(path = %path.display(), size_bytes = json.len(), "Saved document");
    Ok(())
}

// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
