//! Session credential and its process-wide store
//!
//! The store is the only mutable state shared between in-flight calls. It is
//! injected into the client as an `Arc<CredentialStore>`; readers always get
//! a full snapshot, so a request can never pair a new token with an old
//! expiry.

use chrono::{DateTime, Utc};
use dietlog_core::storage::{KeyValueStore, MemoryStore};
use dietlog_core::timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

const KEY_ACCESS_TOKEN: &str = "access_token";
const KEY_EXPIRES_AT: &str = "expired_at";
const KEY_DEVICE_ID: &str = "device_id";
const KEY_INSTALLATION_ID: &str = "installation_id";

/// Bearer token, its expiry and the device it was issued to
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(with = "timestamp::serde_lenient")]
    pub expires_at: DateTime<Utc>,
    pub device_id: String,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            device_id: device_id.into(),
        }
    }

    /// Non-empty token that expires strictly after `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expires_at > now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Holds the current credential and mirrors it to a [`KeyValueStore`]
///
/// Persistence failures are logged and otherwise ignored: the in-memory
/// value is authoritative for the life of the process. Backend writes run
/// outside the value lock, so a slow disk never stalls readers; `persist`
/// keeps the on-disk order equal to the in-memory order.
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
    persist: Mutex<()>,
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Empty store that persists to `backend` without reading it first
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            current: RwLock::new(None),
            persist: Mutex::new(()),
            backend,
        }
    }

    /// Store restored from whatever `backend` holds.
    ///
    /// A missing, partial or unparsable blob yields an empty store.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let restored = read_persisted(backend.as_ref());
        if restored.is_some() {
            debug!("Restored persisted credential");
        }
        Self {
            current: RwLock::new(restored),
            persist: Mutex::new(()),
            backend,
        }
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Snapshot of the current credential
    pub fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a credential exists, has a token and has not expired
    pub fn is_valid(&self) -> bool {
        self.get().is_some_and(|c| c.is_valid())
    }

    /// Replace the credential. Visible to readers as soon as this returns.
    pub fn save(&self, credential: Credential) {
        let _persist = self.persist.lock().unwrap_or_else(PoisonError::into_inner);

        let expires_at = timestamp::format(&credential.expires_at);
        let access_token = credential.access_token.clone();
        let device_id = credential.device_id.clone();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);

        let entries = [
            (KEY_ACCESS_TOKEN, access_token.as_str()),
            (KEY_EXPIRES_AT, expires_at.as_str()),
            (KEY_DEVICE_ID, device_id.as_str()),
        ];
        if let Err(e) = self.backend.put_all(&entries) {
            warn!(error = %e, "Failed to persist credential; keeping in-memory value");
        }

        debug!(expires_at = %expires_at, "Credential saved");
    }

    /// Forget the credential
    pub fn clear(&self) {
        let _persist = self.persist.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Err(e) = self
            .backend
            .remove_all(&[KEY_ACCESS_TOKEN, KEY_EXPIRES_AT, KEY_DEVICE_ID])
        {
            warn!(error = %e, "Failed to remove persisted credential");
        }

        if previous.is_some() {
            debug!("Credential cleared");
        }
    }

    /// Stable identifier for this installation, generated on first use.
    ///
    /// Survives [`clear`](Self::clear) so re-login reports the same device.
    /// Concurrent first calls agree on one id.
    pub fn device_id(&self) -> String {
        let _persist = self.persist.lock().unwrap_or_else(PoisonError::into_inner);

        match self.backend.get(KEY_INSTALLATION_ID) {
            Ok(Some(id)) if !id.is_empty() => return id,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read installation id"),
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.backend.put_all(&[(KEY_INSTALLATION_ID, id.as_str())]) {
            warn!(error = %e, "Failed to persist installation id");
        }
        id
    }
}

fn read_persisted(backend: &dyn KeyValueStore) -> Option<Credential> {
    let read = |key: &str| match backend.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted credential");
            None
        }
    };

    let access_token = read(KEY_ACCESS_TOKEN)?;
    let expires_at = read(KEY_EXPIRES_AT)?;
    let device_id = read(KEY_DEVICE_ID)?;

    match timestamp::parse(&expires_at) {
        Ok(expires_at) => Some(Credential {
            access_token,
            expires_at,
            device_id,
        }),
        Err(e) => {
            warn!(error = %e, "Discarding persisted credential with bad expiry");
            None
        }
    }
}
