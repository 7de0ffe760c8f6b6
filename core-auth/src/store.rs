//! Credential persistence.
//!
//! The store is a single JSON file with an explicit schema version, so a
//! future format change cannot be misread as today's fields. Loading fails
//! soft: a missing, unreadable, corrupted, or unknown-version store reads as
//! "no credential" and triggers a fresh authorization instead of an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{AuthError, Result};
use crate::types::Credential;

/// Current on-disk schema version.
pub const STORE_VERSION: u32 = 1;

/// Default store location, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = "token.json";

/// Serializable on-disk form of a credential.
#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    version: u32,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: chrono::DateTime<chrono::Utc>,
    scopes: Vec<String>,
}

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted credential, if a usable one exists.
    ///
    /// Never errors: anything short of a well-formed current-version store is
    /// logged and treated as absent.
    pub fn load(&self) -> Option<Credential> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no credential store");
                return None;
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "credential store unreadable; ignoring it");
                return None;
            }
        };

        let stored: StoredCredential = match serde_json::from_slice(&bytes) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "credential store corrupted; ignoring it");
                return None;
            }
        };

        if stored.version != STORE_VERSION {
            warn!(
                path = ?self.path,
                version = stored.version,
                "unsupported credential store version; ignoring it"
            );
            return None;
        }

        debug!(
            path = ?self.path,
            has_refresh_token = stored.refresh_token.is_some(),
            "credential loaded"
        );

        Some(Credential {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.expires_at,
            scopes: stored.scopes.into_iter().collect(),
        })
    }

    /// Persist the credential atomically: write to a temporary file in the
    /// same directory, then rename over the target, so a crash mid-write
    /// cannot leave a half-written store behind.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let stored = StoredCredential {
            version: STORE_VERSION,
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            expires_at: credential.expires_at,
            scopes: credential.scopes.iter().cloned().collect(),
        };

        let json = serde_json::to_vec_pretty(&stored).map_err(|e| {
            AuthError::StoreIo(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).map_err(AuthError::StoreIo)?;
        fs::rename(&tmp, &self.path).map_err(AuthError::StoreIo)?;

        debug!(path = ?self.path, "credential persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;

    fn sample_credential() -> Credential {
        Credential {
            access_token: "at1".to_string(),
            refresh_token: Some("rt1".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
            scopes: ["https://www.googleapis.com/auth/drive".to_string()]
                .into_iter()
                .collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn save_then_load_round_trips_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        let credential = sample_credential();
        store.save(&credential).unwrap();
        let loaded = store.load().expect("credential should load");

        assert_eq!(loaded, credential);
    }

    #[test]
    fn load_on_missing_store_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn load_on_corrupted_bytes_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, b"{not json at all").unwrap();

        let store = CredentialStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn load_on_truncated_store_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        let store = CredentialStore::new(&path);
        store.save(&sample_credential()).unwrap();

        let full = fs::read(&path).unwrap();
        fs::write(&path, &full[..full.len() / 2]).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn load_on_unknown_version_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(
            &path,
            serde_json::json!({
                "version": 99,
                "access_token": "at1",
                "refresh_token": null,
                "expires_at": Utc::now(),
                "scopes": [],
            })
            .to_string(),
        )
        .unwrap();

        let store = CredentialStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn save_overwrites_previous_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));

        let mut credential = sample_credential();
        store.save(&credential).unwrap();

        credential.access_token = "at2".to_string();
        store.save(&credential).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token, "at2");
        assert_eq!(loaded.refresh_token.as_deref(), Some("rt1"));
    }

    #[test]
    fn save_leaves_no_temporary_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        store.save(&sample_credential()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("token.json")]);
    }
}
