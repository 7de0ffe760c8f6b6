//! Registered-application configuration.
//!
//! The authorization handshake needs the client identifier and secret the
//! application was registered with. These live in a local JSON file in
//! Google's "installed application" layout; unlike the credential store, its
//! absence is a fatal configuration error, not a first-run condition.

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

use crate::error::ConfigError;

/// Default client configuration location, relative to the working directory.
pub const DEFAULT_CLIENT_SECRET_PATH: &str = "client_secret.json";

/// The registered OAuth application.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: ClientSecrets,
}

impl ClientSecrets {
    /// Load from an installed-application client secrets JSON file.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let bytes = std::fs::read(path)
            .map_err(|_| ConfigError::MissingClientConfig(path.to_path_buf()))?;

        let file: ClientSecretsFile = serde_json::from_slice(&bytes)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;

        debug!(path = ?path, client_id = %file.installed.client_id, "client configuration loaded");
        Ok(file.installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_installed_app_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        std::fs::write(
            &path,
            r#"{
                "installed": {
                    "client_id": "id-123.apps.googleusercontent.com",
                    "client_secret": "shhh",
                    "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                    "token_uri": "https://oauth2.googleapis.com/token",
                    "redirect_uris": ["http://localhost"]
                }
            }"#,
        )
        .unwrap();

        let secrets = ClientSecrets::load(&path).unwrap();
        assert_eq!(secrets.client_id, "id-123.apps.googleusercontent.com");
        assert_eq!(secrets.client_secret.as_deref(), Some("shhh"));
        assert!(secrets.token_uri.starts_with("https://"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientSecrets::load(&dir.path().join("client_secret.json"));
        assert!(matches!(result, Err(ConfigError::MissingClientConfig(_))));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        std::fs::write(&path, r#"{"web": {}}"#).unwrap();

        let result = ClientSecrets::load(&path);
        assert!(matches!(result, Err(ConfigError::Malformed(_))));
    }
}
