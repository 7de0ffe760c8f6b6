//! # Credential lifecycle
//!
//! Everything needed to turn "a user at a terminal" into a valid bearer
//! credential for the Drive API:
//!
//! - [`Credential`] — token material, expiry, scopes
//! - [`CredentialStore`] — versioned JSON file persistence with atomic writes
//! - [`OAuthClient`] — authorization URL (PKCE), code exchange, token refresh
//! - [`ConsentListener`] / [`LoopbackListener`] — the scoped local callback
//!   the interactive handshake redirects to
//! - [`AuthFlow`] — the state machine tying it together; [`AuthFlow::obtain`]
//!   is the one public operation

pub mod config;
pub mod error;
pub mod flow;
pub mod listener;
pub mod oauth;
pub mod store;
pub mod types;

pub use config::{ClientSecrets, DEFAULT_CLIENT_SECRET_PATH};
pub use error::{AuthError, ConfigError, Result};
pub use flow::{AuthFlow, FlowState, DEFAULT_CONSENT_TIMEOUT};
pub use listener::{ConsentListener, ConsentReply, LoopbackListener};
pub use oauth::{OAuthClient, PkceVerifier, TokenGrant};
pub use store::{CredentialStore, DEFAULT_STORE_PATH, STORE_VERSION};
pub use types::Credential;
