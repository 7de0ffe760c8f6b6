use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authorization was cancelled by the user")]
    UserCancelled,

    #[error("timed out after {0:?} waiting for the consent callback")]
    HandshakeTimeout(Duration),

    #[error("refresh token rejected by the token endpoint: {0}")]
    RefreshRejected(String),

    #[error("credential store I/O failure: {0}")]
    StoreIo(#[source] std::io::Error),

    #[error("token endpoint returned {status}: {message}")]
    TokenEndpoint { status: u16, message: String },

    #[error("network failure during authorization: {0}")]
    Network(String),

    #[error("authorization state mismatch; the callback may have been forged")]
    StateMismatch,

    #[error("malformed consent callback: {0}")]
    InvalidCallback(String),

    #[error("invalid authorization endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("authorization protocol error: {0}")]
    Protocol(String),

    #[error("a credential is required but interactive authorization is disabled")]
    InteractiveRequired,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("client configuration not found at {}", .0.display())]
    MissingClientConfig(PathBuf),

    #[error("malformed client configuration: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
