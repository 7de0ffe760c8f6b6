//! Error types for Drive transfers.

use thiserror::Error;

/// Errors from listing, downloading, and uploading.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Transport-level failure (connection, timeout, TLS)
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Storage quota or rate limit exhausted
    #[error("storage quota or rate limit exceeded: {message}")]
    QuotaExceeded { message: String },

    /// The remote file or folder does not exist
    #[error("remote file not found: {file_id}")]
    NotFound { file_id: String },

    /// The bearer credential was rejected; re-enter the auth flow
    #[error("access token expired or revoked; run the command again to re-authenticate")]
    TokenExpired,

    /// Any other API-level failure
    #[error("Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered with something we cannot interpret
    #[error("failed to parse API response: {0}")]
    Parse(String),

    /// A resumable upload session ended without a completed file
    #[error("resumable upload did not complete: {0}")]
    UploadIncomplete(String),

    /// Local file I/O failure
    #[error("local I/O failure")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransferError>;
