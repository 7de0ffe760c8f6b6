//! # Google Drive provider
//!
//! A thin authenticated handle over the Drive v3 API:
//!
//! - paginated folder listing and an iterative recursive walk
//! - chunked ranged downloads with progress reporting
//! - resumable chunked uploads
//!
//! Every call carries the bearer credential it was constructed with; a 401
//! surfaces as [`TransferError::TokenExpired`], which callers treat as cause
//! to re-enter the auth flow. Nothing is retried internally.

pub mod client;
pub mod error;
pub mod types;

/// OAuth scope covering upload, download, and listing.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

pub use client::{DriveClient, DEFAULT_CHUNK_SIZE};
pub use error::{Result, TransferError};
pub use types::{EntryKind, ListedEntry, RemoteEntry};
