//! HTTP transport boundary
//!
//! Every crate that talks to the network goes through the [`HttpClient`]
//! trait defined here, so the OAuth flow and the Drive client can be tested
//! against a mock transport. The production implementation is
//! [`ReqwestHttpClient`].
//!
//! Requests are executed exactly once: a failed call surfaces to the caller
//! rather than being retried internally.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpClient, ReqwestHttpClient};
pub use error::{HttpError, Result};
pub use types::{HttpMethod, HttpRequest, HttpResponse};
