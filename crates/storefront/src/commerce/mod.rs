//! Commerce backend API client.
//!
//! # Architecture
//!
//! - Plain JSON REST over `reqwest`; the backend is source of truth - no
//!   local sync, direct API calls
//! - In-memory caching via `moka` for catalog responses (5 minute TTL);
//!   cart and wishlist state is never cached
//! - Customer-scoped endpoints require the bearer token obtained from
//!   `login`; the storefront API key is sent on every request
//!
//! # Error contract
//!
//! Two backend responses are semantically meaningful to callers and get
//! dedicated variants instead of the generic [`CommerceError::Api`]:
//!
//! - `401` becomes [`CommerceError::Unauthorized`], so callers can react by
//!   clearing local session state (the client never clears it itself)
//! - `409` becomes [`CommerceError::AlreadyPresent`], so a batch caller can
//!   treat an entry that already exists remotely as benign instead of
//!   aborting

mod client;
pub mod types;

pub use client::CommerceClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with the commerce backend.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Bearer credential missing, invalid, or expired.
    #[error("Unauthorized")]
    Unauthorized,

    /// The entry already exists in the remote collection.
    #[error("Already present")]
    AlreadyPresent,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),
}
