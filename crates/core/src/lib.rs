//! Saltfern Core - Shared types library.
//!
//! This crate provides common types used across all Saltfern components:
//! - `storefront` - Public-facing storefront service
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices, plus the cart
//!   line and wishlist entry records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
