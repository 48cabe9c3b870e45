//! Core types for Saltfern.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod line;
pub mod price;

pub use id::*;
pub use line::{CartLine, VariantKey, WishlistEntry};
pub use price::Price;
