//! Cart and wishlist stores: guest-local persistence, remote mirroring, and
//! the one-shot merge that runs when a guest signs in.
//!
//! # Protocol
//!
//! Each store kind (cart, wishlist) follows the same shape:
//!
//! - **Guest**: mutations edit the serialized record in the visitor's
//!   session (the guest vault) and nothing touches the backend.
//! - **Authenticated**: every mutation is a remote call followed by a
//!   wholesale re-fetch of the collection. The view is always a direct
//!   reflection of the last successful fetch - no optimistic local patching
//!   that could drift from server-computed state.
//! - **Sign-in**: the merge procedure pushes all guest entries to the
//!   backend concurrently, tolerating per-entry failures, then deletes the
//!   guest record. A duplicate trigger finds the record empty and is a
//!   no-op.
//!
//! Every mutating operation executes exactly one of the two paths, never
//! both. Remote fetches are tagged with the session's sync epoch and
//! discarded if the epoch moved while they were in flight (a login or
//! logout happened underneath them).

pub mod cart;
pub mod guest;
pub mod wishlist;

pub use cart::{CartItemDraft, CartStore, CartView, RemoteCart};
pub use guest::{CART_KEY, GuestVault, SessionVault, VaultError, WISHLIST_KEY};
pub use wishlist::{RemoteWishlist, WishlistStore, WishlistView};

use serde::Serialize;

/// A transient, user-visible notification produced by a store operation.
///
/// Failure notices carry only a general action description - raw error text
/// from the network layer never reaches the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Item was added to the collection.
    Added { name: String },
    /// An existing cart line's quantity was increased instead.
    Updated { name: String },
    /// The product is already saved; nothing changed.
    AlreadyPresent { name: String },
    /// Guest items were moved to the customer's account after sign-in.
    Migrated,
    /// The operation failed; the collection is unchanged.
    Failed { action: &'static str },
}

/// Result of a mutating store operation.
///
/// `view` is the post-mutation collection when the mutation took effect;
/// `None` means nothing changed and the caller's current view still stands
/// (a rejected no-op, or a remote failure that left state untouched).
#[derive(Debug)]
pub struct Mutation<V> {
    /// Fresh view of the collection, if it changed.
    pub view: Option<V>,
    /// Notification to surface, if any.
    pub notice: Option<Notice>,
}

impl<V> Mutation<V> {
    /// A mutation that changed nothing and says nothing.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            view: None,
            notice: None,
        }
    }
}

/// Per-entry tally of a merge run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Guest entries found in the local record.
    pub attempted: usize,
    /// Entries the backend accepted.
    pub migrated: usize,
    /// Entries that failed individually (typically already present remotely).
    pub skipped: usize,
}

impl MergeOutcome {
    /// Whether the run found anything to migrate.
    #[must_use]
    pub const fn merged_any(&self) -> bool {
        self.attempted > 0
    }
}
