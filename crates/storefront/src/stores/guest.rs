//! Guest-local persistence over the visitor session.
//!
//! While a visitor is unauthenticated, their cart and wishlist live as
//! serialized JSON arrays in the session record, one fixed key per store
//! kind. The vault is strictly last-write-wins: every guest mutation writes
//! the full list. Once the visitor signs in the vault stops being written -
//! it becomes a migration source until the merge clears it.
//!
//! Reads are forgiving: an absent or malformed record is an empty list. The
//! parse failure is logged for diagnostics and never reaches the caller.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tower_sessions::Session;

/// Session key for the guest cart record.
pub const CART_KEY: &str = "guest_cart";

/// Session key for the guest wishlist record.
pub const WISHLIST_KEY: &str = "guest_wishlist";

/// Session key for the sync epoch counter.
const EPOCH_KEY: &str = "sync_epoch";

/// A guest vault write failed.
#[derive(Debug, Error)]
#[error("guest vault: {0}")]
pub struct VaultError(String);

/// Durable per-visitor storage for guest records and the sync epoch.
///
/// Abstracted behind a trait so store logic can be exercised against an
/// in-memory vault in tests.
pub trait GuestVault {
    /// Read the record under `key`; absent or malformed data is an empty
    /// list.
    fn load<T: DeserializeOwned>(&self, key: &str) -> impl Future<Output = Vec<T>>;

    /// Replace the record under `key` with the full item list.
    fn save<T: Serialize + Sync>(
        &self,
        key: &str,
        items: &[T],
    ) -> impl Future<Output = Result<(), VaultError>>;

    /// Delete the record under `key`.
    fn clear(&self, key: &str) -> impl Future<Output = Result<(), VaultError>>;

    /// Current sync epoch; starts at 0 for a fresh session.
    fn epoch(&self) -> impl Future<Output = u64>;

    /// Advance the sync epoch. Called on every identity transition.
    fn bump_epoch(&self) -> impl Future<Output = Result<u64, VaultError>>;
}

/// Production vault backed by the tower-sessions record.
#[derive(Clone)]
pub struct SessionVault {
    session: Session,
}

impl SessionVault {
    /// Wrap a request's session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl fmt::Debug for SessionVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionVault").finish_non_exhaustive()
    }
}

impl GuestVault for SessionVault {
    async fn load<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        match self.session.get::<Vec<T>>(key).await {
            Ok(Some(items)) => items,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Malformed guest record, treating as empty");
                Vec::new()
            }
        }
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, items: &[T]) -> Result<(), VaultError> {
        self.session
            .insert(key, items)
            .await
            .map_err(|e| VaultError(e.to_string()))
    }

    async fn clear(&self, key: &str) -> Result<(), VaultError> {
        self.session
            .remove::<serde_json::Value>(key)
            .await
            .map(|_| ())
            .map_err(|e| VaultError(e.to_string()))
    }

    async fn epoch(&self) -> u64 {
        self.session
            .get::<u64>(EPOCH_KEY)
            .await
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    async fn bump_epoch(&self) -> Result<u64, VaultError> {
        let next = self.epoch().await + 1;
        self.session
            .insert(EPOCH_KEY, next)
            .await
            .map_err(|e| VaultError(e.to_string()))?;
        Ok(next)
    }
}
