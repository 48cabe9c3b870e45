//! Wishlist store: same routing and merge protocol as the cart, without
//! quantities or variants.
//!
//! The uniqueness key is the product identifier alone. A duplicate save is
//! not an error and not an increment - the collection is left unchanged and
//! the caller gets an "already present" notice.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use saltfern_core::{ProductId, WishlistEntry};

use crate::commerce::types::CustomerToken;
use crate::commerce::{CommerceClient, CommerceError};
use crate::error::AppError;
use crate::stores::guest::{GuestVault, WISHLIST_KEY};
use crate::stores::{MergeOutcome, Mutation, Notice};

/// Remote wishlist operations consumed by the store.
///
/// Implemented by [`CommerceClient`]; tests substitute an in-memory remote.
pub trait RemoteWishlist {
    /// Fetch the full remote wishlist.
    fn fetch(
        &self,
        token: &CustomerToken,
    ) -> impl Future<Output = Result<Vec<WishlistEntry>, CommerceError>>;

    /// Save a product. An already-saved product yields
    /// [`CommerceError::AlreadyPresent`].
    fn create_entry(
        &self,
        token: &CustomerToken,
        product: ProductId,
    ) -> impl Future<Output = Result<(), CommerceError>>;

    /// Remove a product.
    fn delete_entry(
        &self,
        token: &CustomerToken,
        product: ProductId,
    ) -> impl Future<Output = Result<(), CommerceError>>;
}

impl RemoteWishlist for CommerceClient {
    async fn fetch(&self, token: &CustomerToken) -> Result<Vec<WishlistEntry>, CommerceError> {
        self.get_wishlist(token).await
    }

    async fn create_entry(
        &self,
        token: &CustomerToken,
        product: ProductId,
    ) -> Result<(), CommerceError> {
        self.add_wishlist_entry(token, product).await
    }

    async fn delete_entry(
        &self,
        token: &CustomerToken,
        product: ProductId,
    ) -> Result<(), CommerceError> {
        self.remove_wishlist_entry(token, product).await
    }
}

/// The wishlist as surfaced to the client.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistView {
    /// Saved entries, guest-local or remote depending on identity.
    pub entries: Vec<WishlistEntry>,
    /// Number of saved products.
    pub count: usize,
}

impl WishlistView {
    fn assemble(entries: Vec<WishlistEntry>) -> Self {
        let count = entries.len();
        Self { entries, count }
    }
}

// =============================================================================
// WishlistStore
// =============================================================================

/// Wishlist store for one request: routes mutations by session identity.
pub struct WishlistStore<R, V> {
    remote: R,
    vault: V,
    identity: Option<CustomerToken>,
}

impl<R: RemoteWishlist, V: GuestVault> WishlistStore<R, V> {
    /// Create a store wired to the request's identity and vault.
    pub const fn new(remote: R, vault: V, identity: Option<CustomerToken>) -> Self {
        Self {
            remote,
            vault,
            identity,
        }
    }

    /// Current wishlist: the guest record, or a fresh remote fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote fetch fails.
    pub async fn view(&self) -> Result<WishlistView, AppError> {
        let entries = match &self.identity {
            Some(token) => self.fetch_remote(token).await?,
            None => self.vault.load::<WishlistEntry>(WISHLIST_KEY).await,
        };
        Ok(WishlistView::assemble(entries))
    }

    /// Save a product. Saving an already-present product leaves the
    /// collection unchanged and produces an "already present" notice.
    ///
    /// # Errors
    ///
    /// Returns an error on an unauthorized remote response or a vault write
    /// failure. Other remote failures are reported as a [`Notice::Failed`]
    /// with the collection untouched.
    pub async fn add(&self, entry: WishlistEntry) -> Result<Mutation<WishlistView>, AppError> {
        let Some(token) = &self.identity else {
            return self.add_guest(entry).await;
        };

        let name = entry.name;
        match self.remote.create_entry(token, entry.product).await {
            Ok(()) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: Some(Notice::Added { name }),
            }),
            Err(CommerceError::AlreadyPresent) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: Some(Notice::AlreadyPresent { name }),
            }),
            Err(CommerceError::Unauthorized) => Err(CommerceError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "Failed to save wishlist entry");
                Ok(Mutation {
                    view: None,
                    notice: Some(Notice::Failed {
                        action: "save to wishlist",
                    }),
                })
            }
        }
    }

    async fn add_guest(&self, entry: WishlistEntry) -> Result<Mutation<WishlistView>, AppError> {
        let mut entries = self.vault.load::<WishlistEntry>(WISHLIST_KEY).await;

        if entries.iter().any(|e| e.product == entry.product) {
            return Ok(Mutation {
                view: Some(WishlistView::assemble(entries)),
                notice: Some(Notice::AlreadyPresent { name: entry.name }),
            });
        }

        let name = entry.name.clone();
        entries.push(entry);
        self.vault.save(WISHLIST_KEY, &entries).await?;
        Ok(Mutation {
            view: Some(WishlistView::assemble(entries)),
            notice: Some(Notice::Added { name }),
        })
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns an error on an unauthorized remote response or a vault write
    /// failure.
    pub async fn remove(&self, product: ProductId) -> Result<Mutation<WishlistView>, AppError> {
        let Some(token) = &self.identity else {
            let mut entries = self.vault.load::<WishlistEntry>(WISHLIST_KEY).await;
            entries.retain(|e| e.product != product);
            self.vault.save(WISHLIST_KEY, &entries).await?;
            return Ok(Mutation {
                view: Some(WishlistView::assemble(entries)),
                notice: None,
            });
        };

        match self.remote.delete_entry(token, product).await {
            Ok(()) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: None,
            }),
            Err(CommerceError::Unauthorized) => Err(CommerceError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "Failed to remove wishlist entry");
                Ok(Mutation {
                    view: None,
                    notice: Some(Notice::Failed {
                        action: "remove from wishlist",
                    }),
                })
            }
        }
    }

    /// Migrate guest entries to the remote wishlist. Same one-shot contract
    /// as the cart merge: concurrent creates, per-entry failures tolerated,
    /// guest record deleted after the batch settles.
    ///
    /// # Errors
    ///
    /// Returns an error only if clearing the guest record fails.
    pub async fn merge_guest_entries(&self) -> Result<MergeOutcome, AppError> {
        let Some(token) = &self.identity else {
            return Ok(MergeOutcome::default());
        };

        let entries = self.vault.load::<WishlistEntry>(WISHLIST_KEY).await;
        if entries.is_empty() {
            return Ok(MergeOutcome::default());
        }

        let results = join_all(
            entries
                .iter()
                .map(|entry| self.remote.create_entry(token, entry.product)),
        )
        .await;

        let mut outcome = MergeOutcome {
            attempted: entries.len(),
            ..MergeOutcome::default()
        };
        for (entry, result) in entries.iter().zip(results) {
            match result {
                Ok(()) => outcome.migrated += 1,
                Err(e) => {
                    outcome.skipped += 1;
                    debug!(product = %entry.product, error = %e, "Skipping wishlist entry during migration");
                }
            }
        }

        self.vault.clear(WISHLIST_KEY).await?;

        Ok(outcome)
    }

    async fn view_remote(&self, token: &CustomerToken) -> Result<WishlistView, AppError> {
        Ok(WishlistView::assemble(self.fetch_remote(token).await?))
    }

    /// Fetch the remote wishlist, discarding a result whose sync epoch went
    /// stale while the request was in flight.
    async fn fetch_remote(&self, token: &CustomerToken) -> Result<Vec<WishlistEntry>, AppError> {
        for _ in 0..2 {
            let epoch = self.vault.epoch().await;
            let entries = self.remote.fetch(token).await?;
            if self.vault.epoch().await == epoch {
                return Ok(entries);
            }
            debug!("Discarding wishlist fetch from stale sync epoch");
        }

        Err(AppError::Internal(
            "session identity kept changing during wishlist fetch".to_string(),
        ))
    }
}
