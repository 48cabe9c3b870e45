//! Cart store: mutation routing, the sign-in merge, and derived totals.
//!
//! One store instance exists per request, wired with the visitor's session
//! vault and identity. Mutations route down exactly one of two paths (guest
//! or remote) based on that identity; see the module docs on
//! [`crate::stores`] for the protocol.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use saltfern_core::{CartLine, LineId, Price, ProductId, RemoteLineId, VariantKey};

use crate::commerce::types::{CreateCartLine, CustomerToken};
use crate::commerce::{CommerceClient, CommerceError};
use crate::config::ShippingConfig;
use crate::error::AppError;
use crate::stores::guest::{CART_KEY, GuestVault};
use crate::stores::{MergeOutcome, Mutation, Notice};

/// Remote cart operations consumed by the store.
///
/// Implemented by [`CommerceClient`]; tests substitute an in-memory remote.
pub trait RemoteCart {
    /// Fetch the full remote cart.
    fn fetch(
        &self,
        token: &CustomerToken,
    ) -> impl Future<Output = Result<Vec<CartLine>, CommerceError>>;

    /// Create/attach a line. The backend upserts on the variant key.
    fn create_line(
        &self,
        token: &CustomerToken,
        line: &CreateCartLine,
    ) -> impl Future<Output = Result<(), CommerceError>>;

    /// Set a line's quantity.
    fn set_quantity(
        &self,
        token: &CustomerToken,
        line_id: RemoteLineId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), CommerceError>>;

    /// Delete a line.
    fn delete_line(
        &self,
        token: &CustomerToken,
        line_id: RemoteLineId,
    ) -> impl Future<Output = Result<(), CommerceError>>;

    /// Delete every line.
    fn clear(&self, token: &CustomerToken) -> impl Future<Output = Result<(), CommerceError>>;
}

impl RemoteCart for CommerceClient {
    async fn fetch(&self, token: &CustomerToken) -> Result<Vec<CartLine>, CommerceError> {
        self.get_cart(token).await
    }

    async fn create_line(
        &self,
        token: &CustomerToken,
        line: &CreateCartLine,
    ) -> Result<(), CommerceError> {
        self.add_cart_line(token, line).await
    }

    async fn set_quantity(
        &self,
        token: &CustomerToken,
        line_id: RemoteLineId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        self.update_cart_line(token, line_id, quantity).await
    }

    async fn delete_line(
        &self,
        token: &CustomerToken,
        line_id: RemoteLineId,
    ) -> Result<(), CommerceError> {
        self.remove_cart_line(token, line_id).await
    }

    async fn clear(&self, token: &CustomerToken) -> Result<(), CommerceError> {
        self.clear_cart(token).await
    }
}

// =============================================================================
// Views
// =============================================================================

/// The cart as surfaced to the client, with totals derived fresh from the
/// lines on every assembly - aggregates are never cached across a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    /// Current lines, guest-local or remote depending on identity.
    pub lines: Vec<CartLine>,
    /// Sum of quantities across all lines (not the line count).
    pub count: u32,
    /// Sum of unit price times quantity, in minor units.
    pub subtotal: Price,
    /// Shipping estimate; zero at or above the free-shipping threshold.
    pub shipping: Price,
}

impl CartView {
    fn assemble(lines: Vec<CartLine>, shipping: ShippingConfig) -> Self {
        let count = lines.iter().map(|l| l.quantity).sum();
        let subtotal: Price = lines.iter().map(CartLine::line_total).sum();
        let shipping = if lines.is_empty() || subtotal >= shipping.free_threshold {
            Price::ZERO
        } else {
            shipping.flat_rate
        };

        Self {
            lines,
            count,
            subtotal,
            shipping,
        }
    }
}

/// Product snapshot supplied by the caller of `add_item`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItemDraft {
    /// Product reference.
    pub product: ProductId,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Unit price in minor units.
    pub unit_price: Price,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Size label.
    #[serde(default)]
    pub size: Option<String>,
    /// Color label.
    #[serde(default)]
    pub color: Option<String>,
}

impl CartItemDraft {
    fn variant_key(&self) -> VariantKey {
        VariantKey {
            product: self.product,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    fn to_create(&self, quantity: u32) -> CreateCartLine {
        CreateCartLine {
            product_id: self.product,
            size: self.size.clone(),
            color: self.color.clone(),
            quantity,
        }
    }

    fn into_line(self, quantity: u32) -> CartLine {
        CartLine {
            id: LineId::local(),
            product: self.product,
            name: self.name,
            slug: self.slug,
            unit_price: self.unit_price,
            image: self.image,
            size: self.size,
            color: self.color,
            quantity,
        }
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Cart store for one request: routes mutations by session identity.
pub struct CartStore<R, V> {
    remote: R,
    vault: V,
    identity: Option<CustomerToken>,
    shipping: ShippingConfig,
}

impl<R: RemoteCart, V: GuestVault> CartStore<R, V> {
    /// Create a store wired to the request's identity and vault.
    pub const fn new(
        remote: R,
        vault: V,
        identity: Option<CustomerToken>,
        shipping: ShippingConfig,
    ) -> Self {
        Self {
            remote,
            vault,
            identity,
            shipping,
        }
    }

    /// Current cart: the guest record, or a fresh remote fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote fetch fails.
    pub async fn view(&self) -> Result<CartView, AppError> {
        let lines = match &self.identity {
            Some(token) => self.fetch_remote(token).await?,
            None => self.vault.load::<CartLine>(CART_KEY).await,
        };
        Ok(CartView::assemble(lines, self.shipping))
    }

    /// Add an item, merging into an existing line on the (product, size,
    /// color) key. `quantity` below 1 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns an error on an unauthorized remote response or a vault write
    /// failure. Other remote failures are reported as a [`Notice::Failed`]
    /// with the collection untouched.
    pub async fn add_item(
        &self,
        item: CartItemDraft,
        quantity: u32,
    ) -> Result<Mutation<CartView>, AppError> {
        let quantity = quantity.max(1);

        let Some(token) = &self.identity else {
            return self.add_item_guest(item, quantity).await;
        };

        let name = item.name.clone();
        match self.remote.create_line(token, &item.to_create(quantity)).await {
            // The backend upserts on the variant key, so "already present"
            // is success from the caller's point of view.
            Ok(()) | Err(CommerceError::AlreadyPresent) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: Some(Notice::Added { name }),
            }),
            Err(CommerceError::Unauthorized) => Err(CommerceError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "Failed to add cart line");
                Ok(Mutation {
                    view: None,
                    notice: Some(Notice::Failed {
                        action: "add to cart",
                    }),
                })
            }
        }
    }

    async fn add_item_guest(
        &self,
        item: CartItemDraft,
        quantity: u32,
    ) -> Result<Mutation<CartView>, AppError> {
        let mut lines = self.vault.load::<CartLine>(CART_KEY).await;
        let key = item.variant_key();

        let notice = if let Some(line) = lines.iter_mut().find(|l| l.variant_key() == key) {
            line.quantity = line.quantity.saturating_add(quantity);
            Notice::Updated {
                name: item.name.clone(),
            }
        } else {
            let name = item.name.clone();
            lines.push(item.into_line(quantity));
            Notice::Added { name }
        };

        self.vault.save(CART_KEY, &lines).await?;
        Ok(Mutation {
            view: Some(CartView::assemble(lines, self.shipping)),
            notice: Some(notice),
        })
    }

    /// Set a line's quantity. A requested quantity below 1 is a silent
    /// no-op on both paths - no state change, no remote call.
    ///
    /// # Errors
    ///
    /// Returns an error on an unauthorized remote response or a vault write
    /// failure.
    pub async fn update_quantity(
        &self,
        id: LineId,
        quantity: u32,
    ) -> Result<Mutation<CartView>, AppError> {
        if quantity < 1 {
            debug!(line = %id, "Ignoring quantity update below 1");
            return Ok(Mutation::silent());
        }

        let Some(token) = &self.identity else {
            let mut lines = self.vault.load::<CartLine>(CART_KEY).await;
            if let Some(line) = lines.iter_mut().find(|l| l.id == id) {
                line.quantity = quantity;
            }
            self.vault.save(CART_KEY, &lines).await?;
            return Ok(Mutation {
                view: Some(CartView::assemble(lines, self.shipping)),
                notice: None,
            });
        };

        // A local id while authenticated is a stale reference from before
        // the merge; the re-fetched view the client already received has the
        // remote ids.
        let Some(remote_id) = id.as_remote() else {
            debug!(line = %id, "Ignoring update for pre-migration line id");
            return Ok(Mutation::silent());
        };

        match self.remote.set_quantity(token, remote_id, quantity).await {
            Ok(()) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: None,
            }),
            Err(CommerceError::Unauthorized) => Err(CommerceError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "Failed to update cart line");
                Ok(Mutation {
                    view: None,
                    notice: Some(Notice::Failed {
                        action: "update cart",
                    }),
                })
            }
        }
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error on an unauthorized remote response or a vault write
    /// failure.
    pub async fn remove_item(&self, id: LineId) -> Result<Mutation<CartView>, AppError> {
        let Some(token) = &self.identity else {
            let mut lines = self.vault.load::<CartLine>(CART_KEY).await;
            lines.retain(|l| l.id != id);
            self.vault.save(CART_KEY, &lines).await?;
            return Ok(Mutation {
                view: Some(CartView::assemble(lines, self.shipping)),
                notice: None,
            });
        };

        let Some(remote_id) = id.as_remote() else {
            debug!(line = %id, "Ignoring removal of pre-migration line id");
            return Ok(Mutation::silent());
        };

        match self.remote.delete_line(token, remote_id).await {
            Ok(()) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: None,
            }),
            Err(CommerceError::Unauthorized) => Err(CommerceError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "Failed to remove cart line");
                Ok(Mutation {
                    view: None,
                    notice: Some(Notice::Failed {
                        action: "remove from cart",
                    }),
                })
            }
        }
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error on an unauthorized remote response or a vault write
    /// failure.
    pub async fn clear(&self) -> Result<Mutation<CartView>, AppError> {
        let Some(token) = &self.identity else {
            self.vault.clear(CART_KEY).await?;
            return Ok(Mutation {
                view: Some(CartView::assemble(Vec::new(), self.shipping)),
                notice: None,
            });
        };

        match self.remote.clear(token).await {
            Ok(()) => Ok(Mutation {
                view: Some(self.view_remote(token).await?),
                notice: None,
            }),
            Err(CommerceError::Unauthorized) => Err(CommerceError::Unauthorized.into()),
            Err(e) => {
                warn!(error = %e, "Failed to clear cart");
                Ok(Mutation {
                    view: None,
                    notice: Some(Notice::Failed {
                        action: "clear cart",
                    }),
                })
            }
        }
    }

    /// Migrate guest lines to the remote cart. Runs on the guest →
    /// authenticated transition; a duplicate trigger finds the record
    /// already cleared and is a no-op.
    ///
    /// Entries are independent, so the creates are dispatched concurrently
    /// and the backend deduplicates. A per-entry failure never aborts the
    /// batch and never surfaces to the user.
    ///
    /// # Errors
    ///
    /// Returns an error only if clearing the guest record fails.
    pub async fn merge_guest_lines(&self) -> Result<MergeOutcome, AppError> {
        let Some(token) = &self.identity else {
            return Ok(MergeOutcome::default());
        };

        let lines = self.vault.load::<CartLine>(CART_KEY).await;
        if lines.is_empty() {
            return Ok(MergeOutcome::default());
        }

        let payloads: Vec<CreateCartLine> = lines.iter().map(CreateCartLine::from).collect();
        let results = join_all(
            payloads
                .iter()
                .map(|payload| self.remote.create_line(token, payload)),
        )
        .await;

        let mut outcome = MergeOutcome {
            attempted: lines.len(),
            ..MergeOutcome::default()
        };
        for (line, result) in lines.iter().zip(results) {
            match result {
                Ok(()) => outcome.migrated += 1,
                Err(e) => {
                    outcome.skipped += 1;
                    debug!(product = %line.product, error = %e, "Skipping cart line during migration");
                }
            }
        }

        // One-shot: the guest record is deleted regardless of per-entry
        // outcomes, which is what makes a second trigger a safe no-op.
        self.vault.clear(CART_KEY).await?;

        Ok(outcome)
    }

    async fn view_remote(&self, token: &CustomerToken) -> Result<CartView, AppError> {
        Ok(CartView::assemble(
            self.fetch_remote(token).await?,
            self.shipping,
        ))
    }

    /// Fetch the remote cart, discarding a result whose sync epoch went
    /// stale while the request was in flight.
    async fn fetch_remote(&self, token: &CustomerToken) -> Result<Vec<CartLine>, AppError> {
        for _ in 0..2 {
            let epoch = self.vault.epoch().await;
            let lines = self.remote.fetch(token).await?;
            if self.vault.epoch().await == epoch {
                return Ok(lines);
            }
            debug!("Discarding cart fetch from stale sync epoch");
        }

        Err(AppError::Internal(
            "session identity kept changing during cart fetch".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    use super::*;
    use crate::stores::guest::testing::MemoryVault;

    // =========================================================================
    // Mock remote
    // =========================================================================

    #[derive(Default)]
    struct MockRemoteInner {
        lines: Mutex<Vec<CartLine>>,
        next_id: AtomicI64,
        create_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
        mutation_calls: AtomicUsize,
        fail_mutations: AtomicBool,
        fail_products: Mutex<HashSet<i64>>,
        // When set, the first fetch bumps this vault's epoch, simulating a
        // login finishing underneath an in-flight request.
        bump_on_first_fetch: Mutex<Option<MemoryVault>>,
    }

    #[derive(Default)]
    struct MockRemote(std::sync::Arc<MockRemoteInner>);

    impl MockRemote {
        fn snapshot(&self) -> Vec<CartLine> {
            self.0.lines.lock().unwrap().clone()
        }

        fn seed(&self, lines: Vec<CartLine>) {
            *self.0.lines.lock().unwrap() = lines;
        }

        fn fail_product(&self, product: i64) {
            self.0.fail_products.lock().unwrap().insert(product);
        }

        fn remote_error() -> CommerceError {
            CommerceError::Api {
                status: 500,
                message: "backend unavailable".to_string(),
            }
        }
    }

    impl RemoteCart for &MockRemote {
        async fn fetch(&self, _token: &CustomerToken) -> Result<Vec<CartLine>, CommerceError> {
            self.0.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(vault) = self.0.bump_on_first_fetch.lock().unwrap().take() {
                vault.bump_epoch_now();
            }
            Ok(self.snapshot())
        }

        async fn create_line(
            &self,
            _token: &CustomerToken,
            line: &CreateCartLine,
        ) -> Result<(), CommerceError> {
            self.0.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_mutations.load(Ordering::SeqCst) {
                return Err(MockRemote::remote_error());
            }
            if self
                .0
                .fail_products
                .lock()
                .unwrap()
                .contains(&line.product_id.as_i64())
            {
                return Err(CommerceError::AlreadyPresent);
            }

            let mut lines = self.0.lines.lock().unwrap();
            let existing = lines.iter_mut().find(|l| {
                l.product == line.product_id && l.size == line.size && l.color == line.color
            });
            match existing {
                Some(l) => l.quantity += line.quantity,
                None => {
                    let id = self.0.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                    lines.push(CartLine {
                        id: LineId::Remote(RemoteLineId::new(id)),
                        product: line.product_id,
                        name: format!("product-{}", line.product_id),
                        slug: format!("product-{}", line.product_id),
                        unit_price: Price::new(100_000),
                        image: None,
                        size: line.size.clone(),
                        color: line.color.clone(),
                        quantity: line.quantity,
                    });
                }
            }
            Ok(())
        }

        async fn set_quantity(
            &self,
            _token: &CustomerToken,
            line_id: RemoteLineId,
            quantity: u32,
        ) -> Result<(), CommerceError> {
            self.0.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_mutations.load(Ordering::SeqCst) {
                return Err(MockRemote::remote_error());
            }
            let mut lines = self.0.lines.lock().unwrap();
            if let Some(l) = lines.iter_mut().find(|l| l.id == LineId::Remote(line_id)) {
                l.quantity = quantity;
            }
            Ok(())
        }

        async fn delete_line(
            &self,
            _token: &CustomerToken,
            line_id: RemoteLineId,
        ) -> Result<(), CommerceError> {
            self.0.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_mutations.load(Ordering::SeqCst) {
                return Err(MockRemote::remote_error());
            }
            self.0
                .lines
                .lock()
                .unwrap()
                .retain(|l| l.id != LineId::Remote(line_id));
            Ok(())
        }

        async fn clear(&self, _token: &CustomerToken) -> Result<(), CommerceError> {
            self.0.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_mutations.load(Ordering::SeqCst) {
                return Err(MockRemote::remote_error());
            }
            self.0.lines.lock().unwrap().clear();
            Ok(())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn token() -> CustomerToken {
        CustomerToken {
            access_token: "test-token".to_string(),
            expires_in: None,
            obtained_at: 0,
        }
    }

    fn shipping() -> ShippingConfig {
        ShippingConfig {
            free_threshold: Price::new(500_000),
            flat_rate: Price::new(45_000),
        }
    }

    fn draft(product: i64, price: i64, size: Option<&str>, color: Option<&str>) -> CartItemDraft {
        CartItemDraft {
            product: ProductId::new(product),
            name: format!("product-{product}"),
            slug: format!("product-{product}"),
            unit_price: Price::new(price),
            image: None,
            size: size.map(String::from),
            color: color.map(String::from),
        }
    }

    fn guest_store<'a>(
        remote: &'a MockRemote,
        vault: &MemoryVault,
    ) -> CartStore<&'a MockRemote, MemoryVault> {
        CartStore::new(remote, vault.clone(), None, shipping())
    }

    fn customer_store<'a>(
        remote: &'a MockRemote,
        vault: &MemoryVault,
    ) -> CartStore<&'a MockRemote, MemoryVault> {
        CartStore::new(remote, vault.clone(), Some(token()), shipping())
    }

    // =========================================================================
    // Guest path
    // =========================================================================

    #[tokio::test]
    async fn guest_add_same_variant_increments_one_line() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        let first = store
            .add_item(draft(1, 120_000, Some("M"), Some("Red")), 1)
            .await
            .unwrap();
        assert_eq!(
            first.notice,
            Some(Notice::Added {
                name: "product-1".to_string()
            })
        );

        let second = store
            .add_item(draft(1, 120_000, Some("M"), Some("Red")), 1)
            .await
            .unwrap();
        assert_eq!(
            second.notice,
            Some(Notice::Updated {
                name: "product-1".to_string()
            })
        );

        let view = second.view.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines.first().unwrap().quantity, 2);
        assert_eq!(view.count, 2);
        assert_eq!(view.subtotal, Price::new(240_000));
    }

    #[tokio::test]
    async fn guest_add_distinct_variants_appends_lines() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        store
            .add_item(draft(1, 120_000, Some("M"), Some("Red")), 1)
            .await
            .unwrap();
        store
            .add_item(draft(1, 120_000, Some("L"), Some("Red")), 1)
            .await
            .unwrap();
        let view = store
            .add_item(draft(2, 80_000, None, None), 1)
            .await
            .unwrap()
            .view
            .unwrap();

        assert_eq!(view.lines.len(), 3);
        assert_eq!(view.count, 3);
        assert_eq!(view.subtotal, Price::new(320_000));
    }

    #[tokio::test]
    async fn add_item_takes_explicit_quantity() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        let view = store
            .add_item(draft(1, 50_000, None, None), 3)
            .await
            .unwrap()
            .view
            .unwrap();

        assert_eq!(view.lines.first().unwrap().quantity, 3);
        assert_eq!(view.subtotal, Price::new(150_000));
    }

    #[tokio::test]
    async fn guest_mutations_persist_across_store_instances() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        guest_store(&remote, &vault)
            .add_item(draft(1, 50_000, None, None), 2)
            .await
            .unwrap();

        // A fresh store over the same vault sees the saved record.
        let view = guest_store(&remote, &vault).view().await.unwrap();
        assert_eq!(view.count, 2);
    }

    #[tokio::test]
    async fn quantity_below_one_is_silent_noop() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        let added = store
            .add_item(draft(1, 50_000, None, None), 1)
            .await
            .unwrap();
        let line_id = added.view.unwrap().lines.first().unwrap().id;

        let result = store.update_quantity(line_id, 0).await.unwrap();
        assert!(result.view.is_none());
        assert!(result.notice.is_none());

        let view = store.view().await.unwrap();
        assert_eq!(view.lines.first().unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn quantity_below_one_never_calls_remote() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = customer_store(&remote, &vault);

        let result = store
            .update_quantity(LineId::Remote(RemoteLineId::new(1)), 0)
            .await
            .unwrap();

        assert!(result.view.is_none());
        assert_eq!(remote.0.mutation_calls.load(Ordering::SeqCst), 0);
        assert_eq!(remote.0.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn guest_remove_and_clear() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        let view = store
            .add_item(draft(1, 50_000, None, None), 1)
            .await
            .unwrap()
            .view
            .unwrap();
        let id = view.lines.first().unwrap().id;

        let after_remove = store.remove_item(id).await.unwrap().view.unwrap();
        assert!(after_remove.lines.is_empty());

        store
            .add_item(draft(2, 50_000, None, None), 1)
            .await
            .unwrap();
        let after_clear = store.clear().await.unwrap().view.unwrap();
        assert!(after_clear.lines.is_empty());
        assert_eq!(after_clear.count, 0);
        assert_eq!(after_clear.subtotal, Price::ZERO);
    }

    // =========================================================================
    // Authenticated path
    // =========================================================================

    #[tokio::test]
    async fn authenticated_mutations_never_write_the_vault() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = customer_store(&remote, &vault);

        let view = store
            .add_item(draft(1, 100_000, Some("M"), None), 1)
            .await
            .unwrap()
            .view
            .unwrap();

        assert_eq!(view.lines.len(), 1);
        assert!(matches!(
            view.lines.first().unwrap().id,
            LineId::Remote(_)
        ));
        assert_eq!(vault.writes(CART_KEY), 0);
    }

    #[tokio::test]
    async fn authenticated_view_reflects_remote_wholesale() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        remote.seed(vec![CartLine {
            id: LineId::Remote(RemoteLineId::new(9)),
            product: ProductId::new(4),
            name: "Canvas Tote".to_string(),
            slug: "canvas-tote".to_string(),
            unit_price: Price::new(260_000),
            image: None,
            size: None,
            color: None,
            quantity: 2,
        }]);

        let view = customer_store(&remote, &vault).view().await.unwrap();
        assert_eq!(view.count, 2);
        assert_eq!(view.subtotal, Price::new(520_000));
        assert_eq!(view.shipping, Price::ZERO);
    }

    #[tokio::test]
    async fn remote_failure_leaves_collection_untouched() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        let store = customer_store(&remote, &vault);
        let view = store
            .add_item(draft(1, 100_000, None, None), 1)
            .await
            .unwrap()
            .view
            .unwrap();
        let id = view.lines.first().unwrap().id;
        let before = remote.snapshot();

        remote.0.fail_mutations.store(true, Ordering::SeqCst);
        let result = store.remove_item(id).await.unwrap();

        assert!(result.view.is_none());
        assert_eq!(
            result.notice,
            Some(Notice::Failed {
                action: "remove from cart"
            })
        );
        assert_eq!(remote.snapshot(), before);
    }

    #[tokio::test]
    async fn unauthorized_propagates_distinctly() {
        struct UnauthorizedRemote;
        impl RemoteCart for &UnauthorizedRemote {
            async fn fetch(&self, _: &CustomerToken) -> Result<Vec<CartLine>, CommerceError> {
                Err(CommerceError::Unauthorized)
            }
            async fn create_line(
                &self,
                _: &CustomerToken,
                _: &CreateCartLine,
            ) -> Result<(), CommerceError> {
                Err(CommerceError::Unauthorized)
            }
            async fn set_quantity(
                &self,
                _: &CustomerToken,
                _: RemoteLineId,
                _: u32,
            ) -> Result<(), CommerceError> {
                Err(CommerceError::Unauthorized)
            }
            async fn delete_line(
                &self,
                _: &CustomerToken,
                _: RemoteLineId,
            ) -> Result<(), CommerceError> {
                Err(CommerceError::Unauthorized)
            }
            async fn clear(&self, _: &CustomerToken) -> Result<(), CommerceError> {
                Err(CommerceError::Unauthorized)
            }
        }

        let remote = UnauthorizedRemote;
        let vault = MemoryVault::default();
        let store = CartStore::new(&remote, vault, Some(token()), shipping());

        let err = store
            .add_item(draft(1, 100_000, None, None), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Commerce(CommerceError::Unauthorized)
        ));
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[tokio::test]
    async fn merge_migrates_guest_lines_then_clears_record() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        let guest = guest_store(&remote, &vault);
        guest
            .add_item(draft(1, 120_000, Some("M"), None), 1)
            .await
            .unwrap();
        guest
            .add_item(draft(2, 80_000, None, None), 2)
            .await
            .unwrap();

        let store = customer_store(&remote, &vault);
        let outcome = store.merge_guest_lines().await.unwrap();

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.migrated, 2);
        assert_eq!(remote.0.create_calls.load(Ordering::SeqCst), 2);

        // Guest record is gone; the view is the remote state, not a union.
        let leftover: Vec<CartLine> = vault.load(CART_KEY).await;
        assert!(leftover.is_empty());
        let view = store.view().await.unwrap();
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.count, 3);
    }

    #[tokio::test]
    async fn merge_with_empty_record_is_noop() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = customer_store(&remote, &vault);

        let outcome = store.merge_guest_lines().await.unwrap();
        assert!(!outcome.merged_any());
        assert_eq!(remote.0.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn merge_triggered_twice_is_idempotent() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        guest_store(&remote, &vault)
            .add_item(draft(1, 120_000, None, None), 1)
            .await
            .unwrap();

        let store = customer_store(&remote, &vault);
        store.merge_guest_lines().await.unwrap();
        let calls_after_first = remote.0.create_calls.load(Ordering::SeqCst);
        let remote_after_first = remote.snapshot();

        // A duplicate identity-transition event re-runs the merge; the
        // record is already cleared, so nothing happens.
        let second = store.merge_guest_lines().await.unwrap();
        assert!(!second.merged_any());
        assert_eq!(remote.0.create_calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(remote.snapshot(), remote_after_first);
    }

    #[tokio::test]
    async fn merge_tolerates_per_entry_failure() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        let guest = guest_store(&remote, &vault);
        guest
            .add_item(draft(1, 120_000, None, None), 1)
            .await
            .unwrap();
        guest
            .add_item(draft(2, 80_000, None, None), 1)
            .await
            .unwrap();
        remote.fail_product(2);

        let store = customer_store(&remote, &vault);
        let outcome = store.merge_guest_lines().await.unwrap();

        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.migrated, 1);
        assert_eq!(outcome.skipped, 1);

        // The batch still completed and the record is still gone.
        let leftover: Vec<CartLine> = vault.load(CART_KEY).await;
        assert!(leftover.is_empty());
    }

    // =========================================================================
    // Epoch guard
    // =========================================================================

    #[tokio::test]
    async fn stale_epoch_fetch_is_discarded_and_retried() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();

        // First fetch resolves after an identity transition bumped the
        // epoch; its result must be thrown away and the fetch re-issued.
        *remote.0.bump_on_first_fetch.lock().unwrap() = Some(vault.clone());

        let store = customer_store(&remote, &vault);
        let view = store.view().await.unwrap();

        assert!(view.lines.is_empty());
        assert_eq!(remote.0.fetch_calls.load(Ordering::SeqCst), 2);
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    #[tokio::test]
    async fn aggregates_recompute_on_every_read() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        let view = store
            .add_item(draft(1, 10_000, None, None), 2)
            .await
            .unwrap()
            .view
            .unwrap();
        assert_eq!((view.count, view.subtotal), (2, Price::new(20_000)));

        let view = store
            .add_item(draft(2, 5_000, None, None), 3)
            .await
            .unwrap()
            .view
            .unwrap();
        assert_eq!((view.count, view.subtotal), (5, Price::new(35_000)));

        let id = view.lines.first().unwrap().id;
        let view = store.update_quantity(id, 1).await.unwrap().view.unwrap();
        assert_eq!((view.count, view.subtotal), (4, Price::new(25_000)));
    }

    #[tokio::test]
    async fn shipping_threshold_is_inclusive() {
        let remote = MockRemote::default();
        let vault = MemoryVault::default();
        let store = guest_store(&remote, &vault);

        // 490,000 subtotal: below the 500,000 threshold, flat rate applies.
        let view = store
            .add_item(draft(1, 490_000, None, None), 1)
            .await
            .unwrap()
            .view
            .unwrap();
        assert_eq!(view.subtotal, Price::new(490_000));
        assert_eq!(view.shipping, Price::new(45_000));

        // Adding 10,000 lands exactly on the threshold: free shipping.
        let view = store
            .add_item(draft(2, 10_000, None, None), 1)
            .await
            .unwrap()
            .view
            .unwrap();
        assert_eq!(view.subtotal, Price::new(500_000));
        assert_eq!(view.shipping, Price::ZERO);
    }
}
