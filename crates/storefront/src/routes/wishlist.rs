//! Wishlist route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use saltfern_core::{ProductId, WishlistEntry};

use crate::commerce::CommerceClient;
use crate::commerce::types::CustomerToken;
use crate::error::Result;
use crate::middleware::OptionalCustomer;
use crate::state::AppState;
use crate::stores::{Mutation, Notice, SessionVault, WishlistStore, WishlistView};

/// Build the request-scoped wishlist store.
fn store(
    state: &AppState,
    session: Session,
    identity: Option<CustomerToken>,
) -> WishlistStore<CommerceClient, SessionVault> {
    WishlistStore::new(
        state.commerce().clone(),
        SessionVault::new(session),
        identity,
    )
}

/// Remove from wishlist request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromWishlistBody {
    pub product_id: ProductId,
}

/// Mutation response; an absent wishlist means nothing changed.
#[derive(Debug, Serialize)]
pub struct WishlistResponse {
    pub wishlist: Option<WishlistView>,
    pub notice: Option<Notice>,
}

impl From<Mutation<WishlistView>> for WishlistResponse {
    fn from(mutation: Mutation<WishlistView>) -> Self {
        Self {
            wishlist: mutation.view,
            notice: mutation.notice,
        }
    }
}

/// Current wishlist.
#[instrument(skip(state, session, identity))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
) -> Result<Json<WishlistView>> {
    let wishlist = store(&state, session, identity).view().await?;
    Ok(Json(wishlist))
}

/// Save a product to the wishlist.
///
/// The body is the product snapshot to save; saving an already-present
/// product is a no-op with an "already present" notice.
#[instrument(skip(state, session, identity, entry))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
    Json(entry): Json<WishlistEntry>,
) -> Result<Json<WishlistResponse>> {
    let mutation = store(&state, session, identity).add(entry).await?;
    Ok(Json(mutation.into()))
}

/// Remove a product from the wishlist.
#[instrument(skip(state, session, identity))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
    Json(body): Json<RemoveFromWishlistBody>,
) -> Result<Json<WishlistResponse>> {
    let mutation = store(&state, session, identity)
        .remove(body.product_id)
        .await?;
    Ok(Json(mutation.into()))
}
