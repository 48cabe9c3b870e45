//! Cart route handlers.
//!
//! Thin JSON handlers over [`CartStore`]. Each request builds a store wired
//! to the visitor's session vault and identity; the store routes the
//! operation down the guest or remote path.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use saltfern_core::LineId;

use crate::commerce::CommerceClient;
use crate::commerce::types::CustomerToken;
use crate::error::Result;
use crate::middleware::OptionalCustomer;
use crate::state::AppState;
use crate::stores::{CartItemDraft, CartStore, CartView, Mutation, Notice, SessionVault};

/// Build the request-scoped cart store.
fn store(
    state: &AppState,
    session: Session,
    identity: Option<CustomerToken>,
) -> CartStore<CommerceClient, SessionVault> {
    CartStore::new(
        state.commerce().clone(),
        SessionVault::new(session),
        identity,
        state.config().shipping,
    )
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartBody {
    /// Product snapshot for the line.
    #[serde(flatten)]
    pub item: CartItemDraft,
    /// Units to add; defaults to 1.
    pub quantity: Option<u32>,
}

/// Update cart request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartBody {
    pub line_id: LineId,
    pub quantity: u32,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartBody {
    pub line_id: LineId,
}

/// Mutation response: the fresh cart when the mutation took effect, plus an
/// optional notice. An absent cart means the client's current view still
/// stands.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Option<CartView>,
    pub notice: Option<Notice>,
}

impl From<Mutation<CartView>> for CartResponse {
    fn from(mutation: Mutation<CartView>) -> Self {
        Self {
            cart: mutation.view,
            notice: mutation.notice,
        }
    }
}

/// Cart count badge value.
#[derive(Debug, Serialize)]
pub struct CartCountResponse {
    pub count: u32,
}

/// Current cart with totals.
#[instrument(skip(state, session, identity))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
) -> Result<Json<CartView>> {
    let cart = store(&state, session, identity).view().await?;
    Ok(Json(cart))
}

/// Add an item to the cart.
#[instrument(skip(state, session, identity, body))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
    Json(body): Json<AddToCartBody>,
) -> Result<Json<CartResponse>> {
    let mutation = store(&state, session, identity)
        .add_item(body.item, body.quantity.unwrap_or(1))
        .await?;
    Ok(Json(mutation.into()))
}

/// Update a cart line's quantity.
#[instrument(skip(state, session, identity))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
    Json(body): Json<UpdateCartBody>,
) -> Result<Json<CartResponse>> {
    let mutation = store(&state, session, identity)
        .update_quantity(body.line_id, body.quantity)
        .await?;
    Ok(Json(mutation.into()))
}

/// Remove a line from the cart.
#[instrument(skip(state, session, identity))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
    Json(body): Json<RemoveFromCartBody>,
) -> Result<Json<CartResponse>> {
    let mutation = store(&state, session, identity)
        .remove_item(body.line_id)
        .await?;
    Ok(Json(mutation.into()))
}

/// Remove every line from the cart.
#[instrument(skip(state, session, identity))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
) -> Result<Json<CartResponse>> {
    let mutation = store(&state, session, identity).clear().await?;
    Ok(Json(mutation.into()))
}

/// Cart count badge value.
#[instrument(skip(state, session, identity))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalCustomer(identity): OptionalCustomer,
) -> Result<Json<CartCountResponse>> {
    let cart = store(&state, session, identity).view().await?;
    Ok(Json(CartCountResponse { count: cart.count }))
}
