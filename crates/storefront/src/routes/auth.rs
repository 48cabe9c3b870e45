//! Authentication route handlers.
//!
//! The backend owns credentials; login here just exchanges them for a bearer
//! token and stores it in the session. The login handler is also the merge
//! trigger: the observed guest → authenticated transition runs the one-shot
//! cart and wishlist migrations before the response is assembled, so the
//! client's first authenticated view is already the canonical remote state.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::commerce::CommerceError;
use crate::error::{AppError, Result};
use crate::middleware::{clear_customer_token, set_customer_token};
use crate::state::AppState;
use crate::stores::{
    CartStore, CartView, GuestVault, Notice, SessionVault, WishlistStore, WishlistView,
};

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// Login response: the canonical post-migration collections.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub cart: CartView,
    pub wishlist: WishlistView,
    /// Single migration notice, present only when guest items were moved.
    pub notice: Option<Notice>,
}

/// Logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub authenticated: bool,
}

/// Sign a customer in and migrate their guest items.
///
/// # Route
///
/// `POST /auth/login`
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginBody>,
) -> Result<Json<SessionResponse>> {
    let token = state
        .commerce()
        .login(&body.email, &body.password)
        .await
        .map_err(|e| match e {
            CommerceError::Unauthorized => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            other => AppError::from(other),
        })?;

    set_customer_token(&session, &token).await?;

    let vault = SessionVault::new(session);
    // Any pre-login fetch still in flight now carries a stale epoch and
    // will be discarded instead of overwriting migrated state.
    vault.bump_epoch().await?;

    let cart = CartStore::new(
        state.commerce().clone(),
        vault.clone(),
        Some(token.clone()),
        state.config().shipping,
    );
    let wishlist = WishlistStore::new(state.commerce().clone(), vault, Some(token));

    let cart_outcome = cart.merge_guest_lines().await?;
    let wishlist_outcome = wishlist.merge_guest_entries().await?;

    let migrated_any = cart_outcome.merged_any() || wishlist_outcome.merged_any();
    if migrated_any {
        tracing::info!(
            cart_migrated = cart_outcome.migrated,
            cart_skipped = cart_outcome.skipped,
            wishlist_migrated = wishlist_outcome.migrated,
            wishlist_skipped = wishlist_outcome.skipped,
            "Migrated guest items after sign-in"
        );
    }

    Ok(Json(SessionResponse {
        authenticated: true,
        cart: cart.view().await?,
        wishlist: wishlist.view().await?,
        notice: migrated_any.then_some(Notice::Migrated),
    }))
}

/// Sign the customer out. A fresh guest session begins; the guest records
/// are already empty from the migration.
///
/// # Route
///
/// `POST /auth/logout`
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<LogoutResponse>> {
    clear_customer_token(&session).await?;
    SessionVault::new(session).bump_epoch().await?;

    Ok(Json(LogoutResponse {
        authenticated: false,
    }))
}
