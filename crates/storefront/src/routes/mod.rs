//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (verifies database)
//!
//! # Products
//! GET  /products               - Product listing
//! GET  /products/{slug}        - Product detail
//!
//! # Cart
//! GET  /cart                   - Current cart with totals
//! POST /cart/add               - Add item (merges on product/size/color)
//! POST /cart/update            - Update line quantity
//! POST /cart/remove            - Remove line
//! POST /cart/clear             - Remove every line
//! GET  /cart/count             - Item count badge value
//!
//! # Wishlist
//! GET  /wishlist               - Current wishlist
//! POST /wishlist/add           - Save a product
//! POST /wishlist/remove        - Remove a product
//!
//! # Auth
//! POST /auth/login             - Sign in; migrates guest cart/wishlist
//! POST /auth/logout            - Sign out; a fresh guest session begins
//! ```

pub mod auth;
pub mod cart;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Login is the merge trigger, and the only brute-forceable surface, so the
/// rate limiter lives here.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/add", post(wishlist::add))
        .route("/remove", post(wishlist::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Wishlist routes
        .nest("/wishlist", wishlist_routes())
        // Auth routes
        .nest("/auth", auth_routes())
}
