//! Product route handlers.
//!
//! Read-only proxies over the commerce catalog; responses are cached in the
//! client for five minutes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use crate::commerce::types::Product;
use crate::error::Result;
use crate::state::AppState;

/// Product listing response.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// Product listing.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let products = state.commerce().get_products().await?;
    Ok(Json(ProductsResponse {
        products: (*products).clone(),
    }))
}

/// Product detail by slug.
#[instrument(skip(state), fields(slug = %slug))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let product = state.commerce().get_product_by_slug(&slug).await?;
    Ok(Json(product))
}
