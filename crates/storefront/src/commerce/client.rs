//! Commerce backend REST client implementation.
//!
//! Uses `reqwest` with default headers for the storefront API key and
//! `moka` for catalog caching (5-minute TTL). Cart and wishlist calls are
//! never cached - they are mutable, customer-scoped state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use saltfern_core::{CartLine, ProductId, RemoteLineId, WishlistEntry};

use crate::commerce::CommerceError;
use crate::commerce::types::{
    CartPayload, CreateCartLine, CustomerToken, LoginRequest, LoginResponse, Product,
    ProductsPayload, WishlistPayload,
};
use crate::config::CommerceConfig;

/// Header carrying the storefront API key on every backend request.
const STOREFRONT_KEY_HEADER: &str = "x-storefront-key";

/// Cached catalog responses.
#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Arc<Vec<Product>>),
}

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce backend API.
///
/// Provides access to the product catalog, customer authentication, and the
/// customer's remote cart and wishlist collections.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    http: reqwest::Client,
    config: CommerceConfig,
    catalog_cache: Cache<String, CacheValue>,
}

impl CommerceClient {
    /// Create a new commerce backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &CommerceConfig) -> Result<Self, CommerceError> {
        let mut headers = HeaderMap::new();

        let mut key_value = HeaderValue::from_str(config.storefront_key.expose_secret())
            .map_err(|e| CommerceError::Parse(format!("Invalid storefront key format: {e}")))?;
        key_value.set_sensitive(true);
        headers.insert(STOREFRONT_KEY_HEADER, key_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()?;

        let catalog_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                http,
                config: config.clone(),
                catalog_cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        self.inner.config.endpoint(path)
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Authenticate a customer and obtain a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Unauthorized`] for bad credentials, or
    /// another variant if the request itself fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CustomerToken, CommerceError> {
        let response = self
            .inner
            .http
            .post(self.endpoint("auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let token: LoginResponse = read_json(response, "login").await?;

        Ok(CustomerToken {
            access_token: token.access_token,
            expires_in: token.expires_in,
            obtained_at: Utc::now().timestamp(),
        })
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get the product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Arc<Vec<Product>>, CommerceError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) =
            self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let response = self
            .inner
            .http
            .get(self.endpoint("products"))
            .send()
            .await?;

        let payload: ProductsPayload = read_json(response, "products").await?;
        let products: Arc<Vec<Product>> =
            Arc::new(payload.products.into_iter().map(Product::from).collect());

        self.inner
            .catalog_cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a product by its slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product, CommerceError> {
        let cache_key = format!("product:{slug}");

        if let Some(CacheValue::Product(product)) = self.inner.catalog_cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let response = self
            .inner
            .http
            .get(self.endpoint(&format!("products/{slug}")))
            .send()
            .await?;

        let product: Product =
            read_json::<crate::commerce::types::RemoteProduct>(response, &format!("product {slug}"))
                .await?
                .into();

        self.inner
            .catalog_cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Fetch the customer's full cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &CustomerToken) -> Result<Vec<CartLine>, CommerceError> {
        let response = self
            .inner
            .http
            .get(self.endpoint("cart"))
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let payload: CartPayload = read_json(response, "cart").await?;
        Ok(payload.lines.into_iter().map(CartLine::from).collect())
    }

    /// Create/attach a line in the customer's cart.
    ///
    /// The backend upserts on the (product, size, color) key, so calling
    /// this for an already-present combination is not a hard failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token, line), fields(product = %line.product_id))]
    pub async fn add_cart_line(
        &self,
        token: &CustomerToken,
        line: &CreateCartLine,
    ) -> Result<(), CommerceError> {
        let response = self
            .inner
            .http
            .post(self.endpoint("cart/lines"))
            .bearer_auth(&token.access_token)
            .json(line)
            .send()
            .await?;

        expect_success(response, "cart line").await
    }

    /// Update the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(line_id = %line_id))]
    pub async fn update_cart_line(
        &self,
        token: &CustomerToken,
        line_id: RemoteLineId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        let response = self
            .inner
            .http
            .patch(self.endpoint(&format!("cart/lines/{line_id}")))
            .bearer_auth(&token.access_token)
            .json(&serde_json::json!({ "quantity": quantity }))
            .send()
            .await?;

        expect_success(response, &format!("cart line {line_id}")).await
    }

    /// Remove a line from the customer's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(line_id = %line_id))]
    pub async fn remove_cart_line(
        &self,
        token: &CustomerToken,
        line_id: RemoteLineId,
    ) -> Result<(), CommerceError> {
        let response = self
            .inner
            .http
            .delete(self.endpoint(&format!("cart/lines/{line_id}")))
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        expect_success(response, &format!("cart line {line_id}")).await
    }

    /// Clear the customer's entire cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &CustomerToken) -> Result<(), CommerceError> {
        let response = self
            .inner
            .http
            .delete(self.endpoint("cart"))
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        expect_success(response, "cart").await
    }

    // =========================================================================
    // Wishlist Methods (not cached - mutable state)
    // =========================================================================

    /// Fetch the customer's full wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn get_wishlist(
        &self,
        token: &CustomerToken,
    ) -> Result<Vec<WishlistEntry>, CommerceError> {
        let response = self
            .inner
            .http
            .get(self.endpoint("wishlist"))
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        let payload: WishlistPayload = read_json(response, "wishlist").await?;
        Ok(payload.entries.into_iter().map(WishlistEntry::from).collect())
    }

    /// Save a product to the customer's wishlist.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::AlreadyPresent`] if the product is already
    /// saved, or another variant if the request fails.
    #[instrument(skip(self, token), fields(product = %product))]
    pub async fn add_wishlist_entry(
        &self,
        token: &CustomerToken,
        product: ProductId,
    ) -> Result<(), CommerceError> {
        let response = self
            .inner
            .http
            .post(self.endpoint("wishlist/entries"))
            .bearer_auth(&token.access_token)
            .json(&serde_json::json!({ "product_id": product }))
            .send()
            .await?;

        expect_success(response, "wishlist entry").await
    }

    /// Remove a product from the customer's wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product = %product))]
    pub async fn remove_wishlist_entry(
        &self,
        token: &CustomerToken,
        product: ProductId,
    ) -> Result<(), CommerceError> {
        let response = self
            .inner
            .http
            .delete(self.endpoint(&format!("wishlist/entries/{product}")))
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        expect_success(response, &format!("wishlist entry {product}")).await
    }
}

// =============================================================================
// Response Handling
// =============================================================================

/// Map backend response statuses onto the error contract.
async fn check_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, CommerceError> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED => Err(CommerceError::Unauthorized),
        StatusCode::CONFLICT => Err(CommerceError::AlreadyPresent),
        StatusCode::NOT_FOUND => Err(CommerceError::NotFound(what.to_string())),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            Err(CommerceError::RateLimited(retry_after))
        }
        s if !s.is_success() => {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %s,
                body = %message.chars().take(500).collect::<String>(),
                "Commerce API returned non-success status"
            );
            Err(CommerceError::Api {
                status: s.as_u16(),
                message,
            })
        }
        _ => Ok(response),
    }
}

/// Check the status and parse a JSON body.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<T, CommerceError> {
    let response = check_status(response, what).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse commerce API response"
        );
        CommerceError::Parse(e.to_string())
    })
}

/// Check the status and discard the body.
async fn expect_success(response: reqwest::Response, what: &str) -> Result<(), CommerceError> {
    check_status(response, what).await.map(|_| ())
}
