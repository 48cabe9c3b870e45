//! Wire types for the commerce backend API.
//!
//! The backend has historically serialized images and colors either as bare
//! strings or as objects, depending on the endpoint and its age. All of that
//! variance is absorbed here, at the ingress boundary: wire records are
//! converted to the canonical [`CartLine`]/[`WishlistEntry`]/[`Product`]
//! shapes immediately on read, so nothing past this module ever branches on
//! representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use saltfern_core::{CartLine, LineId, Price, ProductId, RemoteLineId, WishlistEntry};

// =============================================================================
// Auth Types
// =============================================================================

/// Customer bearer token obtained from the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerToken {
    /// The access token for customer-scoped API requests.
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl CustomerToken {
    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_in.is_some_and(|expires_in| {
            let now = Utc::now().timestamp();
            let expires_at = self.obtained_at + expires_in;
            now >= (expires_at - 60)
        })
    }
}

/// Login request body.
#[derive(Debug, Serialize)]
pub(super) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Raw token response from the login endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct LoginResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

// =============================================================================
// Shape Normalization
// =============================================================================

/// An image reference as the backend serializes it: either a bare URL string
/// or an object with a `url` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// Bare URL string.
    Url(String),
    /// Object form with optional alt text.
    Detailed {
        url: String,
        #[serde(default)]
        alt: Option<String>,
    },
}

impl ImageRef {
    /// Collapse to the canonical representation: the URL.
    #[must_use]
    pub fn into_url(self) -> String {
        match self {
            Self::Url(url) | Self::Detailed { url, .. } => url,
        }
    }
}

/// A color as the backend serializes it: either a bare name string or an
/// object with a `name` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColorRef {
    /// Bare name string.
    Name(String),
    /// Object form with optional hex value.
    Detailed {
        name: String,
        #[serde(default)]
        hex: Option<String>,
    },
}

impl ColorRef {
    /// Collapse to the canonical representation: the display name.
    #[must_use]
    pub fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// A cart line as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCartLine {
    pub id: RemoteLineId,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub unit_price: Price,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<ColorRef>,
    pub quantity: u32,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

impl From<RemoteCartLine> for CartLine {
    fn from(line: RemoteCartLine) -> Self {
        Self {
            id: LineId::Remote(line.id),
            product: line.product_id,
            name: line.name,
            slug: line.slug,
            unit_price: line.unit_price,
            image: line.image.map(ImageRef::into_url),
            size: line.size,
            color: line.color.map(ColorRef::into_name),
            quantity: line.quantity,
        }
    }
}

/// Full cart response body.
#[derive(Debug, Deserialize)]
pub(super) struct CartPayload {
    #[serde(default)]
    pub lines: Vec<RemoteCartLine>,
}

/// Create/attach request body for a cart line.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCartLine {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub quantity: u32,
}

impl From<&CartLine> for CreateCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product,
            size: line.size.clone(),
            color: line.color.clone(),
            quantity: line.quantity,
        }
    }
}

// =============================================================================
// Wishlist Types
// =============================================================================

/// A wishlist entry as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteWishlistEntry {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub in_stock: bool,
}

impl From<RemoteWishlistEntry> for WishlistEntry {
    fn from(entry: RemoteWishlistEntry) -> Self {
        Self {
            product: entry.product_id,
            name: entry.name,
            slug: entry.slug,
            price: entry.price,
            image: entry.image.map(ImageRef::into_url),
            in_stock: entry.in_stock,
        }
    }
}

/// Full wishlist response body.
#[derive(Debug, Deserialize)]
pub(super) struct WishlistPayload {
    #[serde(default)]
    pub entries: Vec<RemoteWishlistEntry>,
}

// =============================================================================
// Catalog Types
// =============================================================================

/// A product variant as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariant {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<ColorRef>,
    #[serde(default)]
    pub in_stock: bool,
}

/// A product as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub variants: Vec<RemoteVariant>,
    #[serde(default)]
    pub in_stock: bool,
}

/// Product listing response body.
#[derive(Debug, Deserialize)]
pub(super) struct ProductsPayload {
    #[serde(default)]
    pub products: Vec<RemoteProduct>,
}

/// A purchasable variant of a product, normalized.
#[derive(Debug, Clone, Serialize)]
pub struct ProductVariant {
    pub size: Option<String>,
    pub color: Option<String>,
    pub in_stock: bool,
}

/// A product, normalized for the storefront surface.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Price,
    pub images: Vec<String>,
    pub variants: Vec<ProductVariant>,
    pub in_stock: bool,
}

impl From<RemoteProduct> for Product {
    fn from(product: RemoteProduct) -> Self {
        Self {
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            images: product.images.into_iter().map(ImageRef::into_url).collect(),
            variants: product
                .variants
                .into_iter()
                .map(|v| ProductVariant {
                    size: v.size,
                    color: v.color.map(ColorRef::into_name),
                    in_stock: v.in_stock,
                })
                .collect(),
            in_stock: product.in_stock,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_accepts_both_shapes() {
        let bare: ImageRef = serde_json::from_value(serde_json::json!(
            "https://cdn.test.shop/a.jpg"
        ))
        .unwrap();
        assert_eq!(bare.into_url(), "https://cdn.test.shop/a.jpg");

        let detailed: ImageRef = serde_json::from_value(serde_json::json!({
            "url": "https://cdn.test.shop/b.jpg",
            "alt": "Linen shirt, front"
        }))
        .unwrap();
        assert_eq!(detailed.into_url(), "https://cdn.test.shop/b.jpg");
    }

    #[test]
    fn color_ref_accepts_both_shapes() {
        let bare: ColorRef = serde_json::from_value(serde_json::json!("Red")).unwrap();
        assert_eq!(bare.into_name(), "Red");

        let detailed: ColorRef =
            serde_json::from_value(serde_json::json!({ "name": "Red", "hex": "#c0392b" }))
                .unwrap();
        assert_eq!(detailed.into_name(), "Red");
    }

    #[test]
    fn remote_cart_line_normalizes_on_conversion() {
        let line: RemoteCartLine = serde_json::from_value(serde_json::json!({
            "id": 11,
            "product_id": 3,
            "name": "Linen Shirt",
            "slug": "linen-shirt",
            "unit_price": 120_000,
            "image": { "url": "https://cdn.test.shop/shirt.jpg" },
            "size": "M",
            "color": { "name": "Red" },
            "quantity": 2
        }))
        .unwrap();

        let canonical = CartLine::from(line);
        assert_eq!(canonical.id, LineId::Remote(RemoteLineId::new(11)));
        assert_eq!(canonical.image.as_deref(), Some("https://cdn.test.shop/shirt.jpg"));
        assert_eq!(canonical.color.as_deref(), Some("Red"));
        assert_eq!(canonical.line_total(), Price::new(240_000));
    }

    #[test]
    fn create_cart_line_carries_variant_attributes() {
        let line = CartLine {
            id: LineId::local(),
            product: ProductId::new(5),
            name: "Wool Socks".to_string(),
            slug: "wool-socks".to_string(),
            unit_price: Price::new(45_000),
            image: None,
            size: Some("L".to_string()),
            color: None,
            quantity: 3,
        };

        let body = serde_json::to_value(CreateCartLine::from(&line)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "product_id": 5, "size": "L", "quantity": 3 })
        );
    }

    #[test]
    fn token_expiry_uses_sixty_second_buffer() {
        let fresh = CustomerToken {
            access_token: "tok".to_string(),
            expires_in: Some(3600),
            obtained_at: Utc::now().timestamp(),
        };
        assert!(!fresh.is_expired());

        let stale = CustomerToken {
            access_token: "tok".to_string(),
            expires_in: Some(30),
            obtained_at: Utc::now().timestamp(),
        };
        assert!(stale.is_expired());

        let no_expiry = CustomerToken {
            access_token: "tok".to_string(),
            expires_in: None,
            obtained_at: 0,
        };
        assert!(!no_expiry.is_expired());
    }
}
