//! Cart line and wishlist entry records.
//!
//! These are the canonical shapes shared by the guest-local store and the
//! remote mirror. External representations (wire payloads, stored session
//! records) are normalized into these records at the boundary, so everything
//! past the boundary can rely on a single shape.
//!
//! Stored records are read defensively: optional fields default, unknown
//! fields are ignored, and a missing quantity falls back to 1. There is no
//! versioning scheme for the serialized format.

use serde::{Deserialize, Serialize};

use crate::types::id::{LineId, ProductId};
use crate::types::price::Price;

/// The cart uniqueness key: one line per (product, size, color).
///
/// Adding an item whose key matches an existing line increments that line's
/// quantity instead of creating a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    /// Product reference.
    pub product: ProductId,
    /// Size label, if the product is sized.
    pub size: Option<String>,
    /// Color label, if the product comes in colors.
    pub color: Option<String>,
}

/// One purchasable configuration of a product in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Local-temporary or server-assigned identifier.
    pub id: LineId,
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
    /// Number of units; always positive.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

impl CartLine {
    /// The uniqueness key for this line.
    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        VariantKey {
            product: self.product,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Price of this line: unit price times quantity.
    #[must_use]
    pub const fn line_total(&self) -> Price {
        self.unit_price.line_total(self.quantity)
    }
}

/// A saved product reference on a wishlist.
///
/// Keyed by product identifier alone - no variant tracking, no quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    /// Product reference; the uniqueness key.
    pub product: ProductId,
    /// Display name.
    pub name: String,
    /// URL slug.
    pub slug: String,
    /// Current price in minor units.
    pub price: Price,
    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Whether the product was in stock when saved or last fetched.
    #[serde(default)]
    pub in_stock: bool,
}
