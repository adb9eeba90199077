//! Catalog product as returned by the search backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque product identifier assigned by the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A product listing.
///
/// Prices are in minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub price: u64,
    #[serde(default)]
    pub original_price: Option<u64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub sold_count: u32,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub free_shipping: bool,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Minimal product with the given id, name and price.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: u64) -> Self {
        let name = name.into();
        Self {
            id: ProductId::new(id),
            slug: slugify(&name),
            name,
            price,
            original_price: None,
            image_url: None,
            rating: 0.0,
            review_count: 0,
            sold_count: 0,
            brand: None,
            category: None,
            location: None,
            free_shipping: false,
            in_stock: true,
        }
    }

    /// Discount percentage against the original price, if discounted.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u8> {
        let original = self.original_price?;
        if original == 0 || original <= self.price {
            return None;
        }
        let off = (original - self.price) * 100 / original;
        u8::try_from(off).ok()
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "id": "p-1",
            "name": "Linen Shirt",
            "price": 1999,
            "originalPrice": 2999,
            "imageUrl": "/images/p-1.webp",
            "freeShipping": true
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "p-1");
        assert_eq!(product.original_price, Some(2999));
        assert!(product.free_shipping);
        assert!(product.in_stock);
        assert_eq!(product.review_count, 0);
    }

    #[test]
    fn test_slug_from_name() {
        let product = Product::new("1", "  Blue  Denim Jacket! ", 100);
        assert_eq!(product.slug, "blue-denim-jacket");
    }

    #[test]
    fn test_discount_percent() {
        let mut product = Product::new("1", "Mug", 750);
        assert_eq!(product.discount_percent(), None);

        product.original_price = Some(1000);
        assert_eq!(product.discount_percent(), Some(25));

        product.original_price = Some(500);
        assert_eq!(product.discount_percent(), None);
    }
}
