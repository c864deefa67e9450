//! # Catalog Writes
//!
//! Product creation input, sparse product patches and slug generation.
//! The cart engine itself only ever reads products; these types are used by
//! the catalog repositories and the seed tooling.
//!
//! ## Patch Allow-List
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  ProductPatch            mutable?                              │
//! │  ───────────────────     ────────                              │
//! │  title                   ✅                                    │
//! │  description             ✅                                    │
//! │  price_cents             ✅  (>= 0)                            │
//! │  discount_bps            ✅  (<= 10000)                        │
//! │  stock                   ✅  (>= 0)                            │
//! │  images                  ✅                                    │
//! │  is_available            ✅                                    │
//! │  id / slug / timestamps  ❌  not representable in a patch      │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::Product;
use crate::validation::{
    validate_discount_bps, validate_price_cents, validate_stock, validate_title,
    ValidationResult,
};

/// Characters of the description that go into a generated slug.
pub const SLUG_DESCRIPTION_CHARS: usize = 30;

// =============================================================================
// Slug Generation
// =============================================================================

/// Builds a URL slug from a title, the start of a description and a category.
///
/// Runs of anything that is not an ASCII letter or digit become a single `-`,
/// leading and trailing dashes are trimmed and the result is lowercased.
///
/// ## Example
/// ```rust
/// use shopcart_core::catalog::generate_slug;
///
/// let slug = generate_slug("Desk Lamp", "Warm LED light for late nights at the desk", "Home");
/// assert_eq!(slug, "desk-lamp-warm-led-light-for-late-nights-home");
/// ```
pub fn generate_slug(title: &str, description: &str, category: &str) -> String {
    let description: String = description.chars().take(SLUG_DESCRIPTION_CHARS).collect();
    let raw = format!("{}-{}-{}", title, description, category);

    non_alphanumeric_runs()
        .replace_all(&raw, "-")
        .trim_matches('-')
        .to_lowercase()
}

fn non_alphanumeric_runs() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static slug pattern compiles"))
}

// =============================================================================
// Listing
// =============================================================================

/// Largest accepted page size for product listings.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One page of a newest-first product listing. Pages start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Validates and builds a page request.
    ///
    /// ```rust
    /// use shopcart_core::catalog::PageRequest;
    ///
    /// let page = PageRequest::new(3, 20).unwrap();
    /// assert_eq!(page.offset(), 40);
    /// assert!(PageRequest::new(0, 20).is_err());
    /// ```
    pub fn new(page: u32, limit: u32) -> ValidationResult<Self> {
        if page == 0 {
            return Err(ValidationError::OutOfRange {
                field: "page".to_string(),
                min: 1,
                max: i64::from(u32::MAX),
            });
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                min: 1,
                max: i64::from(MAX_PAGE_LIMIT),
            });
        }
        Ok(PageRequest { page, limit })
    }

    /// Number of products skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: 1, limit: 20 }
    }
}

/// Orders products newest first; ids break ties.
pub fn newest_first(a: &Product, b: &Product) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

// =============================================================================
// New Product
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Used for slug generation only; the first entry wins.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Explicit slug; generated when absent.
    #[serde(default)]
    pub slug: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_bps: u32,
    pub stock: i64,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewProduct {
    /// Validates the input fields.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_title(&self.title)?;
        validate_price_cents(self.price_cents)?;
        validate_discount_bps(self.discount_bps)?;
        validate_stock(self.stock)?;
        Ok(())
    }

    /// Returns the explicit slug or generates one.
    ///
    /// Generation needs at least one category.
    pub fn resolve_slug(&self) -> ValidationResult<String> {
        if let Some(slug) = self.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(slug.trim().to_string());
        }

        let category = self
            .categories
            .first()
            .ok_or_else(|| ValidationError::required("category"))?;

        let slug = generate_slug(&self.title, &self.description, category);
        if slug.is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "slug".to_string(),
                reason: "title, description and category produce an empty slug".to_string(),
            });
        }
        Ok(slug)
    }

    /// Validates and turns the input into a listed product.
    pub fn into_product(self, id: String, now: DateTime<Utc>) -> ValidationResult<Product> {
        self.validate()?;
        let slug = self.resolve_slug()?;

        Ok(Product {
            id,
            title: self.title.trim().to_string(),
            slug,
            description: self.description,
            price_cents: self.price_cents,
            discount_bps: self.discount_bps,
            stock: self.stock,
            images: self.images,
            is_available: true,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Product Patch
// =============================================================================

/// Sparse update of the mutable product fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub discount_bps: Option<u32>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
    pub is_available: Option<bool>,
}

impl ProductPatch {
    /// Checks if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price_cents.is_none()
            && self.discount_bps.is_none()
            && self.stock.is_none()
            && self.images.is_none()
            && self.is_available.is_none()
    }

    /// Validates every present field; an empty patch is rejected.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch {
                entity: "product".to_string(),
            });
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price_cents {
            validate_price_cents(price)?;
        }
        if let Some(bps) = self.discount_bps {
            validate_discount_bps(bps)?;
        }
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }
        Ok(())
    }

    /// Applies the present fields to `product` and bumps `updated_at`.
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            product.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price_cents {
            product.price_cents = price;
        }
        if let Some(bps) = self.discount_bps {
            product.discount_bps = bps;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(images) = &self.images {
            product.images = images.clone();
        }
        if let Some(available) = self.is_available {
            product.is_available = available;
        }
        product.updated_at = now;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp() -> NewProduct {
        NewProduct {
            title: "Desk Lamp".to_string(),
            description: "Warm light".to_string(),
            categories: vec!["Home & Office".to_string()],
            slug: None,
            price_cents: 4_999,
            discount_bps: 0,
            stock: 10,
            images: vec![],
        }
    }

    #[test]
    fn test_generate_slug_collapses_separators() {
        assert_eq!(
            generate_slug("  Hello,  World!! ", "--", "Misc"),
            "hello-world-misc"
        );
        assert_eq!(generate_slug("Lamp", "", "Home & Office"), "lamp-home-office");
    }

    #[test]
    fn test_generate_slug_truncates_description() {
        let description = "abcdefghijklmnopqrstuvwxyz0123456789";
        assert_eq!(
            generate_slug("T", description, "C"),
            "t-abcdefghijklmnopqrstuvwxyz0123-c"
        );
    }

    #[test]
    fn test_generate_slug_short_description() {
        assert_eq!(generate_slug("T", "ab", "C"), "t-ab-c");
    }

    #[test]
    fn test_into_product_generates_slug() {
        let product = lamp().into_product("p-1".to_string(), Utc::now()).unwrap();
        assert_eq!(product.slug, "desk-lamp-warm-light-home-office");
        assert!(product.is_available);
    }

    #[test]
    fn test_into_product_keeps_explicit_slug() {
        let mut input = lamp();
        input.slug = Some("my-lamp".to_string());
        input.categories.clear();
        let product = input.into_product("p-1".to_string(), Utc::now()).unwrap();
        assert_eq!(product.slug, "my-lamp");
    }

    #[test]
    fn test_slug_generation_requires_category() {
        let mut input = lamp();
        input.categories.clear();
        assert_eq!(
            input.resolve_slug(),
            Err(ValidationError::required("category"))
        );
    }

    #[test]
    fn test_new_product_validation() {
        let mut input = lamp();
        input.discount_bps = 12_000;
        assert!(input.validate().is_err());

        let mut input = lamp();
        input.price_cents = -1;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_empty_patch_rejected() {
        let patch = ProductPatch::default();
        assert!(patch.is_empty());
        assert_eq!(
            patch.validate(),
            Err(ValidationError::EmptyPatch {
                entity: "product".to_string()
            })
        );
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let mut product = lamp().into_product("p-1".to_string(), Utc::now()).unwrap();
        let patch = ProductPatch {
            stock: Some(3),
            discount_bps: Some(2_500),
            ..Default::default()
        };
        patch.validate().unwrap();
        patch.apply_to(&mut product, Utc::now());

        assert_eq!(product.stock, 3);
        assert_eq!(product.discount_bps, 2_500);
        assert_eq!(product.title, "Desk Lamp");
        assert_eq!(product.price_cents, 4_999);
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let result: Result<ProductPatch, _> = serde_json::from_str(r#"{"slug":"hijack"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_validates_present_fields() {
        let patch = ProductPatch {
            stock: Some(-5),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(1, 10).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(4, 25).unwrap().offset(), 75);
        assert_eq!(PageRequest::default().offset(), 0);
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_LIMIT + 1).is_err());
    }

    #[test]
    fn test_newest_first_orders_by_creation_time() {
        let now = Utc::now();
        let old = lamp().into_product("p-1".to_string(), now - chrono::Duration::hours(1)).unwrap();
        let new = lamp().into_product("p-2".to_string(), now).unwrap();
        let tie = lamp().into_product("p-3".to_string(), now).unwrap();

        let mut products = vec![old, new, tie];
        products.sort_by(newest_first);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-3", "p-2", "p-1"]);
    }
}
