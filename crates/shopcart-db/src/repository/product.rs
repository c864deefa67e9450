//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Create with slug generation and uniqueness check
//! - Lookup by id and by slug
//! - Paginated listing, newest first
//! - Sparse patches over the mutable fields only
//!
//! Cart units of work read products through their own transaction
//! (`SqliteCartTransaction::product_by_id`) with the same row mapping.
//!
//! ## Slug Uniqueness
//! ```text
//! insert(NewProduct)
//!      │
//!      ├── explicit slug? ──► use it
//!      └── else ──────────► generate_slug(title, description[..30], category)
//!      │
//!      ├── SELECT 1 ... WHERE slug = ?   → Duplicate("slug")
//!      └── INSERT                        → UNIQUE index is the final guard
//! ```

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use shopcart_core::catalog::{NewProduct, PageRequest, ProductPatch};
use shopcart_core::{Product, ValidationError};

use crate::error::{DbError, DbResult};

pub(crate) const PRODUCT_COLUMNS: &str = "id, title, slug, description, price_cents, discount_bps, stock, \
                               images, is_available, created_at, updated_at";

pub(crate) fn product_from_row(row: &SqliteRow) -> DbResult<Product> {
    let images: String = row.try_get("images")?;
    let discount_bps: i64 = row.try_get("discount_bps")?;

    Ok(Product {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        price_cents: row.try_get("price_cents")?,
        discount_bps: u32::try_from(discount_bps)
            .map_err(|_| DbError::Internal(format!("discount_bps out of range: {}", discount_bps)))?,
        stock: row.try_get("stock")?,
        images: serde_json::from_str(&images)?,
        is_available: row.try_get("is_available")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let lamp = repo.insert(new_lamp).await?;
/// let same = repo.get_by_slug(&lamp.slug).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("id", id).await
    }

    /// Gets a product by slug.
    pub async fn get_by_slug(&self, slug: &str) -> DbResult<Option<Product>> {
        self.fetch_one_where("slug", slug).await
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE {} = ?1",
            PRODUCT_COLUMNS, column
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Checks whether a slug is taken.
    pub async fn slug_exists(&self, slug: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and slug
    /// * `Err(DbError::Validation)` - Invalid input or duplicate slug
    pub async fn insert(&self, input: NewProduct) -> DbResult<Product> {
        let product = input.into_product(Uuid::new_v4().to_string(), Utc::now())?;
        debug!(slug = %product.slug, "Inserting product");

        if self.slug_exists(&product.slug).await? {
            return Err(ValidationError::Duplicate {
                field: "slug".to_string(),
                value: product.slug,
            }
            .into());
        }

        let images = serde_json::to_string(&product.images)?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, slug, description,
                price_cents, discount_bps, stock,
                images, is_available, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9, ?10, ?11
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(i64::from(product.discount_bps))
        .bind(product.stock)
        .bind(images)
        .bind(product.is_available)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.slug),
            other => other,
        })?;

        Ok(product)
    }

    /// Applies a sparse patch and returns the updated product.
    ///
    /// ## Returns
    /// * `Err(DbError::Validation)` - Empty patch or invalid field
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn apply_patch(&self, id: &str, patch: &ProductPatch) -> DbResult<Product> {
        patch.validate()?;
        debug!(id = %id, "Patching product");

        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        patch.apply_to(&mut product, Utc::now());

        let images = serde_json::to_string(&product.images)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                title = ?2,
                description = ?3,
                price_cents = ?4,
                discount_bps = ?5,
                stock = ?6,
                images = ?7,
                is_available = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(i64::from(product.discount_bps))
        .bind(product.stock)
        .bind(images)
        .bind(product.is_available)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Deletes a product. Carts keep their line snapshots.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists one page of products, newest first.
    pub async fn list(&self, page: PageRequest) -> DbResult<Vec<Product>> {
        debug!(page = page.page, limit = page.limit, "Listing products");

        let sql = format!(
            "SELECT {} FROM products ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            PRODUCT_COLUMNS
        );
        let offset = i64::try_from(page.offset())
            .map_err(|_| DbError::Internal(format!("page offset out of range: {}", page.offset())))?;

        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(product_from_row).collect()
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
