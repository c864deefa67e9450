//! # Cart Store (SQLite)
//!
//! `SqliteCartStore` implements the engine's `CartStore` seam.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  begin(owner)   → BEGIN IMMEDIATE      (write lock taken up front,      │
//! │                                         other writers wait busy_timeout)│
//! │  product_by_id  → SELECT ... FROM products (same connection, so no      │
//! │                   catalog write lands before commit)                    │
//! │  find_by_owner  → SELECT ... remembers `version`                        │
//! │  replace        → UPDATE ... SET version = version + 1                  │
//! │                   WHERE owner_id = ? AND version = <remembered>         │
//! │                   0 rows → Conflict                                     │
//! │  commit         → COMMIT                                                │
//! │  (drop)         → ROLLBACK                                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cart is one row; its lines are a JSON array column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use shopcart_core::{Cart, CartLine, Product};
use shopcart_engine::{CartStore, CartTransaction, StoreError, StoreResult};

use crate::error::{DbError, DbResult};
use crate::repository::product::{product_from_row, PRODUCT_COLUMNS};

const CART_COLUMNS: &str = "id, owner_id, lines, total_cents, version, created_at, updated_at";

fn cart_from_row(row: &SqliteRow) -> DbResult<Cart> {
    let lines: String = row.try_get("lines")?;

    Ok(Cart {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        lines: serde_json::from_str(&lines)?,
        total_cents: row.try_get("total_cents")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// =============================================================================
// Store
// =============================================================================

/// SQLite-backed cart store.
#[derive(Debug, Clone)]
pub struct SqliteCartStore {
    pool: SqlitePool,
}

impl SqliteCartStore {
    /// Creates a new SqliteCartStore.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCartStore { pool }
    }

    /// Reads a committed cart outside any unit of work.
    pub async fn get_by_owner(&self, owner_id: &str) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {} FROM carts WHERE owner_id = ?1", CART_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(cart_from_row).transpose()
    }

    /// Counts cart records (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl CartStore for SqliteCartStore {
    type Tx = SqliteCartTransaction;

    async fn begin(&self, owner_id: &str) -> StoreResult<SqliteCartTransaction> {
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(DbError::from)?;

        debug!(owner_id = %owner_id, "Cart unit of work started");

        Ok(SqliteCartTransaction {
            tx,
            owner_id: owner_id.to_string(),
            seen_version: None,
        })
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One `BEGIN IMMEDIATE` transaction scoped to a single owner.
pub struct SqliteCartTransaction {
    tx: Transaction<'static, Sqlite>,
    owner_id: String,
    seen_version: Option<i64>,
}

impl SqliteCartTransaction {
    fn check_owner(&self, owner_id: &str) -> StoreResult<()> {
        if owner_id != self.owner_id {
            return Err(StoreError::OwnerMismatch {
                expected: self.owner_id.clone(),
                found: owner_id.to_string(),
            });
        }
        Ok(())
    }

    async fn select_product(&mut self, product_id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn select(&mut self, owner_id: &str) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {} FROM carts WHERE owner_id = ?1", CART_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        let cart = row.as_ref().map(cart_from_row).transpose()?;
        self.seen_version = cart.as_ref().map(|c| c.version);
        Ok(cart)
    }

    async fn insert_row(&mut self, cart: &Cart) -> DbResult<()> {
        let lines = serde_json::to_string(&cart.lines)?;

        sqlx::query(
            r#"
            INSERT INTO carts (id, owner_id, lines, total_cents, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.owner_id)
        .bind(lines)
        .bind(cart.total_cents)
        .bind(cart.version)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &cart.owner_id),
            other => other,
        })?;

        self.seen_version = Some(cart.version);
        Ok(())
    }

    async fn update_row(
        &mut self,
        owner_id: &str,
        lines: &[CartLine],
        total_cents: i64,
        updated_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let expected = match self.seen_version {
            Some(v) => v,
            None => self
                .select(owner_id)
                .await?
                .map(|c| c.version)
                .ok_or_else(|| DbError::not_found("Cart", owner_id))?,
        };

        let lines = serde_json::to_string(lines)?;

        let result = sqlx::query(
            r#"
            UPDATE carts
            SET lines = ?1,
                total_cents = ?2,
                updated_at = ?3,
                version = version + 1
            WHERE owner_id = ?4 AND version = ?5
            "#,
        )
        .bind(lines)
        .bind(total_cents)
        .bind(updated_at)
        .bind(owner_id)
        .bind(expected)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                owner_id: owner_id.to_string(),
            });
        }

        self.seen_version = Some(expected + 1);
        Ok(())
    }

    async fn delete_row(&mut self, owner_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM carts WHERE owner_id = ?1")
            .bind(owner_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart", owner_id));
        }

        self.seen_version = None;
        Ok(())
    }
}

#[async_trait]
impl CartTransaction for SqliteCartTransaction {
    async fn product_by_id(&mut self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.select_product(product_id).await?)
    }

    async fn find_by_owner(&mut self, owner_id: &str) -> StoreResult<Option<Cart>> {
        self.check_owner(owner_id)?;
        Ok(self.select(owner_id).await?)
    }

    async fn insert(&mut self, cart: &Cart) -> StoreResult<()> {
        self.check_owner(&cart.owner_id)?;
        debug!(owner_id = %cart.owner_id, cart_id = %cart.id, "Inserting cart");
        Ok(self.insert_row(cart).await?)
    }

    async fn replace(
        &mut self,
        owner_id: &str,
        lines: &[CartLine],
        total_cents: i64,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.check_owner(owner_id)?;
        debug!(owner_id = %owner_id, lines = lines.len(), total_cents, "Replacing cart");
        Ok(self.update_row(owner_id, lines, total_cents, updated_at).await?)
    }

    async fn delete(&mut self, owner_id: &str) -> StoreResult<()> {
        self.check_owner(owner_id)?;
        debug!(owner_id = %owner_id, "Deleting cart");
        Ok(self.delete_row(owner_id).await?)
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(DbError::from)?;
        debug!(owner_id = %self.owner_id, "Cart unit of work committed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use shopcart_core::catalog::{NewProduct, ProductPatch};
    use std::time::Duration;
    use uuid::Uuid;

    async fn store() -> SqliteCartStore {
        Database::new(DbConfig::in_memory()).await.unwrap().carts()
    }

    fn line(id: &str, quantity: i64, unit: i64) -> CartLine {
        CartLine {
            id: id.to_string(),
            product_id: "p-1".to_string(),
            quantity,
            unit_price_cents: unit,
            line_total_cents: unit * quantity,
            title: "Lamp".to_string(),
            image: String::new(),
            slug: "lamp".to_string(),
            color: "red".to_string(),
            model: String::new(),
        }
    }

    async fn seed_cart(store: &SqliteCartStore, owner: &str) -> Cart {
        let cart = Cart::empty(Uuid::new_v4().to_string(), owner, Utc::now());
        let mut tx = store.begin(owner).await.unwrap();
        tx.insert(&cart).await.unwrap();
        tx.commit().await.unwrap();
        cart
    }

    #[tokio::test]
    async fn test_insert_and_find_round_trip() {
        let store = store().await;
        let cart = seed_cart(&store, "alice").await;

        let mut tx = store.begin("alice").await.unwrap();
        let found = tx.find_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(found.id, cart.id);
        assert!(found.lines.is_empty());
        assert_eq!(found.version, 0);
    }

    #[tokio::test]
    async fn test_replace_persists_lines_and_bumps_version() {
        let store = store().await;
        seed_cart(&store, "alice").await;

        let mut tx = store.begin("alice").await.unwrap();
        tx.find_by_owner("alice").await.unwrap();
        let lines = vec![line("l-1", 2, 450)];
        tx.replace("alice", &lines, 900, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.get_by_owner("alice").await.unwrap().unwrap();
        assert_eq!(stored.lines, lines);
        assert_eq!(stored.total_cents, 900);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = store().await;
        seed_cart(&store, "alice").await;

        {
            let mut tx = store.begin("alice").await.unwrap();
            tx.find_by_owner("alice").await.unwrap();
            tx.replace("alice", &[line("l-1", 1, 100)], 100, Utc::now())
                .await
                .unwrap();
        }

        let stored = store.get_by_owner("alice").await.unwrap().unwrap();
        assert!(stored.lines.is_empty());
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let store = store().await;
        seed_cart(&store, "alice").await;

        let mut tx = store.begin("alice").await.unwrap();
        tx.find_by_owner("alice").await.unwrap();
        // Simulate a concurrent writer inside the same connection.
        sqlx::query("UPDATE carts SET version = version + 1 WHERE owner_id = 'alice'")
            .execute(&mut *tx.tx)
            .await
            .unwrap();

        let err = tx
            .replace("alice", &[], 0, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let store = store().await;
        seed_cart(&store, "alice").await;

        let mut tx = store.begin("alice").await.unwrap();
        tx.delete("alice").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        let mut tx = store.begin("alice").await.unwrap();
        let err = tx.delete("alice").await.unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn test_second_insert_is_already_exists() {
        let store = store().await;
        seed_cart(&store, "alice").await;

        let mut tx = store.begin("alice").await.unwrap();
        let again = Cart::empty(Uuid::new_v4().to_string(), "alice", Utc::now());
        let err = tx.insert(&again).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(owner) if owner == "alice"));
    }

    #[tokio::test]
    async fn test_product_read_inside_unit_of_work() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(NewProduct {
                title: "Lamp".to_string(),
                description: String::new(),
                categories: vec![],
                slug: None,
                price_cents: 1_000,
                discount_bps: 0,
                stock: 4,
                images: vec![],
            })
            .await
            .unwrap();

        let store = db.carts();
        let mut tx = store.begin("alice").await.unwrap();
        let found = tx.product_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found.stock, 4);
        assert!(tx.product_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_catalog_writes_wait_for_open_unit_of_work() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("shopcart.db")))
            .await
            .unwrap();
        let product = db
            .products()
            .insert(NewProduct {
                title: "Lamp".to_string(),
                description: String::new(),
                categories: vec![],
                slug: None,
                price_cents: 1_000,
                discount_bps: 0,
                stock: 4,
                images: vec![],
            })
            .await
            .unwrap();

        let store = db.carts();
        let mut tx = store.begin("alice").await.unwrap();
        let seen = tx.product_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(seen.price_cents, 1_000);

        let products = db.products();
        let id = product.id.clone();
        let patch = tokio::spawn(async move {
            let patch = ProductPatch {
                price_cents: Some(2_000),
                ..Default::default()
            };
            products.apply_patch(&id, &patch).await
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!patch.is_finished());

        // Still the value read at the start of the unit of work.
        let again = tx.product_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(again.price_cents, 1_000);
        tx.commit().await.unwrap();

        let patched = patch.await.unwrap().unwrap();
        assert_eq!(patched.price_cents, 2_000);
        db.close().await;
    }

    #[tokio::test]
    async fn test_owner_scope_enforced() {
        let store = store().await;
        let mut tx = store.begin("alice").await.unwrap();
        let err = tx.find_by_owner("bob").await.unwrap_err();
        assert!(matches!(err, StoreError::OwnerMismatch { .. }));
    }
}
