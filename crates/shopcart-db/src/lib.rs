//! # shopcart-db: Database Layer for Shopcart
//!
//! SQLite storage for carts, products and product comments, implementing
//! the store seams of `shopcart-engine`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopcart Data Flow                               │
//! │                                                                         │
//! │  CartEngine::add_to_cart(...)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shopcart-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories   │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                 │   │  (embedded)  │  │   │
//! │  │   │               │    │ SqliteCartStore │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo     │   │ 001_init.sql │  │   │
//! │  │   │               │    │ CommentRepo     │   │ 002_comments │  │   │
//! │  │   └───────────────┘    └─────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopcart_db::{Database, DbConfig};
//! use shopcart_engine::{CartEngine, EngineSettings};
//!
//! let db = Database::new(DbConfig::new("shopcart.db")).await?;
//! let engine = CartEngine::new(db.carts(), EngineSettings::default());
//! let cart = engine.get_cart("user-42").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::cart::{SqliteCartStore, SqliteCartTransaction};
pub use repository::comment::CommentRepository;
pub use repository::product::ProductRepository;

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use shopcart_core::catalog::{NewProduct, ProductPatch};
    use shopcart_core::{CartAction, CartError, CartLineRequest};
    use shopcart_engine::{CartEngine, EngineSettings};
    use std::sync::Arc;

    type SqliteEngine = CartEngine<SqliteCartStore>;

    fn new_product(title: &str, price_cents: i64, discount_bps: u32, stock: i64) -> NewProduct {
        NewProduct {
            title: title.to_string(),
            description: format!("{} description", title),
            categories: vec!["Test".to_string()],
            price_cents,
            discount_bps,
            stock,
            ..Default::default()
        }
    }

    fn engine(db: &Database) -> SqliteEngine {
        CartEngine::new(db.carts(), EngineSettings::default())
    }

    #[tokio::test]
    async fn test_engine_over_sqlite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(new_product("Lamp", 10_000, 1_000, 10))
            .await
            .unwrap();
        let engine = engine(&db);

        let red = |qty| CartLineRequest::new(product.id.clone(), qty).color("red");

        engine.add_to_cart("alice", &red(3)).await.unwrap();
        engine.add_to_cart("alice", &red(2)).await.unwrap();

        let cart = engine.get_cart("alice").await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.total().to_string(), "450.00");
        assert_eq!(cart.version, 1);

        engine
            .update_cart_item("alice", &red(0), CartAction::Decrement)
            .await
            .unwrap();
        assert_eq!(engine.get_cart("alice").await.unwrap().total_cents, 36_000);

        engine.clear_cart("alice").await.unwrap();
        let cleared = db.carts().get_by_owner("alice").await.unwrap().unwrap();
        assert!(cleared.is_empty());
        assert_eq!(cleared.total_cents, 0);
    }

    #[tokio::test]
    async fn test_stock_exceeded_over_sqlite_persists_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(new_product("Mug", 1_200, 0, 2))
            .await
            .unwrap();
        let engine = engine(&db);

        let err = engine
            .add_to_cart("bob", &CartLineRequest::new(product.id.clone(), 3).color("white"))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { available: 2, .. }));
        assert_eq!(db.carts().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_last_line_deletes_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(new_product("Pen", 150, 0, 100))
            .await
            .unwrap();
        let engine = engine(&db);

        engine
            .add_to_cart("carol", &CartLineRequest::new(product.id.clone(), 1).color("blue"))
            .await
            .unwrap();
        let line_id = engine.get_cart("carol").await.unwrap().lines[0].id.clone();

        engine.remove_cart_item("carol", &line_id).await.unwrap();
        assert!(db.carts().get_by_owner("carol").await.unwrap().is_none());

        let err = engine.remove_cart_item("carol", &line_id).await.unwrap_err();
        assert!(matches!(err, CartError::CartNotFound(_)));
    }

    #[tokio::test]
    async fn test_price_change_keeps_line_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(new_product("Cable", 1_000, 0, 50))
            .await
            .unwrap();
        let engine = engine(&db);
        let black = CartLineRequest::new(product.id.clone(), 1).color("black");

        engine.add_to_cart("dave", &black).await.unwrap();

        let patch = ProductPatch {
            discount_bps: Some(5_000),
            ..Default::default()
        };
        db.products().apply_patch(&product.id, &patch).await.unwrap();

        engine
            .update_cart_item("dave", &black, CartAction::Increment)
            .await
            .unwrap();
        engine.add_to_cart("dave", &black).await.unwrap();
        let cart = engine.get_cart("dave").await.unwrap();
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.lines[0].unit_price_cents, 1_000);
        assert_eq!(cart.total_cents, 3_000);

        // A new line is priced from the current product.
        let white = CartLineRequest::new(product.id.clone(), 1).color("white");
        engine.add_to_cart("dave", &white).await.unwrap();
        let cart = engine.get_cart("dave").await.unwrap();
        assert_eq!(cart.lines[1].unit_price_cents, 500);
        assert_eq!(cart.total_cents, 3_500);
    }

    #[tokio::test]
    async fn test_color_variants_are_case_sensitive_over_sqlite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(new_product("Scarf", 2_000, 0, 10))
            .await
            .unwrap();
        let engine = engine(&db);

        for color in ["Red", "red"] {
            engine
                .add_to_cart("frank", &CartLineRequest::new(product.id.clone(), 1).color(color))
                .await
                .unwrap();
        }

        let cart = engine.get_cart("frank").await.unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines[0].color, "Red");
        assert_eq!(cart.lines[1].color, "red");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_on_file_database_sum() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("concurrency.db")).max_connections(4);
        let db = Database::new(config).await.unwrap();
        let product = db
            .products()
            .insert(new_product("Sticker", 100, 0, 1_000))
            .await
            .unwrap();
        let engine = Arc::new(engine(&db));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let engine = Arc::clone(&engine);
            let req = CartLineRequest::new(product.id.clone(), 1).color("green");
            handles.push(tokio::spawn(async move {
                engine.add_to_cart("erin", &req).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cart = engine.get_cart("erin").await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 20);
        assert_eq!(cart.total_cents, 2_000);
        db.close().await;
    }
}
