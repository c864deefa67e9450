//! # Store Seams
//!
//! The one thing the engine consumes: a transactional cart store whose units
//! of work also read products.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   let mut tx = store.begin(owner).await?;      ◄── owner is now locked  │
//! │                                                                         │
//! │   let product = tx.product_by_id(id).await?;   ◄── isolated read        │
//! │   let cart = tx.find_by_owner(owner).await?;                            │
//! │   ... pure mutation from shopcart-core ...                              │
//! │   tx.replace(owner, &lines, total, now).await?;  (or insert / delete)   │
//! │                                                                         │
//! │   tx.commit().await?;                          ◄── all or nothing       │
//! │                                                                         │
//! │   Dropping `tx` without commit rolls everything back.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two units of work for the same owner never interleave; units of work for
//! different owners may run in parallel. A product read through a unit of
//! work cannot change underneath it before commit or rollback.

use std::error::Error as StdError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopcart_core::{Cart, CartError, CartLine, Product};
use thiserror::Error;

// =============================================================================
// Store Error
// =============================================================================

/// Failures raised by a store.
///
/// The engine surfaces all of them as `CartError::Persistence`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer changed the cart between read and write.
    #[error("Concurrent write conflict on cart of owner {owner_id}")]
    Conflict { owner_id: String },

    /// The record read for an owner belongs to someone else.
    #[error("Cart record belongs to owner {found}, expected {expected}")]
    OwnerMismatch { expected: String, found: String },

    /// `insert` was called although the owner already has a cart.
    #[error("Cart already exists for owner {0}")]
    AlreadyExists(String),

    /// `replace` or `delete` was called although the owner has no cart.
    #[error("No cart record for owner {0}")]
    Missing(String),

    /// Driver or I/O failure.
    #[error("Store backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl StoreError {
    /// Wraps a driver error.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

impl From<StoreError> for CartError {
    fn from(err: StoreError) -> Self {
        CartError::persistence(err)
    }
}

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Cart Store
// =============================================================================

/// Opens units of work over cart records.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The unit of work type.
    type Tx: CartTransaction;

    /// Starts a unit of work for `owner_id`.
    ///
    /// Waits while another unit of work for the same owner is open.
    async fn begin(&self, owner_id: &str) -> StoreResult<Self::Tx>;
}

/// One atomic unit of work.
///
/// Writes become visible to other units of work only after `commit`.
#[async_trait]
pub trait CartTransaction: Send {
    /// Reads a product as this unit of work sees it.
    ///
    /// Returns `None` when the id is unknown. Writers to the product wait
    /// until this unit of work ends.
    async fn product_by_id(&mut self, product_id: &str) -> StoreResult<Option<Product>>;

    /// Reads the owner's cart as this unit of work sees it.
    async fn find_by_owner(&mut self, owner_id: &str) -> StoreResult<Option<Cart>>;

    /// Creates a cart record. Fails with `AlreadyExists` when one is present.
    async fn insert(&mut self, cart: &Cart) -> StoreResult<()>;

    /// Replaces the lines and total of the owner's cart and bumps its version.
    async fn replace(
        &mut self,
        owner_id: &str,
        lines: &[CartLine],
        total_cents: i64,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Deletes the owner's cart record.
    async fn delete(&mut self, owner_id: &str) -> StoreResult<()>;

    /// Makes every staged write durable and visible.
    async fn commit(self) -> StoreResult<()>;
}
