//! # Cart Engine
//!
//! The five cart operations, each run as exactly one unit of work.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  add_to_cart(owner, request)                                            │
//! │       │                                                                 │
//! │       ├── 1. validate owner + request          ──► Validation           │
//! │       ├── 2. store.begin(owner)                ◄── owner serialized     │
//! │       ├── 3. tx.product_by_id                  ──► ProductNotFound      │
//! │       ├── 4. tx.find_by_owner                                           │
//! │       ├── 5. pure mutation (shopcart-core)     ──► StockExceeded        │
//! │       ├── 6. insert / replace / delete                                  │
//! │       └── 7. commit                            ──► Persistence          │
//! │                                                                         │
//! │  Any error after step 2 drops the unit of work: nothing is persisted.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Empty Carts
//! Removing the last line (remove, decrement, set to zero) deletes the cart
//! record. `clear_cart` keeps an empty record. `get_cart` creates one.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shopcart_core::cart::{new_line_id, LineChange};
use shopcart_core::validation::{
    validate_add_request, validate_line_id, validate_owner_id, validate_update_request,
};
use shopcart_core::{Cart, CartAction, CartError, CartLineRequest, CartResult, Product};

use crate::config::EngineSettings;
use crate::store::{CartStore, CartTransaction, StoreError};

/// Runs cart operations against a store.
///
/// ## Example
/// ```rust
/// use shopcart_engine::{CartEngine, EngineSettings, MemoryStore};
/// use shopcart_core::CartLineRequest;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let engine = CartEngine::new(MemoryStore::new(), EngineSettings::default());
///
/// let cart = engine.get_cart("alice").await.unwrap();
/// assert!(cart.is_empty());
///
/// let err = engine
///     .add_to_cart("alice", &CartLineRequest::new("unknown", 1).color("red"))
///     .await
///     .unwrap_err();
/// assert!(matches!(err, shopcart_core::CartError::ProductNotFound(_)));
/// # });
/// ```
#[derive(Debug)]
pub struct CartEngine<S> {
    store: S,
    settings: EngineSettings,
}

impl<S> CartEngine<S>
where
    S: CartStore,
{
    pub fn new(store: S, settings: EngineSettings) -> Self {
        CartEngine { store, settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Adds a line to the owner's cart, merging into an identical variant.
    ///
    /// Creates the cart when the owner has none.
    pub async fn add_to_cart(&self, owner_id: &str, req: &CartLineRequest) -> CartResult<()> {
        validate_owner_id(owner_id)?;
        validate_add_request(req, self.settings.require_color)?;

        let mut tx = self.store.begin(owner_id).await?;
        let product = load_product(&mut tx, &req.product_id).await?;
        let existing = self.read_cart(&mut tx, owner_id).await?;
        let created = existing.is_none();
        let mut cart = existing.unwrap_or_else(|| new_cart(owner_id));

        let change = cart.add_line(
            req,
            &product,
            new_line_id,
            &self.settings.display_fields,
            self.settings.max_cart_lines,
        )?;

        self.persist(&mut tx, &cart, created).await?;
        tx.commit().await?;

        info!(
            owner_id = %owner_id,
            product_id = %req.product_id,
            line_id = %change.line_id(),
            quantity = req.quantity,
            total_cents = cart.total_cents,
            "Added to cart"
        );
        Ok(())
    }

    /// Changes the quantity of the line matching the request's variant.
    ///
    /// ## Rules
    /// - no cart: `Increment` creates one with a single line, anything else
    ///   is `ItemNotFound`
    /// - no matching line: only `Increment` creates it (quantity 1)
    /// - resulting quantity <= 0: the line is removed, and the cart with it
    ///   when it was the last line
    /// - resulting quantity > stock: `StockExceeded`, nothing persisted
    pub async fn update_cart_item(
        &self,
        owner_id: &str,
        req: &CartLineRequest,
        action: CartAction,
    ) -> CartResult<()> {
        validate_owner_id(owner_id)?;
        validate_update_request(req, action, self.settings.require_color)?;

        let mut tx = self.store.begin(owner_id).await?;
        let product = load_product(&mut tx, &req.product_id).await?;
        let existing = self.read_cart(&mut tx, owner_id).await?;
        let created = existing.is_none();
        let mut cart = existing.unwrap_or_else(|| new_cart(owner_id));

        let change = cart.apply_action(
            req,
            action,
            &product,
            new_line_id,
            &self.settings.display_fields,
            self.settings.max_cart_lines,
        )?;

        let cart_deleted = matches!(change, LineChange::Removed { .. }) && cart.is_empty();
        if cart_deleted {
            tx.delete(owner_id).await?;
        } else {
            self.persist(&mut tx, &cart, created).await?;
        }
        tx.commit().await?;

        info!(
            owner_id = %owner_id,
            product_id = %req.product_id,
            action = %action,
            change = ?change,
            cart_deleted,
            "Cart item updated"
        );
        Ok(())
    }

    /// Removes a line by id; deletes the cart when it becomes empty.
    pub async fn remove_cart_item(&self, owner_id: &str, line_id: &str) -> CartResult<()> {
        validate_owner_id(owner_id)?;
        validate_line_id(line_id)?;

        let mut tx = self.store.begin(owner_id).await?;
        let mut cart = self
            .read_cart(&mut tx, owner_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(owner_id.to_string()))?;

        if cart.remove_line(line_id)?.is_none() {
            debug!(owner_id = %owner_id, line_id = %line_id, "Line not in cart");
            return Err(CartError::item_not_found(owner_id, line_id));
        }

        let cart_deleted = cart.is_empty();
        if cart_deleted {
            tx.delete(owner_id).await?;
        } else {
            self.persist(&mut tx, &cart, false).await?;
        }
        tx.commit().await?;

        info!(owner_id = %owner_id, line_id = %line_id, cart_deleted, "Removed cart item");
        Ok(())
    }

    /// Empties the cart but keeps the record.
    pub async fn clear_cart(&self, owner_id: &str) -> CartResult<()> {
        validate_owner_id(owner_id)?;

        let mut tx = self.store.begin(owner_id).await?;
        let mut cart = self
            .read_cart(&mut tx, owner_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(owner_id.to_string()))?;

        let removed = cart.line_count();
        cart.clear();
        self.persist(&mut tx, &cart, false).await?;
        tx.commit().await?;

        info!(owner_id = %owner_id, removed_lines = removed, "Cart cleared");
        Ok(())
    }

    /// Returns the owner's cart, creating and persisting an empty one first
    /// when the owner has none.
    pub async fn get_cart(&self, owner_id: &str) -> CartResult<Cart> {
        validate_owner_id(owner_id)?;

        let mut tx = self.store.begin(owner_id).await?;
        let cart = match self.read_cart(&mut tx, owner_id).await? {
            Some(cart) => cart,
            None => {
                let cart = new_cart(owner_id);
                tx.insert(&cart).await?;
                debug!(owner_id = %owner_id, cart_id = %cart.id, "Created empty cart on read");
                cart
            }
        };
        tx.commit().await?;

        Ok(cart)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Reads the owner's cart and checks the record really belongs to them.
    async fn read_cart(&self, tx: &mut S::Tx, owner_id: &str) -> CartResult<Option<Cart>> {
        let cart = tx.find_by_owner(owner_id).await?;

        if let Some(cart) = &cart {
            if cart.owner_id != owner_id {
                warn!(
                    owner_id = %owner_id,
                    record_owner = %cart.owner_id,
                    "Cart record owner mismatch"
                );
                return Err(StoreError::OwnerMismatch {
                    expected: owner_id.to_string(),
                    found: cart.owner_id.clone(),
                }
                .into());
            }
        }

        Ok(cart)
    }

    async fn persist(&self, tx: &mut S::Tx, cart: &Cart, created: bool) -> CartResult<()> {
        debug_assert!(cart.total_is_consistent());
        if created {
            tx.insert(cart).await?;
        } else {
            tx.replace(&cart.owner_id, &cart.lines, cart.total_cents, Utc::now())
                .await?;
        }
        Ok(())
    }
}

/// Reads the product through the unit of work.
async fn load_product<T: CartTransaction>(tx: &mut T, product_id: &str) -> CartResult<Product> {
    tx.product_by_id(product_id).await?.ok_or_else(|| {
        debug!(product_id = %product_id, "Product not found");
        CartError::ProductNotFound(product_id.to_string())
    })
}

fn new_cart(owner_id: &str) -> Cart {
    Cart::empty(Uuid::new_v4().to_string(), owner_id, Utc::now())
}

// =============================================================================
// Unit Tests
// =============================================================================
