//! # In-Memory Adapter
//!
//! `MemoryStore` implements the store seam without a database, reading
//! products from a shared `MemoryCatalog`. It backs the engine's tests and
//! embedders that keep carts in process.
//!
//! ## Per-Owner Slots
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  slots: Mutex<HashMap<owner_id, Arc<tokio::Mutex<Option<Cart>>>>>       │
//! │                                                                         │
//! │   owner "a" ──► [ Mutex ] ◄── MemoryTransaction holds the OWNED guard   │
//! │   owner "b" ──► [ Mutex ]     (other owners are not blocked)            │
//! │                                                                         │
//! │   writes are staged in the transaction and applied on commit;          │
//! │   dropping the transaction discards them                                │
//! │                                                                         │
//! │   a slot left empty with nobody waiting is evicted when its            │
//! │   transaction ends                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Product Reads
//! The first `product_by_id` of a unit of work takes a shared read guard on
//! the catalog and keeps it until the unit of work ends. Catalog writers wait
//! for it, so the product a mutation was checked against cannot change
//! before commit. Do not write to the catalog from inside an open unit of
//! work on the same task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use shopcart_core::catalog::{newest_first, NewProduct, PageRequest, ProductPatch};
use shopcart_core::{Cart, CartLine, Product, ValidationError};

use crate::store::{CartStore, CartTransaction, StoreError, StoreResult};

type Slot = Arc<AsyncMutex<Option<Cart>>>;
type Registry = Arc<Mutex<HashMap<String, Slot>>>;
type Products = HashMap<String, Product>;

// =============================================================================
// Memory Store
// =============================================================================

/// In-process cart store. Cloning shares the underlying carts and catalog.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Registry,
    catalog: MemoryCatalog,
}

impl MemoryStore {
    /// Creates a store with an empty catalog of its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose units of work read products from `catalog`.
    pub fn with_catalog(catalog: MemoryCatalog) -> Self {
        MemoryStore {
            slots: Registry::default(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &MemoryCatalog {
        &self.catalog
    }

    fn slot(&self, owner_id: &str) -> StoreResult<Slot> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::backend("cart slot registry poisoned"))?;
        Ok(slots
            .entry(owner_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone())
    }

    /// Returns the committed cart of `owner_id`, waiting for any open unit
    /// of work on that owner.
    pub async fn committed(&self, owner_id: &str) -> StoreResult<Option<Cart>> {
        let slot = {
            let slots = self
                .slots
                .lock()
                .map_err(|_| StoreError::backend("cart slot registry poisoned"))?;
            match slots.get(owner_id) {
                Some(slot) => slot.clone(),
                None => return Ok(None),
            }
        };
        let guard = slot.lock().await;
        Ok(guard.clone())
    }

    #[cfg(test)]
    fn tracked_owners(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self, owner_id: &str) -> StoreResult<MemoryTransaction> {
        let slot = self.slot(owner_id)?;
        let guard = Arc::clone(&slot).lock_owned().await;
        debug!(owner_id = %owner_id, "Memory unit of work started");

        Ok(MemoryTransaction {
            owner_id: owner_id.to_string(),
            registry: Arc::clone(&self.slots),
            slot,
            guard,
            staged: None,
            catalog: self.catalog.clone(),
            products: None,
        })
    }
}

// =============================================================================
// Memory Transaction
// =============================================================================

#[derive(Debug)]
enum Staged {
    Put(Cart),
    Delete,
}

/// Unit of work over one owner's slot.
#[derive(Debug)]
pub struct MemoryTransaction {
    owner_id: String,
    registry: Registry,
    slot: Slot,
    guard: OwnedMutexGuard<Option<Cart>>,
    staged: Option<Staged>,
    catalog: MemoryCatalog,
    products: Option<OwnedRwLockReadGuard<Products>>,
}

impl MemoryTransaction {
    /// The cart as this unit of work sees it (staged writes included).
    fn current(&self) -> Option<&Cart> {
        match &self.staged {
            Some(Staged::Put(cart)) => Some(cart),
            Some(Staged::Delete) => None,
            None => self.guard.as_ref(),
        }
    }

    fn check_owner(&self, owner_id: &str) -> StoreResult<()> {
        if owner_id != self.owner_id {
            return Err(StoreError::OwnerMismatch {
                expected: self.owner_id.clone(),
                found: owner_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CartTransaction for MemoryTransaction {
    async fn product_by_id(&mut self, product_id: &str) -> StoreResult<Option<Product>> {
        let products = match self.products.take() {
            Some(guard) => guard,
            None => self.catalog.read_owned().await,
        };
        let found = products.get(product_id).cloned();
        self.products = Some(products);
        Ok(found)
    }

    async fn find_by_owner(&mut self, owner_id: &str) -> StoreResult<Option<Cart>> {
        self.check_owner(owner_id)?;
        Ok(self.current().cloned())
    }

    async fn insert(&mut self, cart: &Cart) -> StoreResult<()> {
        self.check_owner(&cart.owner_id)?;
        if self.current().is_some() {
            return Err(StoreError::AlreadyExists(cart.owner_id.clone()));
        }
        self.staged = Some(Staged::Put(cart.clone()));
        Ok(())
    }

    async fn replace(
        &mut self,
        owner_id: &str,
        lines: &[CartLine],
        total_cents: i64,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.check_owner(owner_id)?;
        let mut cart = self
            .current()
            .cloned()
            .ok_or_else(|| StoreError::Missing(owner_id.to_string()))?;

        cart.lines = lines.to_vec();
        cart.total_cents = total_cents;
        cart.updated_at = updated_at;
        cart.version += 1;
        self.staged = Some(Staged::Put(cart));
        Ok(())
    }

    async fn delete(&mut self, owner_id: &str) -> StoreResult<()> {
        self.check_owner(owner_id)?;
        if self.current().is_none() {
            return Err(StoreError::Missing(owner_id.to_string()));
        }
        self.staged = Some(Staged::Delete);
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        match self.staged.take() {
            Some(Staged::Put(cart)) => *self.guard = Some(cart),
            Some(Staged::Delete) => *self.guard = None,
            None => {}
        }
        debug!(owner_id = %self.owner_id, "Memory unit of work committed");
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if self.guard.is_some() {
            return;
        }
        let Ok(mut slots) = self.registry.lock() else {
            return;
        };
        // Handles: the registry entry, `self.slot` and the guard.
        let unshared = Arc::strong_count(&self.slot) == 3;
        let current = slots
            .get(&self.owner_id)
            .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot));
        if unshared && current {
            slots.remove(&self.owner_id);
        }
    }
}

// =============================================================================
// Memory Catalog
// =============================================================================

/// In-process product catalog. Cloning shares the underlying products.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: Arc<RwLock<Products>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a product as-is.
    pub async fn put(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    /// Creates a product with a fresh id. Slugs must be unique.
    pub async fn create(&self, input: NewProduct) -> Result<Product, ValidationError> {
        let product = input.into_product(Uuid::new_v4().to_string(), Utc::now())?;

        let mut products = self.products.write().await;
        if products.values().any(|p| p.slug == product.slug) {
            return Err(ValidationError::Duplicate {
                field: "slug".to_string(),
                value: product.slug,
            });
        }
        products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    /// Applies a sparse patch. Returns `None` when the product is unknown.
    pub async fn apply_patch(
        &self,
        product_id: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, ValidationError> {
        patch.validate()?;

        let mut products = self.products.write().await;
        Ok(products.get_mut(product_id).map(|product| {
            patch.apply_to(product, Utc::now());
            product.clone()
        }))
    }

    /// Removes a product.
    pub async fn remove(&self, product_id: &str) -> Option<Product> {
        self.products.write().await.remove(product_id)
    }

    /// Finds a product by id.
    pub async fn get_by_id(&self, product_id: &str) -> Option<Product> {
        self.products.read().await.get(product_id).cloned()
    }

    /// Returns one page of products, newest first.
    pub async fn list(&self, page: PageRequest) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(newest_first);

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        products
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .collect()
    }

    async fn read_owned(&self) -> OwnedRwLockReadGuard<Products> {
        Arc::clone(&self.products).read_owned().await
    }

    /// Finds a product by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Option<Product> {
        self.products
            .read()
            .await
            .values()
            .find(|p| p.slug == slug)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
