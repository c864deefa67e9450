//! # shopcart-engine: Cart Mutation Engine
//!
//! Runs add/update/remove/clear/get against any store that can open a unit
//! of work per owner.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          shopcart-engine                                │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │   CartEngine     │   │   store traits   │   │  MemoryStore     │    │
//! │  │   (engine.rs)    │──►│   (store.rs)     │◄──│  MemoryCatalog   │    │
//! │  │                  │   │                  │   │  (memory.rs)     │    │
//! │  │  5 operations,   │   │  CartStore       │   │                  │    │
//! │  │  1 tx each       │   │  CartTransaction │   │  per-owner       │    │
//! │  │                  │   │  (product reads) │   │  async mutexes   │    │
//! │  └──────────────────┘   └──────────────────┘   └──────────────────┘    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐                            │
//! │  │   ShopConfig     │   │   telemetry      │                            │
//! │  │   (config.rs)    │   │  init_tracing()  │                            │
//! │  └──────────────────┘   └──────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The SQLite implementation of the store traits lives in `shopcart-db`.

pub mod config;
pub mod engine;
pub mod memory;
pub mod store;
pub mod telemetry;

pub use config::{
    ConfigError, ConfigResult, DatabaseSettings, EngineSettings, LoggingSettings, ShopConfig,
};
pub use engine::CartEngine;
pub use memory::{MemoryCatalog, MemoryStore, MemoryTransaction};
pub use store::{CartStore, CartTransaction, StoreError, StoreResult};
pub use telemetry::init_tracing;
