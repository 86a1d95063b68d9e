//! # cart-store: Stateful Cart Store for Market Cart
//!
//! This crate provides the shared cart state and its persistent backing
//! storage. It uses SQLite (via sqlx) as a local key-value store holding
//! one serialized cart snapshot under a fixed key.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Market Cart Data Flow                             │
//! │                                                                         │
//! │  Consumer command (add / increment / decrement)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cart-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   CartStore   │    │    KvStore    │    │  Migrations  │  │   │
//! │  │   │  (store.rs)   │    │    (kv.rs)    │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ single writer │───►│ get/set under │    │ 001_kv_store │  │   │
//! │  │   │ watch fan-out │    │ a fixed key   │    │     .sql     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: for tests)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`kv`] - SQLite-backed key-value storage (pool, config, migrations)
//! - [`store`] - `CartStore` / `CartHandle` (hydration, commands, persistence)
//! - [`error`] - Storage and store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cart_core::NewLineItem;
//! use cart_store::{CartStore, KvConfig, KvStore};
//!
//! let kv = KvStore::connect(KvConfig::new("path/to/cart.db")).await?;
//! let store = CartStore::open(kv);
//!
//! store.add(NewLineItem { /* ... */ });
//! let items = store.items();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod kv;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{KvError, StoreError};
pub use kv::{KvConfig, KvStore};
pub use store::{CartHandle, CartStore, CART_STORAGE_KEY};
