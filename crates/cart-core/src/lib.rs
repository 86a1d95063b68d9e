//! # cart-core: Pure Cart Logic for Market Cart
//!
//! This crate is the **heart** of Market Cart. It contains the cart data
//! model and its three mutations as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Market Cart Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Consumers (rendering / view layers)               │   │
//! │  │      read line items ──► issue add / increment / decrement     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cart-store (stateful component)                 │   │
//! │  │        single writer • hydration • async persistence           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ cart-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌──────────────────────────┐  │   │
//! │  │   │ LineItem  │  │   Cart    │  │        Mutation          │  │   │
//! │  │   │NewLineItem│  │ add / inc │  │   Changed / Unchanged    │  │   │
//! │  │   └───────────┘  │   / dec   │  └──────────────────────────┘  │   │
//! │  │                  └───────────┘                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every mutation is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Opaque Price**: `price` is display data; this crate never computes on it
//! 4. **No-ops, Not Errors**: unknown ids on increment/decrement are silent no-ops
//!
//! ## Example Usage
//!
//! ```rust
//! use cart_core::{Cart, Mutation, NewLineItem};
//!
//! let mut cart = Cart::new();
//! cart.add(NewLineItem {
//!     id: "sku-1".into(),
//!     title: "Widget".into(),
//!     image_url: "https://example.com/widget.png".into(),
//!     price: 10.0,
//! });
//!
//! assert_eq!(cart.quantity_of("sku-1"), Some(1));
//! assert_eq!(cart.increment("sku-404"), Mutation::Unchanged);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cart_core::Cart` instead of
// `use cart_core::cart::Cart`

pub use cart::{Cart, LineItem, Mutation, NewLineItem};
