//! # Cart Data Model
//!
//! The cart and its three mutations.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Mutations                                    │
//! │                                                                         │
//! │  Consumer Action           Mutation              Cart Change            │
//! │  ───────────────           ────────              ───────────            │
//! │                                                                         │
//! │  Pick product ───────────► add(item) ──────────► append qty 1, or      │
//! │                                                  qty += 1 if present    │
//! │                                                                         │
//! │  Press "+" ──────────────► increment(id) ──────► qty += 1              │
//! │                                                  (unknown id: no-op)    │
//! │                                                                         │
//! │  Press "-" ──────────────► decrement(id) ──────► qty -= 1, or          │
//! │                                                  remove item at qty 1   │
//! │                                                  (unknown id: no-op)    │
//! │                                                                         │
//! │  NOTE: Every mutation reports whether it changed anything, so the       │
//! │        store layer knows whether a persistence write is due.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Items are unique by `id` (adding the same product increments quantity)
//! - Quantity is always >= 1 (decrementing a quantity-1 item removes it)
//! - Insertion order is preserved; increment/decrement never reorder

use serde::{Deserialize, Serialize};

// =============================================================================
// Line Item
// =============================================================================

/// One product entry in the cart.
///
/// ## Design Notes
/// - `id`: the lookup key, stable across sessions
/// - `title`, `image_url`, `price`: opaque display data owned by the caller.
///   The cart never computes on or validates `price`; pricing and tax are
///   external concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique product identifier, used as the lookup key.
    pub id: String,

    /// Display name (opaque to the cart).
    pub title: String,

    /// Display image location (opaque to the cart).
    pub image_url: String,

    /// Unit price; currency unit implied by the caller. Never computed on.
    pub price: f64,

    /// Quantity in cart. Always >= 1 while the item exists.
    pub quantity: u32,
}

/// A product descriptor for [`Cart::add`] - a [`LineItem`] without quantity.
///
/// The cart assigns `quantity = 1` on first add; adding an id that is
/// already present behaves exactly like [`Cart::increment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLineItem {
    /// Unique product identifier.
    pub id: String,

    /// Display name.
    pub title: String,

    /// Display image location.
    pub image_url: String,

    /// Unit price (opaque display data).
    pub price: f64,
}

impl NewLineItem {
    /// Converts the descriptor into a line item with quantity 1.
    fn into_line_item(self) -> LineItem {
        LineItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity: 1,
        }
    }
}

// =============================================================================
// Mutation Outcome
// =============================================================================

/// Outcome of a cart mutation.
///
/// Unknown ids on increment/decrement are defined as silent no-ops, not
/// failures, so mutations report an outcome instead of returning a `Result`.
/// `Unchanged` means the store layer must not issue a persistence write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The cart changed; a new snapshot should be published and persisted.
    Changed,

    /// Nothing happened (unknown id); no snapshot, no write.
    Unchanged,
}

impl Mutation {
    /// Returns `true` if the mutation changed the cart.
    pub fn is_changed(self) -> bool {
        self == Mutation::Changed
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart: an ordered collection of line items, unique by `id`.
///
/// ## Snapshot Wire Format
/// Serializes transparently as a JSON array of line item records
/// (`id`, `title`, `image_url`, `price`, `quantity`) - the exact payload
/// written to durable storage. No schema versioning; changing the record
/// shape requires an external migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Returns the line items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the number of unique items in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks whether an item with the given id is in the cart.
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Returns the quantity of the item with the given id, if present.
    pub fn quantity_of(&self, id: &str) -> Option<u32> {
        self.items.iter().find(|item| item.id == id).map(|item| item.quantity)
    }

    /// Returns the total quantity of all items.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Adds a product to the cart.
    ///
    /// ## Behavior
    /// - If the id is already in the cart: equivalent to [`Cart::increment`] -
    ///   no duplicate entry is created, order is unchanged.
    /// - Otherwise: appends a new line item with quantity 1 at the end,
    ///   preserving the order of prior items.
    ///
    /// Never fails; an id collision is an increment, not an error.
    pub fn add(&mut self, item: NewLineItem) -> Mutation {
        if self.contains(&item.id) {
            return self.increment(&item.id);
        }

        self.items.push(item.into_line_item());
        Mutation::Changed
    }

    /// Increments the quantity of the item with the given id.
    ///
    /// Unknown id: silent no-op (`Unchanged`). All other items and their
    /// relative order are untouched.
    pub fn increment(&mut self, id: &str) -> Mutation {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.quantity += 1;
                Mutation::Changed
            }
            None => Mutation::Unchanged,
        }
    }

    /// Decrements the quantity of the item with the given id.
    ///
    /// ## Behavior
    /// - Quantity exactly 1: the item is removed entirely (quantity 0 must
    ///   never exist), order of the remaining items preserved.
    /// - Otherwise: quantity -= 1.
    /// - Unknown id: silent no-op (`Unchanged`).
    pub fn decrement(&mut self, id: &str) -> Mutation {
        let Some(position) = self.items.iter().position(|item| item.id == id) else {
            return Mutation::Unchanged;
        };

        if self.items[position].quantity == 1 {
            self.items.remove(position);
        } else {
            self.items[position].quantity -= 1;
        }

        Mutation::Changed
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, price: f64) -> NewLineItem {
        NewLineItem {
            id: id.to_string(),
            title: format!("Product {}", id),
            image_url: format!("https://example.com/{}.png", id),
            price,
        }
    }

    #[test]
    fn test_add_appends_with_quantity_one() {
        let mut cart = Cart::new();

        assert_eq!(cart.add(descriptor("A", 10.0)), Mutation::Changed);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].id, "A");
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_add_existing_id_increments_without_duplicate() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.0));

        assert_eq!(cart.add(descriptor("A", 10.0)), Mutation::Changed);

        assert_eq!(cart.len(), 1); // Still one unique item
        assert_eq!(cart.quantity_of("A"), Some(2));
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 1.0));
        cart.add(descriptor("B", 2.0));
        cart.add(descriptor("C", 3.0));
        cart.add(descriptor("B", 2.0)); // increment, must not move B

        let ids: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_increment_unknown_id_is_noop() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.0));
        let before = cart.clone();

        assert_eq!(cart.increment("Z"), Mutation::Unchanged);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_decrement_unknown_id_is_noop() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.0));
        let before = cart.clone();

        assert_eq!(cart.decrement("Z"), Mutation::Unchanged);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_decrement_at_quantity_one_removes_item() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.0));

        assert_eq!(cart.decrement("A"), Mutation::Changed);

        assert!(cart.is_empty());
        assert!(!cart.contains("A"));
    }

    #[test]
    fn test_decrement_above_one_lowers_quantity() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.0));
        cart.increment("A");
        assert_eq!(cart.quantity_of("A"), Some(2));

        cart.decrement("A");

        assert_eq!(cart.quantity_of("A"), Some(1));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_decrement_preserves_order_of_remaining_items() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 1.0));
        cart.add(descriptor("B", 2.0));
        cart.add(descriptor("C", 3.0));

        cart.decrement("B"); // quantity 1, removed entirely

        let ids: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_quantities_never_below_one() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 1.0));
        cart.add(descriptor("B", 2.0));
        cart.increment("A");
        cart.decrement("A");
        cart.decrement("B");

        for item in cart.items() {
            assert!(item.quantity >= 1);
        }
    }

    #[test]
    fn test_no_duplicate_ids_across_command_sequences() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 1.0));
        cart.add(descriptor("B", 2.0));
        cart.add(descriptor("A", 1.0));
        cart.decrement("A");
        cart.add(descriptor("A", 1.0));
        cart.increment("B");

        let mut ids: Vec<&str> = cart.items().iter().map(|item| item.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), cart.len());
    }

    #[test]
    fn test_total_quantity() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 1.0));
        cart.add(descriptor("A", 1.0));
        cart.add(descriptor("B", 2.0));

        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.5));
        cart.increment("A");

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "id": "A",
                "title": "Product A",
                "image_url": "https://example.com/A.png",
                "price": 10.5,
                "quantity": 2
            }])
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cart = Cart::new();
        cart.add(descriptor("A", 10.0));
        cart.add(descriptor("B", 5.0));
        cart.increment("B");

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, cart);
    }
}
