//! # Cart Store
//!
//! The shared cart state: single writer, startup hydration, asynchronous
//! best-effort persistence, watch-based change notification.
//!
//! ## Store Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CartStore Architecture                            │
//! │                                                                         │
//! │  add / increment / decrement (synchronous in-memory mutation)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Mutex<Cart> ── mutate ── clone post-mutation snapshot          │   │
//! │  │       │                                                         │   │
//! │  │       ├──► view channel (watch) ──► subscribers re-render       │   │
//! │  │       │                                                         │   │
//! │  │       └──► persist channel (watch, coalescing)                  │   │
//! │  │                  │                                              │   │
//! │  │                  ▼                                              │   │
//! │  │         background writer task                                  │   │
//! │  │         serialize latest snapshot ──► KvStore::set(fixed key)  │   │
//! │  │         (failure: warn + keep in-memory state)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ORDERING: the watch channel only ever holds the LATEST snapshot,      │
//! │  so a burst of commands collapses to one write and the most recently   │
//! │  issued state wins on the storage key. The snapshot handed to the      │
//! │  writer is always the post-mutation state cloned under the lock -      │
//! │  a stale pre-mutation capture cannot be expressed here.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! The cart sits behind a `std::sync::Mutex` that is never held across an
//! await point: reading and computing the next state is synchronous and
//! atomic from the caller's perspective, and the snapshot fan-out happens
//! under the same lock so committed snapshots reach the writer in order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use cart_core::{Cart, LineItem, Mutation, NewLineItem};

use crate::error::{StoreError, StoreResult};
use crate::kv::KvStore;

/// Fixed storage key for the cart snapshot, namespaced to the application.
pub const CART_STORAGE_KEY: &str = "marketplace:cart";

// =============================================================================
// Shared State
// =============================================================================

/// A committed snapshot queued for the persistence writer.
///
/// `seq` is the commit sequence number; the writer acknowledges it after
/// attempting the write so `flush` can tell when everything issued so far
/// has been processed.
#[derive(Debug, Clone)]
struct PersistRequest {
    seq: u64,
    snapshot: Cart,
}

/// State shared between the store, its handles, and its background tasks.
#[derive(Debug)]
struct Inner {
    /// Current cart state. Locked only for synchronous sections.
    cart: Mutex<Cart>,

    /// Commit sequence counter (0 = nothing committed yet).
    seq: AtomicU64,

    /// Committed snapshots for subscribers.
    view_tx: watch::Sender<Cart>,

    /// Latest dirty snapshot for the persistence writer. watch coalesces,
    /// which is exactly the last-write-wins contract on the storage key.
    persist_tx: watch::Sender<PersistRequest>,

    /// Highest sequence number the writer has processed.
    acked_rx: watch::Receiver<u64>,

    /// Whether startup hydration has completed (possibly with an empty cart).
    hydrated_rx: watch::Receiver<bool>,
}

impl Inner {
    /// Applies a mutation and, if it changed the cart, commits the
    /// post-mutation snapshot to subscribers and the persistence writer.
    ///
    /// The sequence bump and both sends happen under the lock so that two
    /// back-to-back commands cannot hand the writer snapshots out of order.
    /// `Unchanged` mutations commit nothing: no new snapshot, no write.
    fn apply<F>(&self, mutate: F) -> Mutation
    where
        F: FnOnce(&mut Cart) -> Mutation,
    {
        let mut cart = self.cart.lock().expect("cart mutex poisoned");
        let outcome = mutate(&mut cart);

        if outcome.is_changed() {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
            let snapshot = cart.clone();
            self.view_tx.send_replace(snapshot.clone());
            self.persist_tx.send_replace(PersistRequest { seq, snapshot });
        }

        outcome
    }

    /// Replaces the cart with a hydrated snapshot and notifies subscribers.
    ///
    /// Hydrated state came *from* storage, so it is not queued for
    /// persistence. It installs over whatever is in memory - commands issued
    /// while the load was in flight are superseded (last write wins).
    fn install(&self, hydrated: Cart) {
        let mut cart = self.cart.lock().expect("cart mutex poisoned");
        *cart = hydrated;
        self.view_tx.send_replace(cart.clone());
    }

    fn cart(&self) -> Cart {
        self.cart.lock().expect("cart mutex poisoned").clone()
    }
}

// =============================================================================
// Cart Store
// =============================================================================

/// The owning cart store.
///
/// Exclusively owns the cart state; consumers receive a read view (snapshot
/// or subscription) plus the three commands - there is no other mutation
/// path. Dropping the store stops the background writer and detaches every
/// outstanding [`CartHandle`].
#[derive(Debug)]
pub struct CartStore {
    inner: Arc<Inner>,
}

impl CartStore {
    /// Opens a cart store over the given storage.
    ///
    /// ## Initialization Protocol
    /// The store starts with an empty cart and spawns a fire-and-forget
    /// hydration task that loads the snapshot under [`CART_STORAGE_KEY`].
    /// Opening never fails and never blocks on storage: a missing key, an
    /// unreadable store, or an undeserializable snapshot all leave the cart
    /// empty (logged at warn, not surfaced). Hydration is visible to
    /// consumers only as a state update, observable via [`CartStore::subscribe`]
    /// or awaited with [`CartStore::wait_hydrated`].
    ///
    /// Must be called within a Tokio runtime (background tasks are spawned).
    pub fn open(storage: KvStore) -> Self {
        let (view_tx, _) = watch::channel(Cart::new());
        let (persist_tx, persist_rx) = watch::channel(PersistRequest {
            seq: 0,
            snapshot: Cart::new(),
        });
        let (acked_tx, acked_rx) = watch::channel(0u64);
        let (hydrated_tx, hydrated_rx) = watch::channel(false);

        let inner = Arc::new(Inner {
            cart: Mutex::new(Cart::new()),
            seq: AtomicU64::new(0),
            view_tx,
            persist_tx,
            acked_rx,
            hydrated_rx,
        });

        tokio::spawn(persist_loop(storage.clone(), persist_rx, acked_tx));
        tokio::spawn(hydrate(storage, Arc::downgrade(&inner), hydrated_tx));

        CartStore { inner }
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Adds a product to the cart.
    ///
    /// An id already in the cart behaves exactly like [`CartStore::increment`]:
    /// no duplicate entry, no error. The in-memory update is synchronous and
    /// immediately visible; the durable write happens in the background
    /// (best-effort, last-write-wins).
    pub fn add(&self, item: NewLineItem) -> Mutation {
        debug!(id = %item.id, "add command");
        self.inner.apply(|cart| cart.add(item))
    }

    /// Increments the quantity of the item with the given id.
    ///
    /// Unknown id: silent no-op - no state change and **no persistence
    /// write** is issued.
    pub fn increment(&self, id: &str) -> Mutation {
        debug!(id = %id, "increment command");
        self.inner.apply(|cart| cart.increment(id))
    }

    /// Decrements the quantity of the item with the given id.
    ///
    /// A quantity-1 item is removed entirely. Unknown id: silent no-op,
    /// no persistence write.
    pub fn decrement(&self, id: &str) -> Mutation {
        debug!(id = %id, "decrement command");
        self.inner.apply(|cart| cart.decrement(id))
    }

    // -------------------------------------------------------------------------
    // Read Surface
    // -------------------------------------------------------------------------

    /// Returns a snapshot of the current line items, in insertion order.
    pub fn items(&self) -> Vec<LineItem> {
        self.inner.cart().items().to_vec()
    }

    /// Returns a snapshot of the current cart.
    pub fn cart(&self) -> Cart {
        self.inner.cart()
    }

    /// Subscribes to committed cart snapshots.
    ///
    /// Every committed mutation (and a successful hydration) publishes a new
    /// snapshot; the receiver always observes the latest state. This is the
    /// re-render hook for view layers.
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.view_tx.subscribe()
    }

    /// Returns a cloneable consumer handle.
    ///
    /// Handles hold a weak reference: once this store is dropped, every
    /// handle operation fails with [`StoreError::Detached`] rather than
    /// pretending an empty cart exists.
    pub fn handle(&self) -> CartHandle {
        CartHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // -------------------------------------------------------------------------
    // Synchronization Aids
    // -------------------------------------------------------------------------

    /// Whether startup hydration has completed (possibly finding nothing).
    pub fn is_hydrated(&self) -> bool {
        *self.inner.hydrated_rx.borrow()
    }

    /// Waits until startup hydration has completed.
    pub async fn wait_hydrated(&self) {
        let mut rx = self.inner.hydrated_rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Waits until the persistence writer has processed every write issued
    /// so far.
    ///
    /// "Processed" means attempted: a failed write is logged and
    /// acknowledged, because persistence is best-effort and the in-memory
    /// state is never rolled back. Useful before shutdown and in tests.
    pub async fn flush(&self) {
        let target = self.inner.seq.load(Ordering::SeqCst);
        let mut rx = self.inner.acked_rx.clone();
        while *rx.borrow_and_update() < target {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

// =============================================================================
// Consumer Handle
// =============================================================================

/// A cloneable consumer-facing handle to a [`CartStore`].
///
/// Mirrors the store's command and read surface, but holds only a weak
/// reference: using a handle after the owning store is gone is a wiring
/// mistake and fails loudly with [`StoreError::Detached`] on every call.
#[derive(Debug, Clone)]
pub struct CartHandle {
    inner: Weak<Inner>,
}

impl CartHandle {
    fn strong(&self) -> StoreResult<Arc<Inner>> {
        self.inner.upgrade().ok_or(StoreError::Detached)
    }

    /// Adds a product to the cart. See [`CartStore::add`].
    pub fn add(&self, item: NewLineItem) -> StoreResult<Mutation> {
        debug!(id = %item.id, "add command (handle)");
        Ok(self.strong()?.apply(|cart| cart.add(item)))
    }

    /// Increments an item's quantity. See [`CartStore::increment`].
    pub fn increment(&self, id: &str) -> StoreResult<Mutation> {
        debug!(id = %id, "increment command (handle)");
        Ok(self.strong()?.apply(|cart| cart.increment(id)))
    }

    /// Decrements an item's quantity. See [`CartStore::decrement`].
    pub fn decrement(&self, id: &str) -> StoreResult<Mutation> {
        debug!(id = %id, "decrement command (handle)");
        Ok(self.strong()?.apply(|cart| cart.decrement(id)))
    }

    /// Returns a snapshot of the current line items.
    pub fn items(&self) -> StoreResult<Vec<LineItem>> {
        Ok(self.strong()?.cart().items().to_vec())
    }

    /// Subscribes to committed cart snapshots.
    pub fn subscribe(&self) -> StoreResult<watch::Receiver<Cart>> {
        Ok(self.strong()?.view_tx.subscribe())
    }
}

// =============================================================================
// Background Tasks
// =============================================================================

/// Loads the persisted snapshot and installs it as the current state.
///
/// Every failure path recovers as "empty cart": hydration must never fail
/// the store, only log. Marks the store hydrated in all cases.
async fn hydrate(storage: KvStore, inner: Weak<Inner>, hydrated_tx: watch::Sender<bool>) {
    let snapshot = match storage.get(CART_STORAGE_KEY).await {
        Ok(Some(raw)) => match serde_json::from_str::<Cart>(&raw) {
            Ok(cart) => Some(cart),
            Err(err) => {
                warn!(error = %err, "Stored cart snapshot is unreadable, starting empty");
                None
            }
        },
        Ok(None) => {
            debug!("No stored cart snapshot, starting empty");
            None
        }
        Err(err) => {
            warn!(error = %err, "Could not load cart snapshot, starting empty");
            None
        }
    };

    let Some(inner) = inner.upgrade() else {
        // Store dropped before hydration finished; nothing to install.
        return;
    };

    if let Some(cart) = snapshot {
        info!(items = cart.len(), "Cart hydrated from storage");
        inner.install(cart);
    }

    let _ = hydrated_tx.send(true);
}

/// Background persistence writer.
///
/// Waits for a committed snapshot, serializes it, and writes it under the
/// fixed key. The watch channel hands over only the latest snapshot, so a
/// burst of commands collapses into one write and the most recently issued
/// state wins. Failures are logged and acknowledged - the in-memory cart is
/// never rolled back and no command ever observes the failure.
///
/// Exits when the store (the only sender) is dropped.
async fn persist_loop(
    storage: KvStore,
    mut requests: watch::Receiver<PersistRequest>,
    acked_tx: watch::Sender<u64>,
) {
    while requests.changed().await.is_ok() {
        let request = requests.borrow_and_update().clone();

        match serde_json::to_string(&request.snapshot) {
            Ok(payload) => {
                if let Err(err) = storage.set(CART_STORAGE_KEY, &payload).await {
                    warn!(
                        seq = request.seq,
                        error = %err,
                        "Cart snapshot write failed; in-memory state kept"
                    );
                } else {
                    debug!(seq = request.seq, "Cart snapshot persisted");
                }
            }
            Err(err) => {
                warn!(seq = request.seq, error = %err, "Cart snapshot serialization failed");
            }
        }

        let _ = acked_tx.send(request.seq);
    }

    debug!("Persistence writer stopped");
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvConfig;

    fn descriptor(id: &str, price: f64) -> NewLineItem {
        NewLineItem {
            id: id.to_string(),
            title: format!("Product {}", id),
            image_url: format!("https://example.com/{}.png", id),
            price,
        }
    }

    async fn open_store() -> (CartStore, KvStore) {
        let kv = KvStore::connect(KvConfig::in_memory()).await.unwrap();
        let store = CartStore::open(kv.clone());
        store.wait_hydrated().await;
        (store, kv)
    }

    async fn stored_snapshot(kv: &KvStore) -> Option<Cart> {
        kv.get(CART_STORAGE_KEY)
            .await
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[tokio::test]
    async fn test_add_to_empty_cart() {
        let (store, _kv) = open_store().await;

        store.add(descriptor("A", 10.0));

        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "A");
        assert_eq!(items[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_add_existing_id_increments() {
        let (store, _kv) = open_store().await;

        store.add(descriptor("A", 10.0));
        store.add(descriptor("A", 10.0));

        let items = store.items();
        assert_eq!(items.len(), 1); // no duplicate entry
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_decrement_to_zero_removes_item() {
        let (store, _kv) = open_store().await;

        store.add(descriptor("A", 10.0));
        store.decrement("A");

        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_persisted_snapshot_matches_memory_after_flush() {
        let (store, kv) = open_store().await;

        store.add(descriptor("A", 10.0));
        store.add(descriptor("B", 5.0));
        store.increment("A");
        store.flush().await;

        assert_eq!(stored_snapshot(&kv).await, Some(store.cart()));
    }

    #[tokio::test]
    async fn test_noop_commands_issue_no_write() {
        let (store, kv) = open_store().await;

        store.add(descriptor("A", 10.0));
        store.flush().await;
        let before = stored_snapshot(&kv).await;

        assert_eq!(store.increment("Z"), Mutation::Unchanged);
        assert_eq!(store.decrement("Z"), Mutation::Unchanged);
        store.flush().await;

        // State and durable snapshot both untouched.
        assert_eq!(store.items().len(), 1);
        assert_eq!(stored_snapshot(&kv).await, before);
    }

    #[tokio::test]
    async fn test_burst_of_commands_persists_latest_state() {
        let (store, kv) = open_store().await;

        // No awaits between commands: each must see the latest in-memory
        // state and the writer must end up with the final snapshot.
        store.add(descriptor("A", 10.0));
        store.add(descriptor("B", 5.0));
        store.increment("A");
        store.decrement("B");
        store.flush().await;

        assert_eq!(stored_snapshot(&kv).await, Some(store.cart()));
        assert_eq!(store.cart().quantity_of("A"), Some(2));
        assert!(!store.cart().contains("B"));
    }

    #[tokio::test]
    async fn test_hydration_restores_persisted_cart() {
        let kv = KvStore::connect(KvConfig::in_memory()).await.unwrap();

        let seeded = {
            let mut cart = Cart::new();
            cart.add(descriptor("A", 10.0));
            cart.add(descriptor("B", 5.0));
            cart.increment("B");
            cart
        };
        kv.set(CART_STORAGE_KEY, &serde_json::to_string(&seeded).unwrap())
            .await
            .unwrap();

        let store = CartStore::open(kv);
        store.wait_hydrated().await;

        assert_eq!(store.cart(), seeded);
    }

    #[tokio::test]
    async fn test_hydration_of_garbage_starts_empty() {
        let kv = KvStore::connect(KvConfig::in_memory()).await.unwrap();
        kv.set(CART_STORAGE_KEY, "definitely not json").await.unwrap();

        let store = CartStore::open(kv);
        store.wait_hydrated().await;

        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_commands_work_before_hydration_completes() {
        // Hydration is fire-and-forget; a command racing it must operate
        // correctly against the (possibly still empty) current state.
        let kv = KvStore::connect(KvConfig::in_memory()).await.unwrap();
        let store = CartStore::open(kv);

        store.add(descriptor("A", 10.0));

        assert_eq!(store.cart().quantity_of("A"), Some(1));
    }

    #[tokio::test]
    async fn test_subscribers_observe_each_mutation() {
        let (store, _kv) = open_store().await;
        let mut rx = store.subscribe();

        store.add(descriptor("A", 10.0));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().quantity_of("A"), Some(1));

        store.increment("A");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().quantity_of("A"), Some(2));
    }

    #[tokio::test]
    async fn test_handle_mirrors_store_commands() {
        let (store, _kv) = open_store().await;
        let handle = store.handle();

        handle.add(descriptor("A", 10.0)).unwrap();
        handle.increment("A").unwrap();

        assert_eq!(store.cart().quantity_of("A"), Some(2));
        assert_eq!(handle.items().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detached_handle_fails_loudly() {
        let (store, _kv) = open_store().await;
        let handle = store.handle();
        drop(store);

        assert!(matches!(
            handle.add(descriptor("A", 10.0)),
            Err(StoreError::Detached)
        ));
        assert!(matches!(handle.items(), Err(StoreError::Detached)));
    }

    #[tokio::test]
    async fn test_flush_with_no_mutations_returns_immediately() {
        let (store, _kv) = open_store().await;
        store.flush().await;
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory_and_never_blocks_commands() {
        let (store, kv) = open_store().await;

        // Storage goes away mid-session: every subsequent write fails.
        kv.close().await;

        store.add(descriptor("A", 10.0));
        store.increment("A");

        // The in-memory mutation is not rolled back and the cart stays
        // usable; the failed writes are acknowledged, so flush returns
        // instead of hanging.
        assert_eq!(store.cart().quantity_of("A"), Some(2));
        store.flush().await;
        assert_eq!(store.cart().quantity_of("A"), Some(2));
    }

    #[tokio::test]
    async fn test_hydration_over_unavailable_storage_starts_empty() {
        let kv = KvStore::connect(KvConfig::in_memory()).await.unwrap();
        kv.close().await;

        // An unreadable store at startup is treated as "no data": the
        // store opens with an empty cart and still accepts commands.
        let store = CartStore::open(kv);
        store.wait_hydrated().await;

        assert!(store.items().is_empty());
        store.add(descriptor("A", 10.0));
        assert_eq!(store.cart().quantity_of("A"), Some(1));
    }
}
