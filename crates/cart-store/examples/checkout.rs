//! Minimal consumer wiring: open storage, hydrate the cart, issue a few
//! commands, and leave a snapshot behind for the next run.
//!
//! Run twice to see hydration pick up the previous session's cart:
//! ```text
//! cargo run -p cart-store --example checkout
//! RUST_LOG=debug cargo run -p cart-store --example checkout
//! ```

use cart_core::NewLineItem;
use cart_store::{CartStore, KvConfig, KvStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,cart_store=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let kv = KvStore::connect(KvConfig::new("./cart.db")).await?;
    let store = CartStore::open(kv);
    store.wait_hydrated().await;

    info!(items = store.items().len(), "Cart hydrated");

    store.add(NewLineItem {
        id: "sku-1".into(),
        title: "Widget".into(),
        image_url: "https://example.com/widget.png".into(),
        price: 10.0,
    });
    store.increment("sku-1");

    for item in store.items() {
        println!("{} x{} @ {}", item.title, item.quantity, item.price);
    }

    // Make sure the snapshot reaches the database before exiting.
    store.flush().await;

    Ok(())
}
