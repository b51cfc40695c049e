//! Shared helpers for `OrderCore` integration tests.
//!
//! The tests in `tests/` exercise the engine against the in-memory store,
//! covering the concurrency, atomicity and authorization properties that
//! span both crates.

#![forbid(unsafe_code)]

use ordercore::engine::{LineItem, OrderEngine, PlaceOrderRequest};
use ordercore::product::Product;
use ordercore::types::{
    Money, ProductId, Quantity, Requester, Role, ShippingAddress, UserId,
};
use ordercore_memory::InMemoryStore;
use std::sync::Arc;

/// An engine over a fresh in-memory store, plus the store for seeding.
pub fn engine() -> (OrderEngine<InMemoryStore>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (OrderEngine::new(Arc::clone(&store)), store)
}

/// Seeds an active product with the given price (in cents) and stock.
pub fn seed_product(store: &InMemoryStore, price_cents: u64, stock: u32) -> ProductId {
    let product = Product::new(
        ProductId::generate(),
        Money::from_cents(price_cents).expect("valid price"),
        stock,
        true,
    )
    .expect("valid product");
    let id = product.id;
    store.insert_product(product);
    id
}

/// Seeds an inactive product.
pub fn seed_inactive_product(store: &InMemoryStore, price_cents: u64, stock: u32) -> ProductId {
    let product = Product::new(
        ProductId::generate(),
        Money::from_cents(price_cents).expect("valid price"),
        stock,
        false,
    )
    .expect("valid product");
    let id = product.id;
    store.insert_product(product);
    id
}

/// A customer requester with a fresh user id.
pub fn customer() -> Requester {
    Requester::new(UserId::generate(), Role::Customer)
}

/// An admin requester with a fresh user id.
pub fn admin() -> Requester {
    Requester::new(UserId::generate(), Role::Admin)
}

/// A single-line placement request.
pub fn single_line_request(product_id: ProductId, quantity: u32) -> PlaceOrderRequest {
    request(&[(product_id, quantity)])
}

/// A placement request over the given `(product, quantity)` lines.
pub fn request(lines: &[(ProductId, u32)]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: lines
            .iter()
            .map(|&(product_id, quantity)| LineItem {
                product_id,
                quantity: Quantity::try_new(quantity).expect("nonzero quantity"),
            })
            .collect(),
        shipping_address: ShippingAddress::try_new("1 Main St, Springfield").expect("valid address"),
        notes: None,
    }
}

/// Current stock of a seeded product.
pub async fn stock_of(store: &InMemoryStore, product_id: &ProductId) -> u32 {
    use ordercore::store::ProductDirectory;
    store
        .get_product(product_id)
        .await
        .expect("product exists")
        .stock()
}
