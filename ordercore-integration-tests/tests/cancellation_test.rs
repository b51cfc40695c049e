//! Cancellation: stock reversal, status rules, authorization scoping, and
//! tolerance for products deleted after placement.

use async_trait::async_trait;
use ordercore::engine::{OrderEngine, UpdateOrderRequest};
use ordercore::errors::{OrderError, StoreResult};
use ordercore::order::{Order, OrderStatus};
use ordercore::product::Product;
use ordercore::store::{OrderStore, ProductDirectory};
use ordercore::types::{OrderId, ProductId, UserId};
use ordercore_integration_tests::{
    admin, customer, engine, request, seed_product, single_line_request, stock_of,
};
use ordercore_memory::InMemoryStore;
use std::sync::Arc;
use tokio::sync::Barrier;

#[tokio::test]
async fn cancellation_is_the_inverse_of_placement() {
    let (engine, store) = engine();
    let a = seed_product(&store, 1000, 7);
    let b = seed_product(&store, 2500, 4);
    let user = customer();

    let order = engine
        .place_order(&user, request(&[(a, 3), (b, 2)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&store, &a).await, 4);
    assert_eq!(stock_of(&store, &b).await, 2);

    let cancelled = engine.cancel_order(&order.id, &user).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&store, &a).await, 7);
    assert_eq!(stock_of(&store, &b).await, 4);
}

#[tokio::test]
async fn worked_example_from_the_storefront() {
    // Product stock 5, price $10.00; order qty 3.
    let (engine, store) = engine();
    let product_id = seed_product(&store, 1000, 5);
    let user = customer();

    let order = engine
        .place_order(&user, single_line_request(product_id, 3))
        .await
        .unwrap();
    assert_eq!(order.total_amount.to_cents(), 3000);
    assert_eq!(stock_of(&store, &product_id).await, 2);

    let cancelled = engine.cancel_order(&order.id, &user).await.unwrap();
    assert_eq!(stock_of(&store, &product_id).await, 5);
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let fetched = engine.find_order(&order.id, &user).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn owner_and_admin_may_cancel_strangers_may_not() {
    let (engine, store) = engine();
    let product_id = seed_product(&store, 1000, 10);
    let owner = customer();
    let stranger = customer();

    let order = engine
        .place_order(&owner, single_line_request(product_id, 1))
        .await
        .unwrap();

    // A stranger cannot even learn the order exists.
    let err = engine.cancel_order(&order.id, &stranger).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFound));
    assert_eq!(stock_of(&store, &product_id).await, 9);

    let cancelled = engine.cancel_order(&order.id, &admin()).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&store, &product_id).await, 10);
}

#[tokio::test]
async fn shipped_and_terminal_orders_cannot_cancel() {
    let (engine, store) = engine();
    let product_id = seed_product(&store, 1000, 10);
    let user = customer();
    let root = admin();

    for status in [
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ] {
        let order = engine
            .place_order(&user, single_line_request(product_id, 1))
            .await
            .unwrap();
        if status == OrderStatus::Cancelled {
            engine.cancel_order(&order.id, &user).await.unwrap();
        } else {
            engine
                .update_order(
                    &order.id,
                    UpdateOrderRequest {
                        status: Some(status),
                        ..UpdateOrderRequest::default()
                    },
                    &root,
                )
                .await
                .unwrap();
        }

        let stock_before = stock_of(&store, &product_id).await;
        let err = engine.cancel_order(&order.id, &user).await.unwrap_err();
        assert!(
            matches!(err, OrderError::InvalidTransition { .. }),
            "cancelling a {status} order should be rejected"
        );
        // A rejected cancellation must not move stock.
        assert_eq!(stock_of(&store, &product_id).await, stock_before);
    }
}

/// Wraps the in-memory store and holds `fetch_order` calls at a barrier
/// until two callers have arrived, so both read the same pre-update copy.
struct PairedFetches {
    inner: InMemoryStore,
    barrier: Barrier,
}

#[async_trait]
impl ProductDirectory for PairedFetches {
    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Product> {
        self.inner.get_product(product_id).await
    }

    async fn adjust_stock(&self, product_id: &ProductId, delta: i64) -> StoreResult<u32> {
        self.inner.adjust_stock(product_id, delta).await
    }
}

#[async_trait]
impl OrderStore for PairedFetches {
    async fn insert_order(&self, order: Order) -> StoreResult<()> {
        self.inner.insert_order(order).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
        self.barrier.wait().await;
        self.inner.fetch_order(order_id).await
    }

    async fn update_order(&self, order: Order, expected: OrderStatus) -> StoreResult<()> {
        self.inner.update_order(order, expected).await
    }

    async fn delete_order(&self, order_id: &OrderId) -> StoreResult<()> {
        self.inner.delete_order(order_id).await
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        self.inner.list_orders().await
    }

    async fn list_orders_for_user(&self, user_id: &UserId) -> StoreResult<Vec<Order>> {
        self.inner.list_orders_for_user(user_id).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancellations_restore_stock_once() {
    let inner = InMemoryStore::new();
    let product_id = seed_product(&inner, 1000, 5);
    let store = Arc::new(PairedFetches {
        inner,
        barrier: Barrier::new(2),
    });
    let engine = Arc::new(OrderEngine::new(Arc::clone(&store)));
    let user = customer();

    let order = engine
        .place_order(&user, single_line_request(product_id, 3))
        .await
        .unwrap();

    // Both cancellations read the order as Pending before either commits;
    // the conditional update must let exactly one of them win.
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let order_id = order.id;
            tokio::spawn(async move { engine.cancel_order(&order_id, &user).await })
        })
        .collect();

    let mut successes = 0;
    let mut losses = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(cancelled) => {
                assert_eq!(cancelled.status, OrderStatus::Cancelled);
                successes += 1;
            }
            Err(OrderError::InvalidTransition {
                to: OrderStatus::Cancelled,
                ..
            }) => losses += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(losses, 1);
    // Stock is restored exactly once, back to its pre-placement value.
    assert_eq!(stock_of(&store.inner, &product_id).await, 5);
}

#[tokio::test]
async fn double_cancellation_restores_stock_once() {
    let (engine, store) = engine();
    let product_id = seed_product(&store, 1000, 5);
    let user = customer();

    let order = engine
        .place_order(&user, single_line_request(product_id, 2))
        .await
        .unwrap();
    engine.cancel_order(&order.id, &user).await.unwrap();
    assert_eq!(stock_of(&store, &product_id).await, 5);

    let err = engine.cancel_order(&order.id, &user).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
    assert_eq!(stock_of(&store, &product_id).await, 5);
}

#[tokio::test]
async fn deleted_product_does_not_block_cancellation() {
    let (engine, store) = engine();
    let kept = seed_product(&store, 1000, 5);
    let doomed = seed_product(&store, 2000, 5);
    let user = customer();

    let order = engine
        .place_order(&user, request(&[(doomed, 1), (kept, 2)]))
        .await
        .unwrap();

    // The product is withdrawn from the directory after placement.
    assert!(store.remove_product(&doomed));

    let cancelled = engine.cancel_order(&order.id, &user).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    // The surviving product's stock is still restored.
    assert_eq!(stock_of(&store, &kept).await, 5);
}
