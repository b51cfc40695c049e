//! In-memory store adapter for `OrderCore`
//!
//! This crate provides an in-memory implementation of the
//! `ProductDirectory` and `OrderStore` traits from the ordercore crate,
//! useful for testing and development scenarios where persistence is not
//! required. The conditional-write contracts hold under true parallel
//! callers: the stock floor check and the write happen inside one write-lock
//! critical section, and order-number uniqueness is claimed atomically with
//! the insert.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use ordercore::errors::{StoreError, StoreResult};
use ordercore::order::{Order, OrderStatus};
use ordercore::product::{Product, StockDeltaError};
use ordercore::store::{OrderStore, ProductDirectory};
use ordercore::types::{OrderId, OrderNumber, ProductId, UserId};

/// Thread-safe in-memory backing store for testing
#[derive(Clone)]
pub struct InMemoryStore {
    // Maps product IDs to their current records
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    // Maps order IDs to their persisted orders
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    // Every order number ever claimed, for uniqueness enforcement
    order_numbers: Arc<RwLock<HashSet<OrderNumber>>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            products: Arc::new(RwLock::new(HashMap::new())),
            orders: Arc::new(RwLock::new(HashMap::new())),
            order_numbers: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Seed or replace a product record (directory administration)
    pub fn insert_product(&self, product: Product) {
        let mut products = self.products.write().expect("RwLock poisoned");
        products.insert(product.id, product);
    }

    /// Remove a product record, returning whether it existed
    pub fn remove_product(&self, product_id: &ProductId) -> bool {
        let mut products = self.products.write().expect("RwLock poisoned");
        products.remove(product_id).is_some()
    }

    /// Number of persisted orders (test helper)
    pub fn order_count(&self) -> usize {
        self.orders.read().expect("RwLock poisoned").len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductDirectory for InMemoryStore {
    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Product> {
        let products = self.products.read().expect("RwLock poisoned");

        products
            .get(product_id)
            .cloned()
            .ok_or(StoreError::ProductNotFound(*product_id))
    }

    async fn adjust_stock(&self, product_id: &ProductId, delta: i64) -> StoreResult<u32> {
        let mut products = self.products.write().expect("RwLock poisoned");

        // Floor check and write share this critical section, so two callers
        // racing for the last unit serialize and exactly one succeeds.
        let product = products
            .get(product_id)
            .cloned()
            .ok_or(StoreError::ProductNotFound(*product_id))?;

        let adjusted = product.with_stock_delta(delta).map_err(|err| match err {
            StockDeltaError::Floor {
                requested,
                available,
            } => StoreError::InsufficientStock {
                product_id: *product_id,
                requested,
                available,
            },
            StockDeltaError::Overflow => StoreError::StockOverflow(*product_id),
        })?;

        let new_stock = adjusted.stock();
        products.insert(*product_id, adjusted);
        Ok(new_stock)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: Order) -> StoreResult<()> {
        let mut orders = self.orders.write().expect("RwLock poisoned");

        let mut order_numbers = self.order_numbers.write().expect("RwLock poisoned");

        // Claim the number and insert under the same locks, so a duplicate
        // check can never interleave with another insert.
        if !order_numbers.insert(order.order_number.clone()) {
            return Err(StoreError::DuplicateOrderNumber(order.order_number));
        }

        orders.insert(order.id, order);
        Ok(())
    }

    async fn fetch_order(&self, order_id: &OrderId) -> StoreResult<Option<Order>> {
        let orders = self.orders.read().expect("RwLock poisoned");

        Ok(orders.get(order_id).cloned())
    }

    async fn update_order(&self, order: Order, expected: OrderStatus) -> StoreResult<()> {
        let mut orders = self.orders.write().expect("RwLock poisoned");

        // The status check and the replace share this critical section, so
        // two callers racing to transition the same order serialize and
        // exactly one wins.
        let current = orders
            .get(&order.id)
            .ok_or(StoreError::OrderNotFound(order.id))?;
        if current.status != expected {
            return Err(StoreError::StatusConflict {
                order_id: order.id,
                expected,
                actual: current.status,
            });
        }

        orders.insert(order.id, order);
        Ok(())
    }

    async fn delete_order(&self, order_id: &OrderId) -> StoreResult<()> {
        let mut orders = self.orders.write().expect("RwLock poisoned");

        // The claimed order number stays claimed: numbers are unique across
        // all orders ever created, including removed ones.
        orders
            .remove(order_id)
            .map(|_| ())
            .ok_or(StoreError::OrderNotFound(*order_id))
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().expect("RwLock poisoned");

        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn list_orders_for_user(&self, user_id: &UserId) -> StoreResult<Vec<Order>> {
        let orders = self.orders.read().expect("RwLock poisoned");

        let mut own: Vec<Order> = orders
            .values()
            .filter(|order| order.user_id == *user_id)
            .cloned()
            .collect();
        own.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(own)
    }
}
