//! Storage seams consumed by the engine.
//!
//! Two traits, implemented together by a backing store:
//!
//! - [`ProductDirectory`] — the external collaborator owning products. Its
//!   `adjust_stock` is the single conditional primitive behind the stock
//!   ledger: the floor check and the write are one atomic operation relative
//!   to concurrent adjusters.
//! - [`OrderStore`] — persistence for orders and their items.
//!
//! Implementations must be safe under true parallel callers (multiple
//! tasks/threads against shared storage); the in-memory adapter in
//! `ordercore-memory` is the reference implementation.

use crate::errors::StoreResult;
use crate::order::{Order, OrderStatus};
use crate::product::Product;
use crate::types::{OrderId, ProductId, UserId};
use async_trait::async_trait;

/// Read and adjust products in the Product Directory.
#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Fetches the current product record.
    ///
    /// Fails with [`StoreError::ProductNotFound`](crate::errors::StoreError::ProductNotFound)
    /// if the product does not exist.
    async fn get_product(&self, product_id: &ProductId) -> StoreResult<Product>;

    /// Applies `stock = stock + delta` as a single conditional operation
    /// against the persisted value, returning the new stock count.
    ///
    /// # Contract
    ///
    /// - Fails with [`StoreError::InsufficientStock`](crate::errors::StoreError::InsufficientStock)
    ///   when `delta < 0` and the result would cross the stock floor; the
    ///   stored value is left untouched.
    /// - Fails with [`StoreError::ProductNotFound`](crate::errors::StoreError::ProductNotFound)
    ///   when the product does not exist.
    /// - Never partially applies, and concurrent calls against the same
    ///   product serialize: two callers racing for the last unit must not
    ///   both succeed. The read-modify-write must be one critical section
    ///   (a conditional `UPDATE ... WHERE stock >= :qty` checking the
    ///   affected-row count, or a lock held across check and write).
    async fn adjust_stock(&self, product_id: &ProductId, delta: i64) -> StoreResult<u32>;
}

/// Persistence for orders and their line items.
///
/// An order and its items are one record from the store's point of view:
/// items have no independent lifecycle and are deleted with their order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order.
    ///
    /// Order-number uniqueness is checked atomically with the insert; a
    /// collision fails with
    /// [`StoreError::DuplicateOrderNumber`](crate::errors::StoreError::DuplicateOrderNumber)
    /// and persists nothing.
    async fn insert_order(&self, order: Order) -> StoreResult<()>;

    /// Fetches an order by id, `None` if absent.
    async fn fetch_order(&self, order_id: &OrderId) -> StoreResult<Option<Order>>;

    /// Replaces a persisted order (same id), guarded on its current status.
    ///
    /// The status check and the replace are one conditional operation
    /// against the persisted value: if the stored status differs from
    /// `expected` the update fails with
    /// [`StoreError::StatusConflict`](crate::errors::StoreError::StatusConflict)
    /// and persists nothing, so two callers racing to transition the same
    /// order cannot both win. Fails with
    /// [`StoreError::OrderNotFound`](crate::errors::StoreError::OrderNotFound)
    /// if the order was never persisted.
    async fn update_order(&self, order: Order, expected: OrderStatus) -> StoreResult<()>;

    /// Physically removes an order and its items.
    ///
    /// Fails with [`StoreError::OrderNotFound`](crate::errors::StoreError::OrderNotFound)
    /// if the order does not exist.
    async fn delete_order(&self, order_id: &OrderId) -> StoreResult<()>;

    /// Lists every order, newest first.
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;

    /// Lists one user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: &UserId) -> StoreResult<Vec<Order>>;
}
