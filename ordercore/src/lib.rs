//! `OrderCore` - Inventory-consistent order transaction engine
//!
//! This library keeps two independent records - an order's line items and
//! each referenced product's stock count - consistent under concurrent
//! requests, with all-or-nothing semantics across multiple lines per order.
//!
//! The moving parts, leaves first:
//!
//! - [`ledger::StockLedger`]: the only path by which stock changes, built
//!   on a single atomic conditional adjustment per product
//! - [`order::OrderStatus`]: the order lifecycle state machine
//! - [`engine::OrderEngine`]: placement, cancellation, admin updates and
//!   authorization-scoped queries
//!
//! Authentication, HTTP routing, category and product CRUD live outside
//! this crate; the [`store::ProductDirectory`] and [`store::OrderStore`]
//! traits are their interface, and the caller's identity arrives as a
//! plain [`types::Requester`] already resolved by the auth layer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod errors;
pub mod ledger;
pub mod order;
pub mod product;
pub mod store;
pub mod types;

pub use engine::{LineItem, OrderEngine, PlaceOrderRequest, UpdateOrderRequest};
pub use errors::{OrderError, OrderResult, StoreError, StoreResult};
pub use ledger::StockLedger;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::{Product, StockDeltaError};
pub use store::{OrderStore, ProductDirectory};
pub use types::{
    DomainError, Money, OrderId, OrderNumber, ProductId, Quantity, Requester, Role,
    ShippingAddress, Timestamp, UserId,
};
