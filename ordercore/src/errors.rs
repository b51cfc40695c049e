//! Error types for `OrderCore`.
//!
//! Two layers, mirroring the engine/store split:
//!
//! - **`OrderError`**: business-level failures surfaced by the engine
//! - **`StoreError`**: persistence-layer failures from the backing store
//!
//! Every failure inside a placement unwinds the whole attempt: callers see a
//! typed outcome and the system is left exactly as before the call. The only
//! internal retry the engine performs is bounded order-number regeneration;
//! for `Store` failures the caller retries the whole operation, never a
//! sub-step.

use crate::order::OrderStatus;
use crate::types::{DomainError, OrderId, OrderNumber, ProductId};
use thiserror::Error;

/// Type alias for engine operation results.
pub type OrderResult<T> = Result<T, OrderError>;

/// Type alias for store operation results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the order transaction engine.
///
/// # Error Handling Strategy
///
/// - **`Validation`**: retry with corrected input
/// - **`NotFound`**: the order or product is absent, or the caller may not
///   see it; the two are deliberately indistinguishable
/// - **`ProductUnavailable`**: drop or replace the offending line
/// - **`InsufficientStock`**: the whole order attempt was aborted; retry
///   with a smaller quantity or later
/// - **`InvalidTransition`**: show the current status to the user
/// - **`OrderNumberExhausted`**: retryable by the caller
/// - **`Store`**: retry the whole operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The request failed validation before any state was touched.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The order does not exist, or the caller is not allowed to see it.
    #[error("Not found")]
    NotFound,

    /// An order line references an unknown or inactive product.
    #[error("Product '{product_id}' is unavailable")]
    ProductUnavailable {
        /// The offending product.
        product_id: ProductId,
    },

    /// A stock deduction would have crossed the stock floor.
    #[error(
        "Insufficient stock for product '{product_id}': requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// The product that ran short.
        product_id: ProductId,
        /// Units the order line asked for.
        requested: u32,
        /// Units actually available when the deduction ran.
        available: u32,
    },

    /// An illegal order status change was requested.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Status the order currently holds.
        from: OrderStatus,
        /// Status the caller asked for.
        to: OrderStatus,
    },

    /// Order number generation kept colliding with existing numbers.
    #[error("Order number generation exhausted after {attempts} attempts")]
    OrderNumberExhausted {
        /// How many numbers were tried before giving up.
        attempts: u32,
    },

    /// The backing store failed; the whole operation was rolled back.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<DomainError> for OrderError {
    fn from(err: DomainError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Errors from the backing store (Product Directory and order book).
///
/// `ProductNotFound`, `OrderNotFound`, `StatusConflict`,
/// `InsufficientStock` and `DuplicateOrderNumber` are conditional-write
/// outcomes the engine handles explicitly; the remaining variants are
/// backend failures surfaced to the caller as [`OrderError::Store`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("Product '{0}' not found")]
    ProductNotFound(ProductId),

    /// The referenced order does not exist.
    #[error("Order '{0}' not found")]
    OrderNotFound(OrderId),

    /// A conditional update observed a status other than the expected one.
    #[error("Order '{order_id}' status is {actual}, expected {expected}")]
    StatusConflict {
        /// The order whose update was rejected.
        order_id: OrderId,
        /// Status the caller expected to replace.
        expected: OrderStatus,
        /// Status actually persisted when the update ran.
        actual: OrderStatus,
    },

    /// A conditional stock adjustment failed its floor check.
    #[error(
        "Insufficient stock for product '{product_id}': requested {requested}, available {available}"
    )]
    InsufficientStock {
        /// The product that ran short.
        product_id: ProductId,
        /// Units the adjustment tried to remove.
        requested: u32,
        /// Units available when the adjustment ran.
        available: u32,
    },

    /// A positive stock adjustment would overflow the stock counter.
    #[error("Stock adjustment for product '{0}' overflows the stock counter")]
    StockOverflow(ProductId),

    /// An insert collided with an existing order number.
    #[error("Order number '{0}' already exists")]
    DuplicateOrderNumber(OrderNumber),

    /// The connection to the store failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The store rolled back an atomic unit of work.
    #[error("Transaction rolled back: {0}")]
    TransactionRollback(String),

    /// The store's bounded timeout elapsed; treat as an abort.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert_to_order_errors() {
        let product_id = ProductId::generate();
        let err: OrderError = StoreError::ProductNotFound(product_id).into();
        assert!(matches!(err, OrderError::Store(_)));
    }

    #[test]
    fn domain_errors_surface_as_validation() {
        let err: OrderError = DomainError::InvalidQuantity("zero".to_string()).into();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn not_found_reveals_nothing() {
        assert_eq!(OrderError::NotFound.to_string(), "Not found");
    }

    #[test]
    fn error_display_includes_context() {
        let product_id = ProductId::generate();
        let err = OrderError::InsufficientStock {
            product_id,
            requested: 3,
            available: 1,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("requested 3"));
        assert!(rendered.contains("available 1"));
    }
}
