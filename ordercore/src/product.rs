//! Product records as seen through the Product Directory.
//!
//! Products are owned by the directory (an external collaborator); the
//! engine only ever reads them and adjusts their stock through the
//! directory's conditional primitive. There is deliberately no public stock
//! setter on [`Product`].

use crate::types::{DomainError, Money, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Minimum valid unit price: one cent.
const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// A product as exposed by the Product Directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Directory-assigned identifier.
    pub id: ProductId,
    /// Current unit price. Orders snapshot this value at placement time.
    pub price: Money,
    /// Units in stock. The type already rules out negative stock; the
    /// directory's conditional adjustment enforces the floor under
    /// concurrency.
    stock: u32,
    /// Whether the product can currently be ordered.
    pub is_active: bool,
}

impl Product {
    /// Creates a product record, rejecting prices below one cent.
    pub fn new(
        id: ProductId,
        price: Money,
        stock: u32,
        is_active: bool,
    ) -> Result<Self, DomainError> {
        if price.amount() < MIN_PRICE {
            return Err(DomainError::InvalidMoney(format!(
                "Product price must be at least $0.01, got {price}"
            )));
        }
        Ok(Self {
            id,
            price,
            stock,
            is_active,
        })
    }

    /// Returns the current stock count.
    pub const fn stock(&self) -> u32 {
        self.stock
    }

    /// Applies a signed stock delta, failing when it would cross the floor
    /// or overflow the stock counter.
    ///
    /// Store implementations call this inside their critical section, so the
    /// check and the write are one conditional operation from the point of
    /// view of concurrent adjusters.
    pub fn with_stock_delta(mut self, delta: i64) -> Result<Self, StockDeltaError> {
        let current = i64::from(self.stock);
        let next = current
            .checked_add(delta)
            .ok_or(StockDeltaError::Overflow)?;
        if next < 0 {
            return Err(StockDeltaError::Floor {
                requested: delta.unsigned_abs().try_into().unwrap_or(u32::MAX),
                available: self.stock,
            });
        }
        self.stock = u32::try_from(next).map_err(|_| StockDeltaError::Overflow)?;
        Ok(self)
    }
}

/// Why [`Product::with_stock_delta`] rejected an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDeltaError {
    /// A negative delta would cross the stock floor.
    Floor {
        /// Units the adjustment tried to remove.
        requested: u32,
        /// Units actually available.
        available: u32,
    },
    /// A positive delta would overflow the stock counter.
    Overflow,
}
