//! The stock ledger: the only path by which stock changes.
//!
//! Each adjustment delegates to the Product Directory's conditional
//! primitive, so a single call is already atomic. Multi-line reservations
//! use one conditional write per line instead of a lock held across lines;
//! on failure the ledger compensates the lines it already applied, so no
//! partial decrement survives the call and overlapping orders processed in
//! different line order cannot deadlock.

use crate::errors::{OrderError, OrderResult, StoreError};
use crate::order::OrderItem;
use crate::store::ProductDirectory;
use crate::types::ProductId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Atomic, conditional stock adjustment over a [`ProductDirectory`].
#[derive(Debug)]
pub struct StockLedger<D> {
    directory: Arc<D>,
}

impl<D> Clone for StockLedger<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<D> StockLedger<D>
where
    D: ProductDirectory,
{
    /// Creates a ledger over the given directory.
    pub const fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Applies a signed delta to one product's stock, returning the new
    /// count.
    ///
    /// Fails with [`OrderError::InsufficientStock`] when a negative delta
    /// would cross the stock floor and [`OrderError::NotFound`] when the
    /// product does not exist. Never partially applies.
    pub async fn adjust(&self, product_id: &ProductId, delta: i64) -> OrderResult<u32> {
        match self.directory.adjust_stock(product_id, delta).await {
            Ok(new_stock) => {
                debug!(%product_id, delta, new_stock, "stock adjusted");
                Ok(new_stock)
            }
            Err(StoreError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => Err(OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            }),
            Err(StoreError::ProductNotFound(_)) => Err(OrderError::NotFound),
            Err(other) => Err(OrderError::Store(other)),
        }
    }

    /// Deducts stock for every line, in request order, all-or-nothing.
    ///
    /// If any line fails its floor check, the deductions already applied for
    /// this reservation are compensated before the error is returned: the
    /// caller observes either a complete reservation or no stock change at
    /// all.
    pub async fn reserve(&self, items: &[OrderItem]) -> OrderResult<()> {
        for (index, item) in items.iter().enumerate() {
            let delta = -i64::from(item.quantity.value());
            if let Err(err) = self.adjust(&item.product_id, delta).await {
                self.compensate(&items[..index]).await;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Restores stock for every line (cancellation reversal).
    ///
    /// A reversal increases stock and cannot fail the floor check. A product
    /// deleted since placement is logged and skipped rather than blocking
    /// the cancellation; any other store failure propagates.
    pub async fn release(&self, items: &[OrderItem]) -> OrderResult<()> {
        for item in items {
            let delta = i64::from(item.quantity.value());
            match self.adjust(&item.product_id, delta).await {
                Ok(_) => {}
                Err(OrderError::NotFound) => {
                    warn!(
                        product_id = %item.product_id,
                        quantity = %item.quantity,
                        "product missing during stock restoration; skipping"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Re-applies the inverse of already-applied deductions.
    async fn compensate(&self, applied: &[OrderItem]) {
        for item in applied {
            let delta = i64::from(item.quantity.value());
            if let Err(err) = self.adjust(&item.product_id, delta).await {
                // Nothing left to unwind into; record it and keep going.
                warn!(
                    product_id = %item.product_id,
                    quantity = %item.quantity,
                    error = %err,
                    "failed to compensate stock deduction"
                );
            }
        }
    }
}
