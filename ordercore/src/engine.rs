//! The order transaction engine.
//!
//! Orchestrates placement, cancellation, admin updates and scoped queries
//! over a backing store that implements both [`ProductDirectory`] and
//! [`OrderStore`]. All stock movement goes through the [`StockLedger`];
//! every failure path releases whatever the ledger reserved, so a failed
//! placement leaves the system exactly as before the call.

use crate::errors::{OrderError, OrderResult, StoreError};
use crate::ledger::StockLedger;
use crate::order::{Order, OrderItem, OrderStatus};
use crate::store::{OrderStore, ProductDirectory};
use crate::types::{
    Money, OrderId, OrderNumber, ProductId, Quantity, Requester, ShippingAddress, Timestamp,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Bounded retries for order-number generation on uniqueness conflicts.
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// One requested order line: which product, how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    /// The product to order.
    pub product_id: ProductId,
    /// Units requested (at least 1 by construction).
    pub quantity: Quantity,
}

/// Input to [`OrderEngine::place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    /// Requested lines, processed in this order.
    pub items: Vec<LineItem>,
    /// Where to ship.
    pub shipping_address: ShippingAddress,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// Input to [`OrderEngine::update_order`] (admin path).
///
/// `status` changes go through the order state machine; the free-form
/// fields update without transition constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOrderRequest {
    /// Target status, if changing.
    pub status: Option<OrderStatus>,
    /// Replacement shipping address, if changing.
    pub shipping_address: Option<ShippingAddress>,
    /// Replacement notes, if changing.
    pub notes: Option<String>,
}

/// The inventory-consistent order transaction engine.
///
/// Generic over the backing store so production and test stores share the
/// exact same engine logic. Cheap to clone; clones share the store.
#[derive(Debug)]
pub struct OrderEngine<S> {
    store: Arc<S>,
    ledger: StockLedger<S>,
}

impl<S> Clone for OrderEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S> OrderEngine<S>
where
    S: ProductDirectory + OrderStore,
{
    /// Creates an engine over the given store.
    pub fn new(store: Arc<S>) -> Self {
        let ledger = StockLedger::new(Arc::clone(&store));
        Self { store, ledger }
    }

    /// Returns the engine's stock ledger.
    pub const fn ledger(&self) -> &StockLedger<S> {
        &self.ledger
    }

    /// Places an order for `requester`.
    ///
    /// Validates the request against current prices and stock, deducts
    /// every line's stock all-or-nothing, and persists the order with
    /// status [`OrderStatus::Pending`] and a unique order number
    /// (regenerated on conflict, bounded retries). Any failure after the
    /// deduction releases it again; a failed placement leaves stock and the
    /// order book unchanged.
    #[instrument(skip(self, request), fields(user_id = %requester.user_id))]
    pub async fn place_order(
        &self,
        requester: &Requester,
        request: PlaceOrderRequest,
    ) -> OrderResult<Order> {
        if request.items.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one item".to_string(),
            ));
        }

        // Price snapshots and availability checks happen outside the
        // stock-deduction path; stock itself is only checked by the
        // conditional deduction below.
        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = match self.store.get_product(&line.product_id).await {
                Ok(product) => product,
                Err(StoreError::ProductNotFound(product_id)) => {
                    return Err(OrderError::ProductUnavailable { product_id });
                }
                Err(other) => return Err(OrderError::Store(other)),
            };
            if !product.is_active {
                return Err(OrderError::ProductUnavailable {
                    product_id: line.product_id,
                });
            }
            items.push(OrderItem::new(line.product_id, line.quantity, product.price)?);
        }
        // Surface total-overflow errors before touching any stock.
        let total: Money = items
            .iter()
            .try_fold(Money::default(), |acc, item| acc.checked_add(item.total_price))
            .map_err(OrderError::from)?;

        self.ledger.reserve(&items).await?;

        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let order = match Order::new(
                OrderNumber::generate(),
                requester.user_id,
                items.clone(),
                request.shipping_address.clone(),
                request.notes.clone(),
            ) {
                Ok(order) => order,
                Err(err) => {
                    self.release_reservation(&items).await;
                    return Err(err.into());
                }
            };

            match self.store.insert_order(order.clone()).await {
                Ok(()) => {
                    info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        total = %total,
                        lines = order.items.len(),
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(StoreError::DuplicateOrderNumber(number)) => {
                    debug!(%number, attempt, "order number collision; regenerating");
                }
                Err(other) => {
                    self.release_reservation(&items).await;
                    return Err(OrderError::Store(other));
                }
            }
        }

        self.release_reservation(&items).await;
        Err(OrderError::OrderNumberExhausted {
            attempts: MAX_ORDER_NUMBER_ATTEMPTS,
        })
    }

    /// Cancels an order, restoring every line's stock.
    ///
    /// Visible only to the owning user and administrators; anyone else sees
    /// [`OrderError::NotFound`], indistinguishable from absence. Shipped,
    /// delivered and already-cancelled orders fail with
    /// [`OrderError::InvalidTransition`]. The status change is a conditional
    /// update guarded on the status the caller observed, so of two callers
    /// racing to cancel (or cancel versus ship) the same order exactly one
    /// wins and stock is released exactly once. Once the update commits the
    /// cancellation stands: restoration cannot fail the floor check, and a
    /// backend failure during it is logged rather than failing the
    /// committed cancellation. A product deleted since placement is logged
    /// and skipped the same way.
    #[instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        requester: &Requester,
    ) -> OrderResult<Order> {
        let order = self.fetch_scoped(order_id, requester).await?;
        let observed = order.status;

        let mut cancelled = order;
        cancelled.transition_to(OrderStatus::Cancelled)?;
        match self.store.update_order(cancelled.clone(), observed).await {
            Ok(()) => {}
            // A concurrent transition won; report the status it left behind.
            Err(StoreError::StatusConflict { actual, .. }) => {
                return Err(OrderError::InvalidTransition {
                    from: actual,
                    to: OrderStatus::Cancelled,
                });
            }
            Err(other) => return Err(order_store_error(other)),
        }

        if let Err(err) = self.ledger.release(&cancelled.items).await {
            warn!(
                order_id = %cancelled.id,
                error = %err,
                "failed to restore stock for cancelled order"
            );
        }

        info!(
            order_id = %cancelled.id,
            order_number = %cancelled.order_number,
            "order cancelled"
        );
        Ok(cancelled)
    }

    /// Applies an admin update to an order.
    ///
    /// A `status: Cancelled` change routes through [`Self::cancel_order`]
    /// so stock reversal and the status change stay one unit. Other status
    /// changes go through the state machine, have no stock side effects,
    /// and commit conditionally on the status this call observed, so a
    /// racing transition cannot be silently overwritten.
    #[instrument(skip(self, request), fields(user_id = %requester.user_id))]
    pub async fn update_order(
        &self,
        order_id: &OrderId,
        request: UpdateOrderRequest,
        requester: &Requester,
    ) -> OrderResult<Order> {
        if !requester.is_admin() {
            return Err(OrderError::NotFound);
        }

        if request.status == Some(OrderStatus::Cancelled) {
            let mut cancelled = self.cancel_order(order_id, requester).await?;
            if request.shipping_address.is_some() || request.notes.is_some() {
                if let Some(address) = request.shipping_address {
                    cancelled.shipping_address = address;
                }
                if let Some(notes) = request.notes {
                    cancelled.notes = Some(notes);
                }
                cancelled.updated_at = Timestamp::now();
                self.store
                    .update_order(cancelled.clone(), OrderStatus::Cancelled)
                    .await
                    .map_err(order_store_error)?;
            }
            return Ok(cancelled);
        }

        let mut order = self
            .store
            .fetch_order(order_id)
            .await
            .map_err(OrderError::Store)?
            .ok_or(OrderError::NotFound)?;
        let observed = order.status;

        if let Some(target) = request.status {
            order.transition_to(target)?;
        }
        if let Some(address) = request.shipping_address {
            order.shipping_address = address;
        }
        if let Some(notes) = request.notes {
            order.notes = Some(notes);
        }
        order.updated_at = Timestamp::now();

        match self.store.update_order(order.clone(), observed).await {
            Ok(()) => {}
            // A concurrent transition beat this update to the store.
            Err(StoreError::StatusConflict { actual, .. }) => {
                return Err(match request.status {
                    Some(target) => OrderError::InvalidTransition { from: actual, to: target },
                    None => OrderError::Store(StoreError::StatusConflict {
                        order_id: *order_id,
                        expected: observed,
                        actual,
                    }),
                });
            }
            Err(other) => return Err(order_store_error(other)),
        }
        debug!(order_id = %order.id, status = %order.status, "order updated");
        Ok(order)
    }

    /// Fetches one order, scoped to the requester.
    ///
    /// Owners and administrators see the order; everyone else gets
    /// [`OrderError::NotFound`].
    #[instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn find_order(
        &self,
        order_id: &OrderId,
        requester: &Requester,
    ) -> OrderResult<Order> {
        self.fetch_scoped(order_id, requester).await
    }

    /// Lists orders visible to the requester, newest first.
    ///
    /// Administrators see every order; customers see their own.
    #[instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn find_orders_for_user(&self, requester: &Requester) -> OrderResult<Vec<Order>> {
        let orders = if requester.is_admin() {
            self.store.list_orders().await
        } else {
            self.store.list_orders_for_user(&requester.user_id).await
        };
        orders.map_err(OrderError::Store)
    }

    /// Physically removes an order (administrators only).
    ///
    /// Bypasses the state machine and has no stock side effects; the
    /// order's items are removed with it.
    #[instrument(skip(self), fields(user_id = %requester.user_id))]
    pub async fn remove_order(&self, order_id: &OrderId, requester: &Requester) -> OrderResult<()> {
        if !requester.is_admin() {
            return Err(OrderError::NotFound);
        }
        self.store
            .delete_order(order_id)
            .await
            .map_err(order_store_error)?;
        info!(%order_id, "order removed");
        Ok(())
    }

    async fn fetch_scoped(&self, order_id: &OrderId, requester: &Requester) -> OrderResult<Order> {
        let order = self
            .store
            .fetch_order(order_id)
            .await
            .map_err(OrderError::Store)?
            .ok_or(OrderError::NotFound)?;
        if requester.can_access(&order.user_id) {
            Ok(order)
        } else {
            Err(OrderError::NotFound)
        }
    }

    /// Best-effort release of a reservation on a failure path: the original
    /// failure is what the caller needs to see.
    async fn release_reservation(&self, items: &[OrderItem]) {
        if let Err(err) = self.ledger.release(items).await {
            warn!(error = %err, "failed to release reservation after aborted placement");
        }
    }
}

/// Maps order-book store failures at the engine surface: an order that
/// vanished mid-operation reads as absent, everything else as a store
/// failure.
fn order_store_error(err: StoreError) -> OrderError {
    match err {
        StoreError::OrderNotFound(_) => OrderError::NotFound,
        other => OrderError::Store(other),
    }
}
