//! Order records, line items, and the order status state machine.
//!
//! An [`Order`] exclusively owns its [`OrderItem`]s (composition): items are
//! created with the order in one atomic unit and deleted with it. The
//! constructor computes `total_amount` from the items, so the invariant
//! `total_amount == Σ items.total_price` holds by construction and cannot
//! drift afterwards.

use crate::errors::{OrderError, OrderResult};
use crate::types::{
    DomainError, Money, OrderId, OrderNumber, ProductId, Quantity, ShippingAddress, Timestamp,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Lifecycle status of an order.
///
/// Forward-only chain `Pending -> Confirmed -> Shipped -> Delivered`, with
/// skips allowed (admin-driven); cancellation is reachable from `Pending`
/// and `Confirmed` only. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Initial status of every placed order.
    Pending,
    /// Accepted by an administrator.
    Confirmed,
    /// Handed to the carrier. Too late to cancel.
    Shipped,
    /// Received by the customer. Terminal.
    Delivered,
    /// Cancelled with stock restored. Terminal.
    Cancelled,
}

impl OrderStatus {
    /// Returns whether no further transitions are possible from this status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Returns whether an order in this status may still be cancelled.
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Returns whether moving from this status to `target` is legal.
    pub const fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            // Forward-only, skips allowed.
            (Self::Pending, Self::Confirmed | Self::Shipped | Self::Delivered)
            | (Self::Confirmed, Self::Shipped | Self::Delivered)
            | (Self::Shipped, Self::Delivered) => true,
            // Cancellation only while nothing has shipped.
            (Self::Pending | Self::Confirmed, Self::Cancelled) => true,
            _ => false,
        }
    }

    /// Validates a transition, returning the target status on success.
    pub fn transition(self, target: Self) -> OrderResult<Self> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(OrderError::InvalidTransition {
                from: self,
                to: target,
            })
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One line of an order: a product, a quantity, and a price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The referenced product (non-owning; products outlive orders).
    pub product_id: ProductId,
    /// Units ordered.
    pub quantity: Quantity,
    /// Unit price captured at order time. Later price changes on the
    /// product never alter this snapshot.
    pub unit_price: Money,
    /// `unit_price * quantity`, computed once at construction.
    pub total_price: Money,
}

impl OrderItem {
    /// Builds a line from a product snapshot, computing the line total.
    pub fn new(
        product_id: ProductId,
        quantity: Quantity,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        let total_price = unit_price.multiply_by_quantity(quantity)?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            total_price,
        })
    }
}

/// A customer order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Surrogate identifier.
    pub id: OrderId,
    /// Human-readable unique number.
    pub order_number: OrderNumber,
    /// Owning user. Immutable for the order's whole life.
    pub user_id: UserId,
    /// Line items, in request order.
    pub items: Vec<OrderItem>,
    /// Sum of the items' line totals.
    pub total_amount: Money,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Where to ship.
    pub shipping_address: ShippingAddress,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// When the order was placed.
    pub created_at: Timestamp,
    /// When the order last changed.
    pub updated_at: Timestamp,
}

impl Order {
    /// Creates a new `Pending` order, computing `total_amount` from `items`.
    pub fn new(
        order_number: OrderNumber,
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        notes: Option<String>,
    ) -> Result<Self, DomainError> {
        let total_amount = items
            .iter()
            .try_fold(Money::default(), |acc, item| acc.checked_add(item.total_price))?;
        let now = Timestamp::now();
        Ok(Self {
            id: OrderId::new(),
            order_number,
            user_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            shipping_address,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the order to `target`, bumping `updated_at`.
    pub fn transition_to(&mut self, target: OrderStatus) -> OrderResult<()> {
        self.status = self.status.transition(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Recomputes the sum of line totals (used by invariant checks).
    pub fn items_total(&self) -> Result<Money, DomainError> {
        self.items
            .iter()
            .try_fold(Money::default(), |acc, item| acc.checked_add(item.total_price))
    }
}
