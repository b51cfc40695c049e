//! Core domain types for `OrderCore`.
//!
//! This module defines the fundamental types used throughout the library.
//! All types use smart constructors to ensure validity at construction time,
//! following the "parse, don't validate" principle: if a value exists, it is
//! valid, and no downstream code needs to re-check it.

use chrono::{DateTime, Utc};
use nutype::nutype;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Errors produced by smart constructors of the domain types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Invalid money amount.
    #[error("Invalid money amount: {0}")]
    InvalidMoney(String),
    /// Invalid quantity value.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    /// Invalid order number format.
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),
    /// Invalid shipping address.
    #[error("Invalid shipping address: {0}")]
    InvalidShippingAddress(String),
    /// Invalid order identifier.
    #[error("Invalid order ID: {0}")]
    InvalidOrderId(String),
}

impl From<QuantityError> for DomainError {
    fn from(err: QuantityError) -> Self {
        Self::InvalidQuantity(err.to_string())
    }
}

impl From<OrderNumberError> for DomainError {
    fn from(err: OrderNumberError) -> Self {
        Self::InvalidOrderNumber(err.to_string())
    }
}

impl From<ShippingAddressError> for DomainError {
    fn from(err: ShippingAddressError) -> Self {
        Self::InvalidShippingAddress(err.to_string())
    }
}

impl From<OrderIdError> for DomainError {
    fn from(err: OrderIdError) -> Self {
        Self::InvalidOrderId(err.to_string())
    }
}

/// Identifier of a product in the Product Directory.
///
/// Products are owned by the directory; orders hold non-owning references
/// to them by this id.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct ProductId(Uuid);

impl ProductId {
    /// Generates a fresh time-ordered product identifier.
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

/// Identifier of the user owning an order, as resolved by the auth layer.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    AsRef,
    Deref,
    Display,
    Serialize,
    Deserialize
))]
pub struct UserId(Uuid);

impl UserId {
    /// Generates a fresh time-ordered user identifier.
    pub fn generate() -> Self {
        Self::new(Uuid::now_v7())
    }
}

/// A globally unique order identifier using UUIDv7 format.
///
/// `OrderId` values are guaranteed to be UUIDv7, which provides:
/// - Time-based ordering capability
/// - Globally unique identification
/// - Monotonic sort order for orders created in sequence
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new `OrderId` with the current timestamp.
    pub fn new() -> Self {
        // This will always succeed as Uuid::now_v7() always returns a valid v7 UUID
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-readable order number.
///
/// Format: `ORD-{BASE36 TIMESTAMP}-{4 RANDOM}`, uppercase alphanumeric.
/// Example: `ORD-M9ZJ3K2A-7Q1X`. Generated at order creation; the store
/// enforces uniqueness and the engine regenerates on conflict.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 50, regex = r"^ORD-[A-Z0-9]+-[A-Z0-9]{4}$"),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct OrderNumber(String);

const ORDER_NUMBER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

impl OrderNumber {
    /// Generates a new order number from the current time plus a random suffix.
    ///
    /// The prefix is the Unix-millisecond timestamp in base 36, so numbers
    /// generated in sequence sort roughly chronologically; the suffix
    /// disambiguates numbers generated within the same millisecond.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis().unsigned_abs();
        let mut rng = rand::rng();
        let suffix: String = (0..4)
            .map(|_| {
                let idx = rng.random_range(0..ORDER_NUMBER_CHARSET.len());
                ORDER_NUMBER_CHARSET[idx] as char
            })
            .collect();
        Self::try_new(format!("ORD-{}-{suffix}", base36(millis)))
            .expect("Generated order number should be valid")
    }
}

/// Encodes a value in uppercase base 36.
fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = u8::try_from(value % 36).expect("remainder fits in u8");
        digits.push(if digit < 10 {
            b'0' + digit
        } else {
            b'A' + digit - 10
        });
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base36 digits are ASCII")
}

/// Quantity of a product on an order line.
///
/// Quantities are at least 1; a zero-quantity line cannot be represented.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct Quantity(u32);

impl Quantity {
    /// Returns the underlying count.
    pub fn value(self) -> u32 {
        self.into()
    }
}

/// Money amount with validation.
///
/// Uses `Decimal` for precise financial calculations.
/// Must be non-negative with at most 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Maximum money amount (100 million).
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Creates money from cents (avoids floating point issues).
    pub fn from_cents(cents: u64) -> Result<Self, DomainError> {
        let decimal = Decimal::new(
            i64::try_from(cents)
                .map_err(|_| DomainError::InvalidMoney(format!("{cents} cents overflows")))?,
            2,
        );
        Self::new(decimal)
    }

    /// Creates money from a decimal amount.
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() {
            return Err(DomainError::InvalidMoney(format!(
                "Money amount cannot be negative: {amount}"
            )));
        }
        if amount.scale() > 2 {
            return Err(DomainError::InvalidMoney(format!(
                "Money amount cannot have more than 2 decimal places: {amount}"
            )));
        }
        if amount > Self::MAX_AMOUNT {
            return Err(DomainError::InvalidMoney(format!(
                "Money amount {amount} exceeds maximum {}",
                Self::MAX_AMOUNT
            )));
        }
        Ok(Self(amount))
    }

    /// Returns the underlying decimal value.
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Converts to cents for storage.
    pub fn to_cents(&self) -> u64 {
        (self.0 * Decimal::from(100)).to_u64().unwrap_or(0)
    }

    /// Returns whether this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds money amounts, rejecting overflow past the maximum.
    pub fn checked_add(self, other: Self) -> Result<Self, DomainError> {
        Self::new(self.0 + other.0)
    }

    /// Multiplies a unit price by a line quantity.
    pub fn multiply_by_quantity(self, quantity: Quantity) -> Result<Self, DomainError> {
        Self::new(self.0 * Decimal::from(quantity.value()))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self(Decimal::new(0, 0))
    }
}

impl std::str::FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let amount_str = trimmed
            .strip_prefix('$')
            .map_or(trimmed, |stripped| stripped);

        let decimal = amount_str.parse::<Decimal>().map_err(|e| {
            DomainError::InvalidMoney(format!("Failed to parse money amount '{s}': {e}"))
        })?;

        Self::new(decimal)
    }
}

/// Shipping address attached to an order.
///
/// Free-form but non-empty; structure is the storefront's concern.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 500),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Display,
        AsRef,
        Deref,
        Serialize,
        Deserialize,
        TryFrom
    )
)]
pub struct ShippingAddress(String);

/// A timestamp recording when an order was created or last changed.
///
/// This wrapper ensures consistent timestamp handling throughout the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Role of an authenticated caller, resolved by the excluded auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular customer; sees and cancels only their own orders.
    Customer,
    /// Administrator; sees every order and drives status changes.
    Admin,
}

/// The authenticated caller of an engine operation.
///
/// Authorization in the engine is a plain parameter, not ambient context:
/// the auth layer resolves the caller's identity and role before the engine
/// is ever invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// The caller's user id.
    pub user_id: UserId,
    /// The caller's resolved role.
    pub role: Role,
}

impl Requester {
    /// Creates a requester from a resolved identity.
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Returns whether this requester is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns whether this requester may act on an order owned by `owner`.
    pub fn can_access(&self, owner: &UserId) -> bool {
        self.is_admin() || self.user_id == *owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_id_new_creates_valid_v7() {
        let id = OrderId::new();
        assert_eq!(id.as_ref().get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn order_id_rejects_non_v7_uuids() {
        let mut bytes = [0u8; 16];
        bytes[6] = (bytes[6] & 0x0F) | 0x40; // version 4
        bytes[8] = (bytes[8] & 0x3F) | 0x80;
        assert!(OrderId::try_new(Uuid::from_bytes(bytes)).is_err());
        assert!(OrderId::try_new(Uuid::nil()).is_err());
    }

    #[test]
    fn order_number_generation_matches_format() {
        let number = OrderNumber::generate();
        assert!(number.as_ref().starts_with("ORD-"));
        assert!(number.as_ref().len() <= 50);
    }

    #[test]
    fn order_number_validation() {
        assert!(OrderNumber::try_new("ORD-M9ZJ3K2A-7Q1X".to_string()).is_ok());
        assert!(OrderNumber::try_new("ORD-ABC".to_string()).is_err()); // no suffix
        assert!(OrderNumber::try_new("ord-abc-defg".to_string()).is_err()); // lowercase
        assert!(OrderNumber::try_new("".to_string()).is_err());
    }

    #[test]
    fn generated_order_numbers_rarely_collide() {
        let numbers: std::collections::HashSet<_> =
            (0..100).map(|_| OrderNumber::generate()).collect();
        // Same millisecond prefix is likely; the random suffix must spread them.
        assert!(numbers.len() > 90);
    }

    #[test]
    fn quantity_validation() {
        assert!(Quantity::try_new(1).is_ok());
        assert!(Quantity::try_new(u32::MAX).is_ok());
        assert!(Quantity::try_new(0).is_err());
    }

    #[test]
    fn money_validation() {
        assert!(Money::from_cents(100).is_ok()); // $1.00
        assert!(Money::new(dec!(10.50)).is_ok());
        assert!(Money::new(dec!(-1.00)).is_err());
        assert!(Money::new(Decimal::new(1001, 3)).is_err()); // 3 decimal places
        assert!(Money::new(dec!(100_000_001)).is_err());
    }

    #[test]
    fn money_operations() {
        let m1 = Money::from_cents(100).unwrap();
        let m2 = Money::from_cents(250).unwrap();

        assert_eq!(m1.checked_add(m2).unwrap().to_cents(), 350);

        let qty = Quantity::try_new(3).unwrap();
        assert_eq!(m1.multiply_by_quantity(qty).unwrap().to_cents(), 300);
    }

    #[test]
    fn money_parsing() {
        assert_eq!("$10.50".parse::<Money>().unwrap().to_cents(), 1050);
        assert_eq!("25.99".parse::<Money>().unwrap().to_cents(), 2599);
        assert!("invalid".parse::<Money>().is_err());
        assert!("-5.00".parse::<Money>().is_err());
    }

    #[test]
    fn shipping_address_rejects_blank() {
        assert!(ShippingAddress::try_new("  ").is_err());
        assert!(ShippingAddress::try_new("1 Main St, Springfield").is_ok());
    }

    #[test]
    fn requester_scoping() {
        let owner = UserId::generate();
        let customer = Requester::new(owner, Role::Customer);
        let stranger = Requester::new(UserId::generate(), Role::Customer);
        let admin = Requester::new(UserId::generate(), Role::Admin);

        assert!(customer.can_access(&owner));
        assert!(!stranger.can_access(&owner));
        assert!(admin.can_access(&owner));
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "Z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(36 * 36 + 1), "101");
    }

    proptest! {
        #[test]
        fn prop_money_from_cents_roundtrip(cents in 0u64..1_000_000) {
            let money = Money::from_cents(cents).unwrap();
            prop_assert_eq!(money.to_cents(), cents);
        }

        #[test]
        fn prop_quantity_value_roundtrip(value in 1u32..=1_000_000) {
            let quantity = Quantity::try_new(value).unwrap();
            prop_assert_eq!(quantity.value(), value);
        }

        #[test]
        fn prop_money_addition_commutative(a in 0u64..100_000, b in 0u64..100_000) {
            let ma = Money::from_cents(a).unwrap();
            let mb = Money::from_cents(b).unwrap();
            prop_assert_eq!(ma.checked_add(mb).unwrap(), mb.checked_add(ma).unwrap());
        }

        #[test]
        fn prop_base36_roundtrip(value in 0u64..u64::MAX) {
            let encoded = base36(value);
            let decoded = u64::from_str_radix(&encoded, 36).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }

    #[test]
    fn order_number_roundtrip_serialization() {
        let number = OrderNumber::generate();
        let json = serde_json::to_string(&number).unwrap();
        let deserialized: OrderNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(number, deserialized);
    }
}
