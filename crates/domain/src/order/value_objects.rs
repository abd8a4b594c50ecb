//! Value objects for the order domain.

use std::iter::Sum;

use common::ProductId;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Number of decimal places kept for every amount (cents).
pub const MONEY_SCALE: u32 = 2;

/// Fixed-point money amount with two decimal places.
///
/// Amounts are stored as `NUMERIC(10, 2)` and serialized as decimal strings
/// (`"10.00"`), never as floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Creates a money amount, rounding half away from zero to cents.
    pub fn new(amount: Decimal) -> Self {
        let mut amount =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(MONEY_SCALE);
        Self(amount)
    }

    /// Creates a money amount from minor units (e.g. `1000` = $10.00).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, MONEY_SCALE))
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self::from_cents(0)
    }

    /// Returns the decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount in the gateway's minor-unit representation.
    ///
    /// The amount is already scaled to cents, so this is exact.
    pub fn to_minor_units(&self) -> i64 {
        self.0.mantissa() as i64
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: i32) -> Money {
        Money::new(self.0 * Decimal::from(quantity))
    }

    /// Checks that this amount is usable as a catalog price (at least 0.01).
    pub fn ensure_valid_price(&self) -> Result<(), OrderError> {
        if self.is_positive() {
            Ok(())
        } else {
            Err(OrderError::InvalidPrice { price: *self })
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            write!(f, "-${}", self.0.abs())
        } else {
            write!(f, "${}", self.0)
        }
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money::new(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

fn default_quantity() -> i32 {
    1
}

/// One entry of a client-submitted cart.
///
/// A missing `quantity` defaults to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

impl CartLine {
    /// Creates a cart line.
    pub fn new(product_id: impl Into<ProductId>, quantity: i32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Validates that at least one unit is requested.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity < 1 {
            return Err(OrderError::InvalidQuantity {
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// An ordered list of cart lines.
///
/// Serializes as a bare JSON array, which is also the format of the cart
/// snapshot stored in payment session metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(Vec<CartLine>);

impl Cart {
    /// Creates a cart from its lines.
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self(lines)
    }

    /// Returns the cart lines in submission order.
    pub fn lines(&self) -> &[CartLine] {
        &self.0
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Serializes the cart into a metadata snapshot string.
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a cart from a metadata snapshot string.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(snapshot)
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self(lines)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.amount(), dec!(12.34));
        assert_eq!(money.to_minor_units(), 1234);
    }

    #[test]
    fn test_money_rounds_to_cents() {
        assert_eq!(Money::new(dec!(10.005)).to_minor_units(), 1001);
        assert_eq!(Money::new(dec!(10.004)).to_minor_units(), 1000);
        assert_eq!(Money::new(dec!(10)).to_minor_units(), 1000);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(100).to_string(), "$1.00");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).to_minor_units(), 1500);
        assert_eq!(a.multiply(3).to_minor_units(), 3000);
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from_cents(2000));
    }

    #[test]
    fn test_money_serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "\"19.99\"");
    }

    #[test]
    fn test_money_deserialization_rounds_to_cents() {
        let money: Money = serde_json::from_str("\"10.005\"").unwrap();
        assert_eq!(money.amount(), dec!(10.01));
        assert_eq!(money.to_minor_units(), 1001);

        let whole: Money = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(whole.to_minor_units(), 700);
        assert_eq!(serde_json::to_string(&whole).unwrap(), "\"7.00\"");
    }

    #[test]
    fn test_price_validation() {
        assert!(Money::from_cents(1).ensure_valid_price().is_ok());
        assert!(Money::zero().ensure_valid_price().is_err());
        assert!(Money::from_cents(-100).ensure_valid_price().is_err());
    }

    #[test]
    fn test_cart_line_quantity_defaults_to_one() {
        let line: CartLine = serde_json::from_str(r#"{"product_id": 3}"#).unwrap();
        assert_eq!(line, CartLine::new(3, 1));
    }

    #[test]
    fn test_cart_line_rejects_non_positive_quantity() {
        assert!(CartLine::new(1, 0).validate().is_err());
        assert!(CartLine::new(1, -2).validate().is_err());
        assert!(CartLine::new(1, 1).validate().is_ok());
    }

    #[test]
    fn test_cart_snapshot_is_a_json_array() {
        let cart = Cart::new(vec![CartLine::new(1, 1), CartLine::new(2, 2)]);
        let snapshot = cart.to_snapshot().unwrap();
        assert_eq!(
            snapshot,
            r#"[{"product_id":1,"quantity":1},{"product_id":2,"quantity":2}]"#
        );
        assert_eq!(Cart::from_snapshot(&snapshot).unwrap(), cart);
    }

    #[test]
    fn test_cart_snapshot_rejects_garbage() {
        assert!(Cart::from_snapshot("not json").is_err());
        assert!(Cart::from_snapshot("[]").unwrap().is_empty());
    }
}
