//! Holding entity: a user's position in one symbol.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::{Money, PRICE_SCALE, Quantity, SymbolId, Timestamp, UserId};

/// Holding domain errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HoldingError {
    /// Not enough unreserved shares for the operation.
    #[error("insufficient holdings: required {required}, available {available}")]
    InsufficientHoldings {
        /// Shares the operation needed.
        required: Quantity,
        /// Unreserved shares at the time.
        available: Quantity,
    },

    /// Quantity must be strictly positive.
    #[error("quantity must be positive")]
    NonPositiveQuantity,
}

/// A position in a single symbol.
///
/// `reserved_quantity` tracks shares committed to open sell orders so a
/// second sell cannot promise the same shares. Cost basis is tracked as
/// `total_cost`; average price is derived from it on every buy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    user_id: UserId,
    symbol_id: SymbolId,
    quantity: Quantity,
    reserved_quantity: Quantity,
    average_price: Money,
    total_cost: Money,
    updated_at: Timestamp,
}

impl Holding {
    /// Open an empty position.
    #[must_use]
    pub fn open(user_id: UserId, symbol_id: SymbolId, now: Timestamp) -> Self {
        Self {
            user_id,
            symbol_id,
            quantity: Quantity::ZERO,
            reserved_quantity: Quantity::ZERO,
            average_price: Money::ZERO,
            total_cost: Money::ZERO,
            updated_at: now,
        }
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the symbol.
    #[must_use]
    pub const fn symbol_id(&self) -> &SymbolId {
        &self.symbol_id
    }

    /// Get the total share count.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Get shares reserved for open sell orders.
    #[must_use]
    pub const fn reserved_quantity(&self) -> Quantity {
        self.reserved_quantity
    }

    /// Get the average acquisition price.
    #[must_use]
    pub const fn average_price(&self) -> Money {
        self.average_price
    }

    /// Get the cost basis.
    #[must_use]
    pub const fn total_cost(&self) -> Money {
        self.total_cost
    }

    /// Get the last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Shares not committed to open sell orders.
    #[must_use]
    pub const fn available_quantity(&self) -> Quantity {
        self.quantity.saturating_sub(self.reserved_quantity)
    }

    /// Position is empty and should be removed from the portfolio.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Reserve shares for an open sell order.
    ///
    /// # Errors
    ///
    /// Returns error if `shares` is zero or exceeds the unreserved quantity.
    pub fn reserve(&mut self, shares: Quantity, now: Timestamp) -> Result<(), HoldingError> {
        if shares.is_zero() {
            return Err(HoldingError::NonPositiveQuantity);
        }
        if shares > self.available_quantity() {
            return Err(HoldingError::InsufficientHoldings {
                required: shares,
                available: self.available_quantity(),
            });
        }
        self.reserved_quantity = self.reserved_quantity + shares;
        self.updated_at = now;
        Ok(())
    }

    /// Release a share reservation. Clamped at zero.
    pub fn release(&mut self, shares: Quantity, now: Timestamp) {
        self.reserved_quantity = self.reserved_quantity.saturating_sub(shares);
        self.updated_at = now;
    }

    /// Apply a settled buy: add shares at `cost` and re-derive the average
    /// price from the new cost basis.
    pub fn apply_buy(&mut self, shares: Quantity, cost: Money, now: Timestamp) {
        self.quantity = self.quantity + shares;
        self.total_cost += cost;
        self.average_price = Money::new(
            (self.total_cost.amount() / self.quantity.as_decimal())
                .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero),
        );
        self.updated_at = now;
    }

    /// Apply a settled sell: remove shares, release their reservation and
    /// reduce the cost basis proportionally. The average price of the
    /// remaining shares is unchanged.
    pub fn apply_sell(&mut self, shares: Quantity, now: Timestamp) {
        self.quantity = self.quantity.saturating_sub(shares);
        self.reserved_quantity = self.reserved_quantity.saturating_sub(shares);
        self.total_cost =
            (self.total_cost - (self.average_price * shares.as_decimal()).round()).max(Money::ZERO);
        if self.quantity.is_zero() {
            self.average_price = Money::ZERO;
            self.total_cost = Money::ZERO;
        }
        self.updated_at = now;
    }

    /// Current market value at `price`.
    #[must_use]
    pub fn market_value(&self, price: Money) -> Money {
        (price * self.quantity.as_decimal()).round()
    }

    /// Unrealized gain or loss at `price`.
    #[must_use]
    pub fn unrealized_pnl(&self, price: Money) -> Money {
        self.market_value(price) - self.total_cost
    }

    /// Unrealized gain or loss as a percentage of cost basis.
    ///
    /// Zero when the cost basis is zero, never a division error.
    #[must_use]
    pub fn pnl_percent(&self, price: Money) -> Decimal {
        if self.total_cost.is_zero() {
            return Decimal::ZERO;
        }
        (self.unrealized_pnl(price).amount() / self.total_cost.amount())
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
            * Decimal::ONE_HUNDRED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holding() -> Holding {
        Holding::open(UserId::new("user-1"), SymbolId::new("sym-aapl"), Timestamp::now())
    }

    #[test]
    fn buy_sets_average_price() {
        let mut h = holding();
        h.apply_buy(Quantity::new(10), Money::new(dec!(1000.00)), Timestamp::now());

        assert_eq!(h.quantity(), Quantity::new(10));
        assert_eq!(h.average_price(), Money::new(dec!(100.00)));
        assert_eq!(h.total_cost(), Money::new(dec!(1000.00)));
    }

    #[test]
    fn average_price_blends_across_buys() {
        let mut h = holding();
        h.apply_buy(Quantity::new(10), Money::new(dec!(1000.00)), Timestamp::now());
        h.apply_buy(Quantity::new(10), Money::new(dec!(2000.00)), Timestamp::now());

        assert_eq!(h.average_price(), Money::new(dec!(150.00)));
    }

    #[test]
    fn average_price_rounds_half_up() {
        let mut h = holding();
        // 100.00 / 3 = 33.333..., 2dp half-up 33.33.
        h.apply_buy(Quantity::new(3), Money::new(dec!(100.00)), Timestamp::now());
        assert_eq!(h.average_price(), Money::new(dec!(33.33)));

        // Cost basis 100.15 over 2 shares: 50.075 rounds to 50.08.
        let mut h = holding();
        h.apply_buy(Quantity::new(2), Money::new(dec!(100.15)), Timestamp::now());
        assert_eq!(h.average_price(), Money::new(dec!(50.08)));
    }

    #[test]
    fn reserve_blocks_double_commitment() {
        let mut h = holding();
        h.apply_buy(Quantity::new(10), Money::new(dec!(1000)), Timestamp::now());
        h.reserve(Quantity::new(7), Timestamp::now()).unwrap();

        assert_eq!(h.available_quantity(), Quantity::new(3));
        assert_eq!(
            h.reserve(Quantity::new(5), Timestamp::now()),
            Err(HoldingError::InsufficientHoldings {
                required: Quantity::new(5),
                available: Quantity::new(3),
            })
        );
    }

    #[test]
    fn reserve_zero_rejected() {
        let mut h = holding();
        h.apply_buy(Quantity::new(10), Money::new(dec!(1000)), Timestamp::now());
        assert_eq!(
            h.reserve(Quantity::ZERO, Timestamp::now()),
            Err(HoldingError::NonPositiveQuantity)
        );
    }

    #[test]
    fn sell_releases_reservation_and_keeps_average() {
        let mut h = holding();
        h.apply_buy(Quantity::new(10), Money::new(dec!(1500.00)), Timestamp::now());
        h.reserve(Quantity::new(4), Timestamp::now()).unwrap();
        h.apply_sell(Quantity::new(4), Timestamp::now());

        assert_eq!(h.quantity(), Quantity::new(6));
        assert_eq!(h.reserved_quantity(), Quantity::ZERO);
        assert_eq!(h.average_price(), Money::new(dec!(150.00)));
        assert_eq!(h.total_cost(), Money::new(dec!(900.00)));
    }

    #[test]
    fn selling_out_empties_the_position() {
        let mut h = holding();
        h.apply_buy(Quantity::new(5), Money::new(dec!(500)), Timestamp::now());
        h.apply_sell(Quantity::new(5), Timestamp::now());

        assert!(h.is_empty());
        assert_eq!(h.total_cost(), Money::ZERO);
        assert_eq!(h.average_price(), Money::ZERO);
    }

    #[test]
    fn pnl_percent_zero_cost_basis_is_zero() {
        let h = holding();
        assert_eq!(h.pnl_percent(Money::new(dec!(100))), Decimal::ZERO);
    }

    #[test]
    fn pnl_percent_rounds_at_four_decimals() {
        let mut h = holding();
        h.apply_buy(Quantity::new(10), Money::new(dec!(1000.00)), Timestamp::now());

        // Market value 1123.40, pnl 123.40, ratio 0.1234 -> 12.34%.
        assert_eq!(h.pnl_percent(Money::new(dec!(112.34))), dec!(12.34));
    }
}
