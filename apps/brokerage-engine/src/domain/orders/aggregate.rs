//! Order aggregate root.
//!
//! An order owns its status lifecycle: created PENDING by intake, moved to a
//! terminal state exactly once by execution or cancellation, immutable after.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::OrderError;
use super::value_objects::{OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{Money, OrderId, Quantity, SymbolId, Timestamp, UserId};

/// Commission charged on order value.
pub const FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 3); // 0.1%

/// Days until an unexecuted order expires.
pub const ORDER_TTL_DAYS: i64 = 30;

/// Command to place a new order.
#[derive(Debug, Clone)]
pub struct PlaceOrderCommand {
    /// Owning user.
    pub user_id: UserId,
    /// Symbol to trade.
    pub symbol_id: SymbolId,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Quantity,
    /// Limit price (required for LIMIT/STOP_LIMIT).
    pub limit_price: Option<Money>,
    /// Stop price (required for STOP_LOSS/STOP_LIMIT).
    pub stop_price: Option<Money>,
}

impl PlaceOrderCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns error if required parameters are missing or invalid.
    pub fn validate(&self) -> Result<(), OrderError> {
        self.quantity
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: e.to_string(),
            })?;

        if self.order_type.requires_limit_price() && self.limit_price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "limit_price".to_string(),
                message: format!("limit price required for {} orders", self.order_type),
            });
        }

        if self.order_type.requires_stop_price() && self.stop_price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "stop_price".to_string(),
                message: format!("stop price required for {} orders", self.order_type),
            });
        }

        for (field, price) in [
            ("limit_price", self.limit_price),
            ("stop_price", self.stop_price),
        ] {
            if let Some(price) = price {
                price
                    .validate_for_order()
                    .map_err(|e| OrderError::InvalidParameters {
                        field: field.to_string(),
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(())
    }
}

/// Order aggregate root.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    symbol_id: SymbolId,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    limit_price: Option<Money>,
    stop_price: Option<Money>,
    status: OrderStatus,
    filled_quantity: Quantity,
    filled_price: Option<Money>,
    order_value: Money,
    fees: Money,
    placed_at: Timestamp,
    filled_at: Option<Timestamp>,
    expires_at: Timestamp,
}

impl Order {
    /// Create a new PENDING order from a validated command.
    ///
    /// `order_value` is the estimated notional used for the funds
    /// reservation; `fees` the commission on it. Intake computes both before
    /// calling this so the reservation and the persisted order agree.
    ///
    /// # Errors
    ///
    /// Returns error if command validation fails.
    pub fn place(
        cmd: PlaceOrderCommand,
        order_value: Money,
        fees: Money,
        now: Timestamp,
    ) -> Result<Self, OrderError> {
        cmd.validate()?;

        Ok(Self {
            id: OrderId::generate(),
            user_id: cmd.user_id,
            symbol_id: cmd.symbol_id,
            side: cmd.side,
            order_type: cmd.order_type,
            quantity: cmd.quantity,
            limit_price: cmd.limit_price,
            stop_price: cmd.stop_price,
            status: OrderStatus::Pending,
            filled_quantity: Quantity::ZERO,
            filled_price: None,
            order_value,
            fees,
            placed_at: now,
            filled_at: None,
            expires_at: now.plus_days(ORDER_TTL_DAYS),
        })
    }

    /// Get the order ID.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the traded symbol.
    #[must_use]
    pub const fn symbol_id(&self) -> &SymbolId {
        &self.symbol_id
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Get the limit price.
    #[must_use]
    pub const fn limit_price(&self) -> Option<Money> {
        self.limit_price
    }

    /// Get the stop price.
    #[must_use]
    pub const fn stop_price(&self) -> Option<Money> {
        self.stop_price
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the filled quantity.
    #[must_use]
    pub const fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    /// Get the fill price.
    #[must_use]
    pub const fn filled_price(&self) -> Option<Money> {
        self.filled_price
    }

    /// Get the estimated notional at placement.
    #[must_use]
    pub const fn order_value(&self) -> Money {
        self.order_value
    }

    /// Get the commission.
    #[must_use]
    pub const fn fees(&self) -> Money {
        self.fees
    }

    /// Get the placement timestamp.
    #[must_use]
    pub const fn placed_at(&self) -> Timestamp {
        self.placed_at
    }

    /// Get the fill timestamp.
    #[must_use]
    pub const fn filled_at(&self) -> Option<Timestamp> {
        self.filled_at
    }

    /// Get the expiry timestamp.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// The wallet amount reserved for this order (BUY only).
    ///
    /// Sells reserve holdings, not funds, so this is zero for them.
    #[must_use]
    pub fn reserved_funds(&self) -> Money {
        if self.side.is_buy() {
            self.order_value + self.fees
        } else {
            Money::ZERO
        }
    }

    /// Returns true once the order has outlived its TTL.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Fill the order completely at the given execution price.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not in a fillable state.
    pub fn fill(&mut self, price: Money, now: Timestamp) -> Result<(), OrderError> {
        if !self.status.can_fill() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Filled,
            });
        }

        self.status = OrderStatus::Filled;
        self.filled_quantity = self.quantity;
        self.filled_price = Some(price);
        self.filled_at = Some(now);
        Ok(())
    }

    /// Cancel the order.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is PENDING.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.is_cancelable() {
            return Err(OrderError::CannotCancel {
                status: self.status,
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Reject the order (terminal execution failure).
    ///
    /// # Errors
    ///
    /// Returns error if the order is already terminal.
    pub fn reject(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Rejected,
            });
        }
        self.status = OrderStatus::Rejected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_command() -> PlaceOrderCommand {
        PlaceOrderCommand {
            user_id: UserId::new("user-1"),
            symbol_id: SymbolId::new("sym-aapl"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Quantity::new(100),
            limit_price: Some(Money::new(dec!(150.00))),
            stop_price: None,
        }
    }

    fn place(cmd: PlaceOrderCommand) -> Order {
        Order::place(cmd, Money::new(dec!(15000)), Money::new(dec!(15)), Timestamp::now()).unwrap()
    }

    #[test]
    fn place_creates_pending_order() {
        let order = place(make_command());

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.filled_quantity(), Quantity::ZERO);
        assert!(order.filled_price().is_none());
        assert_eq!(
            order.expires_at(),
            order.placed_at().plus_days(ORDER_TTL_DAYS)
        );
    }

    #[test]
    fn fee_rate_is_ten_bps() {
        assert_eq!(FEE_RATE, dec!(0.001));
    }

    #[test]
    fn limit_order_requires_limit_price() {
        let mut cmd = make_command();
        cmd.limit_price = None;
        assert!(matches!(
            cmd.validate(),
            Err(OrderError::InvalidParameters { field, .. }) if field == "limit_price"
        ));
    }

    #[test]
    fn stop_orders_require_stop_price() {
        let mut cmd = make_command();
        cmd.order_type = OrderType::StopLoss;
        cmd.limit_price = None;
        assert!(cmd.validate().is_err());

        cmd.stop_price = Some(Money::new(dec!(140.00)));
        assert!(cmd.validate().is_ok());

        cmd.order_type = OrderType::StopLimit;
        assert!(cmd.validate().is_err()); // still missing limit price
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut cmd = make_command();
        cmd.quantity = Quantity::ZERO;
        assert!(matches!(
            cmd.validate(),
            Err(OrderError::InvalidParameters { field, .. }) if field == "quantity"
        ));
    }

    #[test]
    fn negative_limit_price_rejected() {
        let mut cmd = make_command();
        cmd.limit_price = Some(Money::new(dec!(-5)));
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn reserved_funds_for_buy_includes_fees() {
        let order = place(make_command());
        assert_eq!(order.reserved_funds(), Money::new(dec!(15015)));
    }

    #[test]
    fn reserved_funds_for_sell_is_zero() {
        let mut cmd = make_command();
        cmd.side = OrderSide::Sell;
        let order = place(cmd);
        assert_eq!(order.reserved_funds(), Money::ZERO);
    }

    #[test]
    fn fill_sets_terminal_state() {
        let mut order = place(make_command());
        order.fill(Money::new(dec!(149.50)), Timestamp::now()).unwrap();

        assert_eq!(order.status(), OrderStatus::Filled);
        assert_eq!(order.filled_quantity(), order.quantity());
        assert_eq!(order.filled_price(), Some(Money::new(dec!(149.50))));
        assert!(order.filled_at().is_some());
    }

    #[test]
    fn fill_twice_fails() {
        let mut order = place(make_command());
        order.fill(Money::new(dec!(150)), Timestamp::now()).unwrap();

        let result = order.fill(Money::new(dec!(151)), Timestamp::now());
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn cancel_only_while_pending() {
        let mut order = place(make_command());
        order.cancel().unwrap();
        assert_eq!(order.status(), OrderStatus::Cancelled);

        // Terminal: no further transitions.
        assert!(matches!(
            order.cancel(),
            Err(OrderError::CannotCancel { status: OrderStatus::Cancelled })
        ));
        assert!(order.fill(Money::new(dec!(150)), Timestamp::now()).is_err());
    }

    #[test]
    fn cancel_filled_order_fails_without_state_change() {
        let mut order = place(make_command());
        order.fill(Money::new(dec!(150)), Timestamp::now()).unwrap();

        assert!(order.cancel().is_err());
        assert_eq!(order.status(), OrderStatus::Filled);
    }

    #[test]
    fn reject_pending_order() {
        let mut order = place(make_command());
        order.reject().unwrap();
        assert_eq!(order.status(), OrderStatus::Rejected);

        assert!(order.reject().is_err());
    }

    #[test]
    fn expiry_is_thirty_days() {
        let order = place(make_command());
        assert!(!order.is_expired(order.placed_at().plus_days(29)));
        assert!(order.is_expired(order.placed_at().plus_days(31)));
    }

    #[test]
    fn order_serde_roundtrip() {
        let order = place(make_command());
        let json = serde_json::to_string(&order).unwrap();
        let parsed: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id(), order.id());
        assert_eq!(parsed.status(), order.status());
        assert_eq!(parsed.order_value(), order.order_value());
    }
}
