//! Stock adjustments and stock listings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use galley_core::validation::required;
use galley_core::{DomainResult, ValidationErrors, ValueObject};

use crate::item::InventoryItem;

/// Largest stock balance either way: 999 999 999 999.99, the range of a
/// `NUMERIC(14, 2)` column.
pub const MAX_STOCK_QUANTITY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Add,
    Subtract,
}

/// An amount of stock moved in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    amount: Decimal,
    direction: StockDirection,
}

impl ValueObject for StockAdjustment {}

impl StockAdjustment {
    pub fn new(amount: Decimal, direction: StockDirection) -> Self {
        Self { amount, direction }
    }

    pub fn add(amount: Decimal) -> Self {
        Self::new(amount, StockDirection::Add)
    }

    pub fn subtract(amount: Decimal) -> Self {
        Self::new(amount, StockDirection::Subtract)
    }

    /// Validate a manual adjustment entered by staff.
    ///
    /// Manual adjustments are whole, positive unit counts; recipe consumption
    /// builds adjustments directly and may be fractional.
    pub fn manual(amount: Option<Decimal>, direction: Option<StockDirection>) -> DomainResult<Self> {
        let mut errors = ValidationErrors::new();

        let amount = required(&mut errors, "adjustment", amount).filter(|a| {
            if !a.fract().is_zero() {
                errors.push("adjustment", "must be a whole number");
                false
            } else if *a <= Decimal::ZERO {
                errors.push("adjustment", "must be at least 1");
                false
            } else if *a > MAX_STOCK_QUANTITY {
                errors.push("adjustment", format!("may not be greater than {MAX_STOCK_QUANTITY}"));
                false
            } else {
                true
            }
        });
        let direction = required(&mut errors, "type", direction);

        errors.into_result()?;
        match (amount, direction) {
            (Some(amount), Some(direction)) => Ok(Self::new(amount, direction)),
            _ => Err(galley_core::DomainError::validation("adjustment", "incomplete input")),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn direction(&self) -> StockDirection {
        self.direction
    }

    /// The change to the on-hand quantity (negative when subtracting).
    pub fn signed_delta(&self) -> Decimal {
        match self.direction {
            StockDirection::Add => self.amount,
            StockDirection::Subtract => -self.amount,
        }
    }

    /// The balance after this adjustment, or `None` when it would leave
    /// `±MAX_STOCK_QUANTITY`.
    pub fn apply_to(&self, quantity: Decimal) -> Option<Decimal> {
        quantity
            .checked_add(self.signed_delta())
            .filter(|q| q.abs() <= MAX_STOCK_QUANTITY)
    }
}

/// Sort items by category, then by name within the category.
pub fn sort_by_category_then_name(items: &mut [InventoryItem]) {
    items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
}

/// Items at or below their reorder level, ordered by category then name.
pub fn low_stock(items: impl IntoIterator<Item = InventoryItem>) -> Vec<InventoryItem> {
    let mut low: Vec<InventoryItem> = items.into_iter().filter(InventoryItem::is_low_stock).collect();
    sort_by_category_then_name(&mut low);
    low
}
