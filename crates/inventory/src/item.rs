use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use galley_core::validation::{optional_text, required, required_text};
use galley_core::{DomainResult, Entity, InventoryItemId, ValidationErrors};

use crate::stock::{StockAdjustment, MAX_STOCK_QUANTITY};

pub const NAME_MAX_LEN: usize = 255;
pub const CATEGORY_MAX_LEN: usize = 100;
pub const UNIT_TYPE_MAX_LEN: usize = 50;
pub const SUPPLIER_MAX_LEN: usize = 255;

/// Money and stock columns are stored with two decimal places.
const MAX_SCALE: u32 = 2;

/// Largest unit price: 9 999 999 999.99, the range of a `NUMERIC(12, 2)` column.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Stocked ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    pub category: String,
    /// Units on hand. Manual input is whole and non-negative, but recipe
    /// consumption may leave a fractional or negative balance.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_type: String,
    pub reorder_level: i64,
    pub description: Option<String>,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(id: InventoryItemId, fields: ItemFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: fields.name,
            category: fields.category,
            quantity: fields.quantity,
            unit_price: fields.unit_price,
            unit_type: fields.unit_type,
            reorder_level: fields.reorder_level,
            description: fields.description,
            supplier: fields.supplier,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite every editable field (the edit form submits the whole record).
    pub fn apply_fields(&mut self, fields: ItemFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.category = fields.category;
        self.quantity = fields.quantity;
        self.unit_price = fields.unit_price;
        self.unit_type = fields.unit_type;
        self.reorder_level = fields.reorder_level;
        self.description = fields.description;
        self.supplier = fields.supplier;
        self.updated_at = now;
    }

    /// Low stock: at or below the reorder level.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= Decimal::from(self.reorder_level)
    }

    /// Apply a stock adjustment and return the new quantity.
    ///
    /// There is no floor: callers decide whether a negative balance is acceptable.
    /// Returns `None`, leaving the item untouched, when the balance would leave
    /// the storable range.
    pub fn adjust(&mut self, adjustment: StockAdjustment, now: DateTime<Utc>) -> Option<Decimal> {
        let quantity = adjustment.apply_to(self.quantity)?;
        self.quantity = quantity;
        self.updated_at = now;
        Some(quantity)
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Unvalidated create/edit input for an inventory item.
///
/// Every field is optional at the serde level so that a missing field is
/// reported by `validate` alongside the other field errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemDraft {
    pub name: String,
    pub category: String,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub unit_type: String,
    pub reorder_level: Option<i64>,
    pub description: Option<String>,
    pub supplier: Option<String>,
}

/// Validated inventory item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub category: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_type: String,
    pub reorder_level: i64,
    pub description: Option<String>,
    pub supplier: Option<String>,
}

impl ItemDraft {
    pub fn validate(&self) -> DomainResult<ItemFields> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", &self.name, NAME_MAX_LEN);
        let category = required_text(&mut errors, "category", &self.category, CATEGORY_MAX_LEN);
        let unit_type = required_text(&mut errors, "unit_type", &self.unit_type, UNIT_TYPE_MAX_LEN);
        let description = optional_text(&mut errors, "description", self.description.as_deref(), None);
        let supplier = optional_text(&mut errors, "supplier", self.supplier.as_deref(), Some(SUPPLIER_MAX_LEN));

        let quantity = required(&mut errors, "quantity", self.quantity).filter(|q| {
            if !q.fract().is_zero() {
                errors.push("quantity", "must be a whole number");
                false
            } else if *q < Decimal::ZERO {
                errors.push("quantity", "must be at least 0");
                false
            } else if *q > MAX_STOCK_QUANTITY {
                errors.push("quantity", format!("may not be greater than {MAX_STOCK_QUANTITY}"));
                false
            } else {
                true
            }
        });

        let unit_price = required(&mut errors, "unit_price", self.unit_price).filter(|p| {
            if *p < Decimal::ZERO {
                errors.push("unit_price", "must be at least 0");
                false
            } else if *p > MAX_UNIT_PRICE {
                errors.push("unit_price", format!("may not be greater than {MAX_UNIT_PRICE}"));
                false
            } else if p.normalize().scale() > MAX_SCALE {
                errors.push("unit_price", "may have at most 2 decimal places");
                false
            } else {
                true
            }
        });

        let reorder_level = required(&mut errors, "reorder_level", self.reorder_level).filter(|r| {
            if *r < 0 {
                errors.push("reorder_level", "must be at least 0");
                false
            } else {
                true
            }
        });

        errors.into_result()?;

        // All `Option`s are `Some` once no error was reported.
        match (name, category, quantity, unit_price, unit_type, reorder_level) {
            (Some(name), Some(category), Some(quantity), Some(unit_price), Some(unit_type), Some(reorder_level)) => {
                Ok(ItemFields {
                    name,
                    category,
                    quantity: quantity.normalize(),
                    unit_price,
                    unit_type,
                    reorder_level,
                    description,
                    supplier,
                })
            }
            _ => Err(galley_core::DomainError::validation("item", "incomplete input")),
        }
    }
}
