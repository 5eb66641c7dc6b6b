use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use galley_core::validation::{optional_text, required_text};
use galley_core::{CustomerId, DomainResult, Entity, OrderId, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

/// One ordered dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Customer order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Place a new order; the total is computed from the items.
    pub fn place(id: OrderId, customer_id: CustomerId, draft: &OrderDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let (items, delivery_address, notes) = draft.validate()?;
        let mut order = Self {
            id,
            customer_id,
            total_amount: Decimal::ZERO,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            delivery_address,
            notes,
            items,
            created_at: now,
        };
        order.total_amount = order.items_total();
        Ok(order)
    }

    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Unvalidated order input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDraft {
    pub items: Vec<OrderItem>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl OrderDraft {
    fn validate(&self) -> DomainResult<(Vec<OrderItem>, Option<String>, Option<String>)> {
        let mut errors = ValidationErrors::new();

        if self.items.is_empty() {
            errors.push("items", "must contain at least one item");
        }
        let mut items = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.iter().enumerate() {
            let name = required_text(&mut errors, &format!("items[{idx}].name"), &item.name, 255);
            if item.quantity < 1 {
                errors.push(format!("items[{idx}].quantity"), "must be at least 1");
            }
            if item.unit_price < Decimal::ZERO {
                errors.push(format!("items[{idx}].unit_price"), "must be at least 0");
            }
            if let Some(name) = name {
                items.push(OrderItem {
                    name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                });
            }
        }
        let delivery_address = optional_text(&mut errors, "delivery_address", self.delivery_address.as_deref(), None);
        let notes = optional_text(&mut errors, "notes", self.notes.as_deref(), None);

        errors.into_result()?;
        Ok((items, delivery_address, notes))
    }
}
