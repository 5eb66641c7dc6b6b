//! Customer and order records.
//!
//! Peripheral CRUD data: nothing here takes part in the inventory/recipe
//! stock protocol.

pub mod customer;
pub mod order;

pub use customer::{format_phone, Customer, CustomerDraft, CustomerFields};
pub use order::{Order, OrderDraft, OrderItem, OrderStatus, PaymentStatus};
