//! Inventory domain module.
//!
//! Business rules for stocked ingredients: item validation, stock adjustment
//! arithmetic and the low-stock rule. Pure domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod stock;

pub use item::{InventoryItem, ItemDraft, ItemFields};
pub use stock::{low_stock, sort_by_category_then_name, StockAdjustment, StockDirection, MAX_STOCK_QUANTITY};
