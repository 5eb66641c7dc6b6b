use serde::Deserialize;

/// Stock rules that differ between deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InventoryPolicy {
    /// When `false`, any change that would leave an item below zero is
    /// rejected and the whole event is rolled back.
    pub allow_negative_stock: bool,
    /// When `true`, an inventory item used by any recipe cannot be deleted.
    pub guard_referenced_items: bool,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            allow_negative_stock: true,
            guard_referenced_items: true,
        }
    }
}

impl InventoryPolicy {
    pub fn strict() -> Self {
        Self {
            allow_negative_stock: false,
            guard_referenced_items: true,
        }
    }
}
