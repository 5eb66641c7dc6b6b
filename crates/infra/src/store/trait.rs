use rust_decimal::Decimal;
use thiserror::Error;

use galley_core::{InventoryItemId, RecipeId};
use galley_inventory::{InventoryItem, StockAdjustment};
use galley_recipes::Recipe;

/// Persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend refused the transaction because of concurrent activity
    /// (deadlock, serialization failure, duplicate key). Safe to retry.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// A stock change would leave the storable quantity range. Nothing was
    /// written.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// A stored row could not be decoded into a domain record.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    /// Any other backend failure (connection, pool, SQL error).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Inventory operations available inside a transaction.
///
/// Every listing is ordered by category, then name.
#[async_trait::async_trait]
pub trait InventoryStore: Send {
    /// Lock the given items for the rest of the transaction and return those
    /// that exist. Locks are taken in ascending id order; duplicates are ignored.
    async fn lock_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError>;

    async fn find_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError>;

    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError>;

    /// Returns `false` when the item does not exist.
    async fn update_item(&mut self, item: &InventoryItem) -> Result<bool, StoreError>;

    /// Returns `false` when the item does not exist.
    async fn delete_item(&mut self, id: InventoryItemId) -> Result<bool, StoreError>;

    /// Atomic update-by-delta. Returns the new quantity, or `None` when the
    /// item does not exist. No floor is enforced here; a balance beyond
    /// `±MAX_STOCK_QUANTITY` fails with [`StoreError::OutOfRange`].
    async fn adjust_stock(
        &mut self,
        id: InventoryItemId,
        adjustment: StockAdjustment,
    ) -> Result<Option<Decimal>, StoreError>;

    async fn list_items(&mut self) -> Result<Vec<InventoryItem>, StoreError>;

    /// Items with `quantity <= reorder_level`.
    async fn list_low_stock(&mut self) -> Result<Vec<InventoryItem>, StoreError>;

    /// Distinct item categories, sorted.
    async fn item_categories(&mut self) -> Result<Vec<String>, StoreError>;
}

/// Recipe operations available inside a transaction.
#[async_trait::async_trait]
pub trait RecipeStore: Send {
    async fn find_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    /// Like `find_recipe`, but holds a write lock on the row until the
    /// transaction ends.
    async fn lock_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    async fn insert_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError>;

    /// Returns `false` when the recipe does not exist.
    async fn update_recipe(&mut self, recipe: &Recipe) -> Result<bool, StoreError>;

    /// Returns `false` when the recipe does not exist.
    async fn delete_recipe(&mut self, id: RecipeId) -> Result<bool, StoreError>;

    /// All recipes, ordered by category then name.
    async fn list_recipes(&mut self) -> Result<Vec<Recipe>, StoreError>;

    /// Distinct non-empty recipe categories, sorted.
    async fn recipe_categories(&mut self) -> Result<Vec<String>, StoreError>;

    /// Recipes with at least one ingredient use of `item`.
    async fn recipes_using_item(&mut self, item: InventoryItemId) -> Result<Vec<RecipeId>, StoreError>;
}

/// One unit of work against the store.
///
/// Nothing done through a transaction is visible to others until `commit`.
/// Dropping a transaction without committing discards its changes.
#[async_trait::async_trait]
pub trait Transaction: InventoryStore + RecipeStore {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Entry point to the store: hands out transactions.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

#[async_trait::async_trait]
impl<D> Database for std::sync::Arc<D>
where
    D: Database + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        (**self).begin().await
    }
}
