use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use galley_core::{Entity, InventoryItemId, RecipeId};
use galley_inventory::{sort_by_category_then_name, InventoryItem, StockAdjustment};
use galley_recipes::Recipe;

use super::r#trait::{Database, InventoryStore, RecipeStore, StoreError, Transaction};

#[derive(Debug, Clone, Default)]
struct Tables {
    items: HashMap<InventoryItemId, InventoryItem>,
    recipes: HashMap<RecipeId, Recipe>,
}

/// In-memory store.
///
/// Intended for tests/dev. Transactions are fully serialized: one transaction
/// holds the store lock from `begin` until it is committed, rolled back or
/// dropped, and works on a private copy of the tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Database for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }
}

/// Transaction over [`InMemoryDatabase`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

fn insert_new<E: Entity + Clone>(table: &mut HashMap<E::Id, E>, record: &E, kind: &str) -> Result<(), StoreError> {
    let id = record.id();
    if table.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{kind} {id} already exists")));
    }
    table.insert(id, record.clone());
    Ok(())
}

/// Replace a stored record; `false` when there is nothing to replace.
fn replace<E: Entity + Clone>(table: &mut HashMap<E::Id, E>, record: &E) -> bool {
    match table.get_mut(&record.id()) {
        Some(existing) => {
            *existing = record.clone();
            true
        }
        None => false,
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryTransaction {
    async fn lock_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError> {
        let ids: BTreeSet<InventoryItemId> = ids.iter().copied().collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.working.items.get(&id).cloned())
            .collect())
    }

    async fn find_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        insert_new(&mut self.working.items, item, "inventory item")
    }

    async fn update_item(&mut self, item: &InventoryItem) -> Result<bool, StoreError> {
        Ok(replace(&mut self.working.items, item))
    }

    async fn delete_item(&mut self, id: InventoryItemId) -> Result<bool, StoreError> {
        Ok(self.working.items.remove(&id).is_some())
    }

    async fn adjust_stock(
        &mut self,
        id: InventoryItemId,
        adjustment: StockAdjustment,
    ) -> Result<Option<Decimal>, StoreError> {
        let Some(item) = self.working.items.get_mut(&id) else {
            return Ok(None);
        };
        item.adjust(adjustment, Utc::now())
            .map(Some)
            .ok_or_else(|| StoreError::OutOfRange(format!("stock of inventory item {id} would leave the storable range")))
    }

    async fn list_items(&mut self) -> Result<Vec<InventoryItem>, StoreError> {
        let mut items: Vec<InventoryItem> = self.working.items.values().cloned().collect();
        sort_by_category_then_name(&mut items);
        Ok(items)
    }

    async fn list_low_stock(&mut self) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(galley_inventory::low_stock(self.working.items.values().cloned()))
    }

    async fn item_categories(&mut self) -> Result<Vec<String>, StoreError> {
        let categories: BTreeSet<String> = self.working.items.values().map(|i| i.category.clone()).collect();
        Ok(categories.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl RecipeStore for InMemoryTransaction {
    async fn find_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.working.recipes.get(&id).cloned())
    }

    async fn lock_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        // The whole store is already locked by this transaction.
        self.find_recipe(id).await
    }

    async fn insert_recipe(&mut self, recipe: &Recipe) -> Result<(), StoreError> {
        insert_new(&mut self.working.recipes, recipe, "recipe")
    }

    async fn update_recipe(&mut self, recipe: &Recipe) -> Result<bool, StoreError> {
        Ok(replace(&mut self.working.recipes, recipe))
    }

    async fn delete_recipe(&mut self, id: RecipeId) -> Result<bool, StoreError> {
        Ok(self.working.recipes.remove(&id).is_some())
    }

    async fn list_recipes(&mut self) -> Result<Vec<Recipe>, StoreError> {
        let mut recipes: Vec<Recipe> = self.working.recipes.values().cloned().collect();
        recipes.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(recipes)
    }

    async fn recipe_categories(&mut self) -> Result<Vec<String>, StoreError> {
        let categories: BTreeSet<String> = self
            .working
            .recipes
            .values()
            .map(|r| r.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn recipes_using_item(&mut self, item: InventoryItemId) -> Result<Vec<RecipeId>, StoreError> {
        let mut ids: Vec<RecipeId> = self
            .working
            .recipes
            .values()
            .filter(|r| r.ingredient_ids().any(|id| id == item))
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
