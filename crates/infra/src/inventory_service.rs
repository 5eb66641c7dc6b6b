use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use galley_core::{group_by_category, CategoryGroup, InventoryItemId};
use galley_inventory::{InventoryItem, ItemDraft, StockAdjustment, StockDirection};

use crate::errors::{ServiceError, ServiceResult};
use crate::policy::InventoryPolicy;
use crate::store::{settle, Database, StoreError};

/// Inventory item CRUD and manual stock adjustments.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<dyn Database>,
    policy: InventoryPolicy,
}

impl InventoryService {
    pub fn new(db: Arc<dyn Database>, policy: InventoryPolicy) -> Self {
        Self { db, policy }
    }

    #[instrument(skip(self, draft), err)]
    pub async fn create_item(&self, draft: &ItemDraft) -> ServiceResult<InventoryItem> {
        let fields = draft.validate()?;
        let item = InventoryItem::new(InventoryItemId::new(), fields, Utc::now());

        let mut tx = self.db.begin().await?;
        let result = tx.insert_item(&item).await.map_err(ServiceError::from);
        settle(tx, result).await?;

        info!(item_id = %item.id, name = %item.name, "inventory item created");
        Ok(item)
    }

    #[instrument(skip(self, draft), err)]
    pub async fn update_item(&self, id: InventoryItemId, draft: &ItemDraft) -> ServiceResult<InventoryItem> {
        let fields = draft.validate()?;

        let mut tx = self.db.begin().await?;
        let result: ServiceResult<InventoryItem> = async {
            let mut item = tx.lock_items(&[id]).await?.pop().ok_or(ServiceError::NotFound)?;
            item.apply_fields(fields, Utc::now());
            if !tx.update_item(&item).await? {
                return Err(ServiceError::NotFound);
            }
            Ok(item)
        }
        .await;
        settle(tx, result).await
    }

    /// Delete an item. With `guard_referenced_items`, items used by a recipe
    /// are kept and a conflict is returned.
    #[instrument(skip(self), err)]
    pub async fn delete_item(&self, id: InventoryItemId) -> ServiceResult<InventoryItem> {
        let mut tx = self.db.begin().await?;
        let result: ServiceResult<InventoryItem> = async {
            let item = tx.lock_items(&[id]).await?.pop().ok_or(ServiceError::NotFound)?;
            if self.policy.guard_referenced_items {
                let users = tx.recipes_using_item(id).await?;
                if !users.is_empty() {
                    return Err(ServiceError::Conflict(format!(
                        "inventory item is used by {} recipe(s)",
                        users.len()
                    )));
                }
            }
            tx.delete_item(id).await?;
            Ok(item)
        }
        .await;
        let item = settle(tx, result).await?;

        info!(item_id = %id, "inventory item deleted");
        Ok(item)
    }

    pub async fn get_item(&self, id: InventoryItemId) -> ServiceResult<InventoryItem> {
        let mut tx = self.db.begin().await?;
        let result: ServiceResult<InventoryItem> =
            async { tx.find_item(id).await?.ok_or(ServiceError::NotFound) }.await;
        settle(tx, result).await
    }

    /// Manual stock adjustment entered by staff. Returns the new quantity.
    #[instrument(skip(self), err)]
    pub async fn adjust_stock(
        &self,
        id: InventoryItemId,
        amount: Option<Decimal>,
        direction: Option<StockDirection>,
    ) -> ServiceResult<Decimal> {
        let adjustment = StockAdjustment::manual(amount, direction)?;

        let mut tx = self.db.begin().await?;
        let result: ServiceResult<Decimal> = async {
            let quantity = match tx.adjust_stock(id, adjustment).await {
                Err(StoreError::OutOfRange(_)) => {
                    return Err(ServiceError::validation("adjustment", "would take the stock out of range"));
                }
                other => other?.ok_or(ServiceError::NotFound)?,
            };
            if quantity < Decimal::ZERO {
                if !self.policy.allow_negative_stock {
                    return Err(ServiceError::validation("adjustment", "exceeds the quantity in stock"));
                }
                warn!(item_id = %id, %quantity, "inventory item stock is below zero");
            }
            Ok(quantity)
        }
        .await;
        let quantity = settle(tx, result).await?;

        info!(item_id = %id, delta = %adjustment.signed_delta(), %quantity, "stock adjusted");
        Ok(quantity)
    }

    /// Items grouped by category, name-ordered within each group.
    pub async fn list_by_category_then_name(&self) -> ServiceResult<Vec<CategoryGroup<InventoryItem>>> {
        let mut tx = self.db.begin().await?;
        let result = tx.list_items().await.map_err(ServiceError::from);
        let items = settle(tx, result).await?;
        Ok(group_by_category(items, |i| i.category.as_str()))
    }

    pub async fn list_low_stock(&self) -> ServiceResult<Vec<InventoryItem>> {
        let mut tx = self.db.begin().await?;
        let result = tx.list_low_stock().await.map_err(ServiceError::from);
        settle(tx, result).await
    }

    pub async fn item_categories(&self) -> ServiceResult<Vec<String>> {
        let mut tx = self.db.begin().await?;
        let result = tx.item_categories().await.map_err(ServiceError::from);
        settle(tx, result).await
    }
}
