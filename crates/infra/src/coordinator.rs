//! Recipe lifecycle coordinator.
//!
//! Every lifecycle event (create, update, delete) runs in one store
//! transaction that holds the recipe row and every touched inventory row:
//!
//! 1. lock the recipe (update/delete) and then the items, in ascending id order
//! 2. check that every *new* ingredient resolves (missing -> validation error)
//! 3. `release_all` the stored ingredients (missing -> integrity error)
//! 4. `apply_all` the new ingredients
//! 5. write the recipe and commit
//!
//! Image blobs are only deleted after the commit succeeded.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use galley_core::{group_by_category, CategoryGroup, InventoryItemId, RecipeId, ValidationErrors};
use galley_inventory::StockAdjustment;
use galley_recipes::{
    compute_cost, validate_ingredients, IngredientDraft, IngredientUse, Recipe, RecipeCost, RecipeDraft,
};

use crate::blob::{validate_image, ImageStore};
use crate::errors::{ServiceError, ServiceResult};
use crate::policy::InventoryPolicy;
use crate::store::{settle, Database, StoreError, Transaction};

/// Coordinates recipe writes with the inventory they consume.
#[derive(Clone)]
pub struct RecipeCoordinator {
    db: Arc<dyn Database>,
    images: Arc<dyn ImageStore>,
    policy: InventoryPolicy,
}

impl RecipeCoordinator {
    pub fn new(db: Arc<dyn Database>, images: Arc<dyn ImageStore>, policy: InventoryPolicy) -> Self {
        Self { db, images, policy }
    }

    #[instrument(skip(self, draft), fields(recipe_id = tracing::field::Empty), err)]
    pub async fn create_recipe(&self, draft: &RecipeDraft) -> ServiceResult<Recipe> {
        let body = draft.validate()?;
        let recipe = Recipe::new(RecipeId::new(), body, Utc::now());
        tracing::Span::current().record("recipe_id", tracing::field::display(recipe.id));

        let mut tx = self.db.begin().await?;
        let result: ServiceResult<()> = async {
            let ids: Vec<InventoryItemId> = recipe.ingredient_ids().collect();
            lock_and_check(&mut *tx, &ids, &recipe.ingredients).await?;
            apply_all(&mut *tx, &recipe.ingredients, self.policy).await?;
            tx.insert_recipe(&recipe).await?;
            Ok(())
        }
        .await;
        settle(tx, result).await?;

        info!(recipe_id = %recipe.id, ingredients = recipe.ingredients.len(), "recipe created");
        Ok(recipe)
    }

    #[instrument(skip(self, draft), err)]
    pub async fn update_recipe(&self, id: RecipeId, draft: &RecipeDraft) -> ServiceResult<Recipe> {
        let mut tx = self.db.begin().await?;
        let result: ServiceResult<Recipe> = async {
            let mut recipe = tx.lock_recipe(id).await?.ok_or(ServiceError::NotFound)?;
            let body = draft.validate()?;

            let ids: Vec<InventoryItemId> = recipe
                .ingredient_ids()
                .chain(body.ingredients.iter().map(|u| u.inventory_item_id))
                .collect();
            lock_and_check(&mut *tx, &ids, &body.ingredients).await?;

            release_all(&mut *tx, id, &recipe.ingredients).await?;
            apply_all(&mut *tx, &body.ingredients, self.policy).await?;

            recipe.replace_body(body, Utc::now());
            if !tx.update_recipe(&recipe).await? {
                return Err(ServiceError::NotFound);
            }
            Ok(recipe)
        }
        .await;
        let recipe = settle(tx, result).await?;

        info!(recipe_id = %recipe.id, ingredients = recipe.ingredients.len(), "recipe updated");
        Ok(recipe)
    }

    /// Delete a recipe and return stock to inventory. Returns the deleted record.
    #[instrument(skip(self), err)]
    pub async fn delete_recipe(&self, id: RecipeId) -> ServiceResult<Recipe> {
        let mut tx = self.db.begin().await?;
        let result: ServiceResult<Recipe> = async {
            let recipe = tx.lock_recipe(id).await?.ok_or(ServiceError::NotFound)?;
            let ids: Vec<InventoryItemId> = recipe.ingredient_ids().collect();
            tx.lock_items(&ids).await?;

            release_all(&mut *tx, id, &recipe.ingredients).await?;
            if !tx.delete_recipe(id).await? {
                return Err(ServiceError::NotFound);
            }
            Ok(recipe)
        }
        .await;
        let recipe = settle(tx, result).await?;

        info!(recipe_id = %recipe.id, "recipe deleted");
        if let Some(image) = &recipe.image {
            self.discard_image(image).await;
        }
        Ok(recipe)
    }

    /// Store a new photo for a recipe and drop the one it replaces.
    #[instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    pub async fn replace_image(&self, id: RecipeId, bytes: &[u8], content_type: &str) -> ServiceResult<Recipe> {
        let extension = validate_image(bytes, content_type)?;

        let mut tx = self.db.begin().await?;
        let mut recipe = match tx.lock_recipe(id).await {
            Ok(Some(recipe)) => recipe,
            Ok(None) => return settle(tx, Err(ServiceError::NotFound)).await,
            Err(e) => return settle(tx, Err(e.into())).await,
        };
        let reference = match self.images.store(bytes, extension).await {
            Ok(reference) => reference,
            Err(e) => return settle(tx, Err(e.into())).await,
        };

        let previous = recipe.set_image(Some(reference.clone()), Utc::now());
        let result = match tx.update_recipe(&recipe).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ServiceError::NotFound),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = settle(tx, result).await {
            self.discard_image(&reference).await;
            return Err(e);
        }

        info!(recipe_id = %id, image = %reference, "recipe image replaced");
        if let Some(previous) = previous {
            self.discard_image(&previous).await;
        }
        Ok(recipe)
    }

    /// Price ingredient uses against current inventory unit prices.
    ///
    /// Unlike a recipe draft, an empty list is accepted and costs nothing.
    pub async fn calculate_cost(&self, drafts: &[IngredientDraft]) -> ServiceResult<RecipeCost> {
        let mut errors = ValidationErrors::new();
        let uses = validate_ingredients(drafts, &mut errors, false);
        errors.into_result()?;

        let mut tx = self.db.begin().await?;
        let result: ServiceResult<RecipeCost> = async {
            let mut prices = std::collections::HashMap::new();
            for usage in &uses {
                if let Some(item) = tx.find_item(usage.inventory_item_id).await? {
                    prices.insert(item.id, item.unit_price);
                }
            }
            Ok(compute_cost(&uses, |id| prices.get(&id).copied())?)
        }
        .await;
        settle(tx, result).await
    }

    pub async fn get_recipe(&self, id: RecipeId) -> ServiceResult<Recipe> {
        let mut tx = self.db.begin().await?;
        let result: ServiceResult<Recipe> = async { tx.find_recipe(id).await?.ok_or(ServiceError::NotFound) }.await;
        settle(tx, result).await
    }

    /// Recipes grouped by category; categories sorted, names sorted within.
    pub async fn list_grouped_by_category(&self) -> ServiceResult<Vec<CategoryGroup<Recipe>>> {
        let mut tx = self.db.begin().await?;
        let result = tx.list_recipes().await.map_err(ServiceError::from);
        let recipes = settle(tx, result).await?;
        Ok(group_by_category(recipes, |r| r.category.as_str()))
    }

    pub async fn recipe_categories(&self) -> ServiceResult<Vec<String>> {
        let mut tx = self.db.begin().await?;
        let result = tx.recipe_categories().await.map_err(ServiceError::from);
        settle(tx, result).await
    }

    async fn discard_image(&self, reference: &str) {
        if let Err(e) = self.images.delete(reference).await {
            warn!(image = %reference, error = %e, "failed to delete recipe image");
        }
    }
}

/// Lock every id (deduplicated, ascending) and verify that each of `uses`
/// references a locked item.
async fn lock_and_check(
    tx: &mut dyn Transaction,
    ids: &[InventoryItemId],
    uses: &[IngredientUse],
) -> ServiceResult<()> {
    let locked = tx.lock_items(ids).await?;
    let known: HashSet<InventoryItemId> = locked.iter().map(|item| item.id).collect();

    let mut errors = ValidationErrors::new();
    for (idx, usage) in uses.iter().enumerate() {
        if !known.contains(&usage.inventory_item_id) {
            errors.push(format!("ingredients[{idx}].id"), "does not reference an inventory item");
        }
    }
    errors.into_result()?;
    Ok(())
}

/// Return every stored ingredient quantity to its item.
///
/// The uses come from a stored recipe, so a missing item is an integrity
/// failure rather than bad input.
async fn release_all(tx: &mut dyn Transaction, recipe_id: RecipeId, uses: &[IngredientUse]) -> ServiceResult<()> {
    for usage in uses {
        let adjusted = match tx
            .adjust_stock(usage.inventory_item_id, StockAdjustment::add(usage.quantity))
            .await
        {
            Err(StoreError::OutOfRange(_)) => {
                return Err(ServiceError::Conflict(format!(
                    "returning stock to inventory item {} would exceed the storable quantity",
                    usage.inventory_item_id
                )));
            }
            other => other?,
        };
        match adjusted {
            Some(quantity) => {
                debug!(item_id = %usage.inventory_item_id, released = %usage.quantity, %quantity, "stock released");
            }
            None => {
                error!(%recipe_id, item_id = %usage.inventory_item_id, "stored recipe references a missing inventory item");
                return Err(ServiceError::Integrity(format!(
                    "recipe {recipe_id} references missing inventory item {}",
                    usage.inventory_item_id
                )));
            }
        }
    }
    Ok(())
}

/// Subtract every new ingredient quantity from its item.
async fn apply_all(tx: &mut dyn Transaction, uses: &[IngredientUse], policy: InventoryPolicy) -> ServiceResult<()> {
    for (idx, usage) in uses.iter().enumerate() {
        let adjusted = match tx
            .adjust_stock(usage.inventory_item_id, StockAdjustment::subtract(usage.quantity))
            .await
        {
            Err(StoreError::OutOfRange(_)) => {
                return Err(ServiceError::validation(
                    format!("ingredients[{idx}].quantity"),
                    "would take the stock of the item out of range",
                ));
            }
            other => other?,
        };
        let quantity = adjusted.ok_or_else(|| {
            ServiceError::Integrity(format!("inventory item {} vanished while locked", usage.inventory_item_id))
        })?;
        debug!(item_id = %usage.inventory_item_id, consumed = %usage.quantity, %quantity, "stock consumed");

        if quantity < Decimal::ZERO {
            if !policy.allow_negative_stock {
                return Err(ServiceError::validation(
                    format!("ingredients[{idx}].quantity"),
                    "exceeds the quantity in stock",
                ));
            }
            warn!(item_id = %usage.inventory_item_id, %quantity, "inventory item stock is below zero");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryImageStore;
    use crate::inventory_service::InventoryService;
    use crate::store::{InMemoryDatabase, InventoryStore, RecipeStore};
    use galley_inventory::{InventoryItem, ItemDraft};

    struct Kitchen {
        db: Arc<InMemoryDatabase>,
        images: Arc<InMemoryImageStore>,
        inventory: InventoryService,
        recipes: RecipeCoordinator,
    }

    fn kitchen_with(policy: InventoryPolicy) -> Kitchen {
        let db = Arc::new(InMemoryDatabase::new());
        let images = Arc::new(InMemoryImageStore::new());
        Kitchen {
            inventory: InventoryService::new(db.clone(), policy),
            recipes: RecipeCoordinator::new(db.clone(), images.clone(), policy),
            db,
            images,
        }
    }

    fn kitchen() -> Kitchen {
        kitchen_with(InventoryPolicy::default())
    }

    impl Kitchen {
        async fn stock(&self, name: &str, quantity: i64, unit_price: Decimal, reorder_level: i64) -> InventoryItem {
            let draft = ItemDraft {
                name: name.to_string(),
                category: "Pantry".to_string(),
                quantity: Some(Decimal::from(quantity)),
                unit_price: Some(unit_price),
                unit_type: "kg".to_string(),
                reorder_level: Some(reorder_level),
                ..ItemDraft::default()
            };
            self.inventory.create_item(&draft).await.unwrap()
        }

        async fn quantity(&self, id: InventoryItemId) -> Decimal {
            self.inventory.get_item(id).await.unwrap().quantity
        }
    }

    fn recipe(name: &str, uses: &[(InventoryItemId, Decimal)]) -> RecipeDraft {
        RecipeDraft {
            name: name.to_string(),
            category: "Mains".to_string(),
            description: "House special".to_string(),
            instructions: vec!["Cook".to_string()],
            ingredients: uses
                .iter()
                .map(|(id, q)| IngredientDraft {
                    id: Some(*id),
                    quantity: Some(*q),
                })
                .collect(),
            preparation_time: Some(10),
            cooking_time: Some(20),
            serving_size: Some(2),
            cost_per_serving: Some(Decimal::new(450, 2)),
            ..RecipeDraft::default()
        }
    }

    fn field_names(err: &ServiceError) -> Vec<String> {
        match err {
            ServiceError::Validation(errors) => errors.fields().iter().map(|f| f.field.clone()).collect(),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_consumes_and_delete_restores_stock() {
        let k = kitchen();
        let flour = k.stock("Flour", 10, Decimal::ONE, 2).await;
        let eggs = k.stock("Eggs", 12, Decimal::ONE, 2).await;

        let created = k
            .recipes
            .create_recipe(&recipe("Pasta", &[(flour.id, Decimal::new(25, 1)), (eggs.id, Decimal::from(3))]))
            .await
            .unwrap();

        assert_eq!(k.quantity(flour.id).await, Decimal::new(75, 1));
        assert_eq!(k.quantity(eggs.id).await, Decimal::from(9));

        k.recipes.delete_recipe(created.id).await.unwrap();

        assert_eq!(k.quantity(flour.id).await, Decimal::from(10));
        assert_eq!(k.quantity(eggs.id).await, Decimal::from(12));
        assert!(matches!(k.recipes.get_recipe(created.id).await, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn update_releases_old_before_applying_new() {
        let k = kitchen();
        let item = k.stock("Rice", 10, Decimal::ONE, 5).await;

        let created = k
            .recipes
            .create_recipe(&recipe("Risotto", &[(item.id, Decimal::from(4))]))
            .await
            .unwrap();
        let after_create = k.inventory.get_item(item.id).await.unwrap();
        assert_eq!(after_create.quantity, Decimal::from(6));
        assert!(!after_create.is_low_stock());

        k.recipes
            .update_recipe(created.id, &recipe("Risotto", &[(item.id, Decimal::from(8))]))
            .await
            .unwrap();
        let after_update = k.inventory.get_item(item.id).await.unwrap();
        assert_eq!(after_update.quantity, Decimal::from(2));
        assert!(after_update.is_low_stock());
    }

    #[tokio::test]
    async fn update_with_identical_body_leaves_stock_unchanged() {
        let k = kitchen();
        let a = k.stock("Tomato", 20, Decimal::ONE, 5).await;
        let b = k.stock("Basil", 5, Decimal::ONE, 1).await;
        let draft = recipe("Sauce", &[(a.id, Decimal::from(3)), (b.id, Decimal::new(5, 1)), (a.id, Decimal::ONE)]);

        let created = k.recipes.create_recipe(&draft).await.unwrap();
        let before = (k.quantity(a.id).await, k.quantity(b.id).await);

        k.recipes.update_recipe(created.id, &draft).await.unwrap();

        assert_eq!((k.quantity(a.id).await, k.quantity(b.id).await), before);
    }

    #[tokio::test]
    async fn delete_returns_stock_on_top_of_current_quantity() {
        let k = kitchen();
        let item = k.stock("Butter", 5, Decimal::ONE, 1).await;
        let created = k
            .recipes
            .create_recipe(&recipe("Toast", &[(item.id, Decimal::from(2))]))
            .await
            .unwrap();
        assert_eq!(k.quantity(item.id).await, Decimal::from(3));

        k.recipes.delete_recipe(created.id).await.unwrap();

        assert_eq!(k.quantity(item.id).await, Decimal::from(5));
    }

    #[tokio::test]
    async fn create_with_unknown_item_is_rejected_without_mutation() {
        let k = kitchen();
        let item = k.stock("Salt", 10, Decimal::ONE, 1).await;

        let err = k
            .recipes
            .create_recipe(&recipe(
                "Mystery",
                &[(item.id, Decimal::ONE), (InventoryItemId::new(), Decimal::ONE)],
            ))
            .await
            .unwrap_err();

        assert_eq!(field_names(&err), vec!["ingredients[1].id"]);
        assert_eq!(k.quantity(item.id).await, Decimal::from(10));
        assert!(k.recipes.list_grouped_by_category().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_draft_reports_every_field() {
        let k = kitchen();
        let mut draft = recipe("", &[]);
        draft.ingredients.push(IngredientDraft {
            id: None,
            quantity: Some(Decimal::ZERO),
        });

        let err = k.recipes.create_recipe(&draft).await.unwrap_err();

        let fields = field_names(&err);
        assert!(fields.contains(&"name".to_string()));
        assert!(fields.contains(&"ingredients[0].id".to_string()));
        assert!(fields.contains(&"ingredients[0].quantity".to_string()));
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let k = kitchen();
        let item = k.stock("Oil", 3, Decimal::ONE, 1).await;
        let draft = recipe("Fry", &[(item.id, Decimal::ONE)]);

        assert!(matches!(
            k.recipes.update_recipe(RecipeId::new(), &draft).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(k.recipes.delete_recipe(RecipeId::new()).await, Err(ServiceError::NotFound)));
        assert_eq!(k.quantity(item.id).await, Decimal::from(3));
    }

    async fn remove_item_behind_coordinator(k: &Kitchen, id: InventoryItemId) {
        let mut tx = k.db.begin().await.unwrap();
        assert!(tx.delete_item(id).await.unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn vanished_stored_ingredient_is_an_integrity_error_and_rolls_back() {
        let k = kitchen();
        let kept = k.stock("Cheese", 10, Decimal::ONE, 1).await;
        let doomed = k.stock("Truffle", 10, Decimal::ONE, 1).await;
        let created = k
            .recipes
            .create_recipe(&recipe("Pizza", &[(kept.id, Decimal::from(2)), (doomed.id, Decimal::ONE)]))
            .await
            .unwrap();
        remove_item_behind_coordinator(&k, doomed.id).await;

        let update = k
            .recipes
            .update_recipe(created.id, &recipe("Pizza", &[(kept.id, Decimal::from(5))]))
            .await;
        assert!(matches!(update, Err(ServiceError::Integrity(_))), "got {update:?}");

        let delete = k.recipes.delete_recipe(created.id).await;
        assert!(matches!(delete, Err(ServiceError::Integrity(_))), "got {delete:?}");

        assert_eq!(k.quantity(kept.id).await, Decimal::from(8));
        assert_eq!(k.recipes.get_recipe(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn strict_policy_rejects_overdraw_and_keeps_stock() {
        let k = kitchen_with(InventoryPolicy::strict());
        let a = k.stock("Lobster", 5, Decimal::ONE, 1).await;
        let b = k.stock("Lemon", 1, Decimal::ONE, 0).await;

        let err = k
            .recipes
            .create_recipe(&recipe("Thermidor", &[(a.id, Decimal::from(2)), (b.id, Decimal::from(2))]))
            .await
            .unwrap_err();

        assert_eq!(field_names(&err), vec!["ingredients[1].quantity"]);
        assert_eq!(k.quantity(a.id).await, Decimal::from(5));
        assert_eq!(k.quantity(b.id).await, Decimal::ONE);
    }

    #[tokio::test]
    async fn default_policy_allows_stock_below_zero() {
        let k = kitchen();
        let item = k.stock("Saffron", 1, Decimal::ONE, 0).await;

        k.recipes
            .create_recipe(&recipe("Paella", &[(item.id, Decimal::new(15, 1))]))
            .await
            .unwrap();

        assert_eq!(k.quantity(item.id).await, Decimal::new(-5, 1));
    }

    #[tokio::test]
    async fn cost_uses_current_unit_prices() {
        let k = kitchen();
        let a = k.stock("A", 10, Decimal::new(150, 2), 1).await;
        let b = k.stock("B", 10, Decimal::new(200, 2), 1).await;

        let cost = k
            .recipes
            .calculate_cost(&[
                IngredientDraft {
                    id: Some(a.id),
                    quantity: Some(Decimal::from(2)),
                },
                IngredientDraft {
                    id: Some(b.id),
                    quantity: Some(Decimal::from(3)),
                },
            ])
            .await
            .unwrap();

        assert_eq!(cost.total_cost, Decimal::new(900, 2));
        assert_eq!(cost.suggested_price, Decimal::new(1350, 2));
        assert_eq!(k.quantity(a.id).await, Decimal::from(10));
    }

    #[tokio::test]
    async fn cost_of_nothing_is_zero_and_unknown_items_are_reported() {
        let k = kitchen();
        let cost = k.recipes.calculate_cost(&[]).await.unwrap();
        assert_eq!(cost.total_cost, Decimal::ZERO);

        let err = k
            .recipes
            .calculate_cost(&[IngredientDraft {
                id: Some(InventoryItemId::new()),
                quantity: Some(Decimal::ONE),
            }])
            .await
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["ingredients[0].id"]);
    }

    #[tokio::test]
    async fn image_replacement_and_recipe_delete_clean_up_blobs() {
        let k = kitchen();
        let item = k.stock("Flour", 10, Decimal::ONE, 1).await;
        let created = k
            .recipes
            .create_recipe(&recipe("Bread", &[(item.id, Decimal::ONE)]))
            .await
            .unwrap();

        let first = k.recipes.replace_image(created.id, b"one", "image/png").await.unwrap();
        let first_ref = first.image.clone().unwrap();
        let second = k.recipes.replace_image(created.id, b"two", "image/jpeg").await.unwrap();
        let second_ref = second.image.clone().unwrap();

        assert!(!k.images.contains(&first_ref));
        assert!(k.images.contains(&second_ref));
        assert!(second_ref.ends_with(".jpg"));

        // Editing the recipe keeps its image.
        let updated = k
            .recipes
            .update_recipe(created.id, &recipe("Bread", &[(item.id, Decimal::from(2))]))
            .await
            .unwrap();
        assert_eq!(updated.image.as_deref(), Some(second_ref.as_str()));

        k.recipes.delete_recipe(created.id).await.unwrap();
        assert!(k.images.is_empty());
    }

    #[tokio::test]
    async fn image_validation_and_missing_recipe() {
        let k = kitchen();
        assert!(matches!(
            k.recipes.replace_image(RecipeId::new(), b"png", "image/png").await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            k.recipes.replace_image(RecipeId::new(), b"txt", "text/plain").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(k.images.is_empty());
    }

    #[tokio::test]
    async fn listing_groups_by_category() {
        let k = kitchen();
        let item = k.stock("Sugar", 100, Decimal::ONE, 1).await;
        for (name, category) in [("Tart", "Desserts"), ("Stew", "Mains"), ("Flan", "Desserts")] {
            let mut draft = recipe(name, &[(item.id, Decimal::ONE)]);
            draft.category = category.to_string();
            k.recipes.create_recipe(&draft).await.unwrap();
        }

        let groups = k.recipes.list_grouped_by_category().await.unwrap();
        let shape: Vec<(String, Vec<String>)> = groups
            .into_iter()
            .map(|g| (g.category, g.items.into_iter().map(|r| r.name).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("Desserts".to_string(), vec!["Flan".to_string(), "Tart".to_string()]),
                ("Mains".to_string(), vec!["Stew".to_string()]),
            ]
        );
        assert_eq!(k.recipes.recipe_categories().await.unwrap(), vec!["Desserts", "Mains"]);
    }

    #[tokio::test]
    async fn oversized_quantities_are_rejected_without_touching_stock() {
        let k = kitchen();
        let item = k.stock("Truffle", 10, Decimal::from(2), 1).await;

        let huge = IngredientDraft {
            id: Some(item.id),
            quantity: Some(Decimal::MAX),
        };
        let err = k.recipes.calculate_cost(&[huge.clone()]).await.unwrap_err();
        assert_eq!(field_names(&err), vec!["ingredients[0].quantity"]);

        let err = k
            .recipes
            .create_recipe(&recipe("Excess", &[(item.id, Decimal::MAX), (item.id, Decimal::MAX)]))
            .await
            .unwrap_err();
        assert_eq!(field_names(&err), vec!["ingredients[0].quantity", "ingredients[1].quantity"]);
        assert_eq!(k.quantity(item.id).await, Decimal::from(10));
    }

    #[tokio::test]
    async fn consumption_beyond_the_stock_range_rolls_back() {
        let k = kitchen();
        let item = k.stock("Salt", 0, Decimal::ONE, 0).await;
        let max = galley_recipes::MAX_INGREDIENT_QUANTITY;

        let err = k
            .recipes
            .create_recipe(&recipe("Brine", &[(item.id, max), (item.id, max)]))
            .await
            .unwrap_err();

        assert_eq!(field_names(&err), vec!["ingredients[1].quantity"]);
        assert_eq!(k.quantity(item.id).await, Decimal::ZERO);
        assert!(k.recipes.list_grouped_by_category().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn release_beyond_the_stock_range_is_a_conflict_and_keeps_the_recipe() {
        let k = kitchen();
        let full = 999_999_999_999i64;
        let item = k.stock("Water", full, Decimal::ONE, 0).await;

        let created = k
            .recipes
            .create_recipe(&recipe("Broth", &[(item.id, Decimal::from(10))]))
            .await
            .unwrap();
        k.inventory
            .adjust_stock(item.id, Some(Decimal::from(10)), Some(galley_inventory::StockDirection::Add))
            .await
            .unwrap();

        let err = k.recipes.delete_recipe(created.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)), "got {err:?}");
        assert_eq!(k.quantity(item.id).await, Decimal::from(full));
        assert_eq!(k.recipes.get_recipe(created.id).await.unwrap(), created);
    }

    /// Database whose transactions fail every recipe write.
    struct BrokenRecipeWrites(InMemoryDatabase);

    struct BrokenTx(Box<dyn Transaction>);

    #[async_trait::async_trait]
    impl Database for BrokenRecipeWrites {
        async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
            Ok(Box::new(BrokenTx(self.0.begin().await?)))
        }
    }

    #[async_trait::async_trait]
    impl InventoryStore for BrokenTx {
        async fn lock_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError> {
            self.0.lock_items(ids).await
        }
        async fn find_item(&mut self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
            self.0.find_item(id).await
        }
        async fn insert_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
            self.0.insert_item(item).await
        }
        async fn update_item(&mut self, item: &InventoryItem) -> Result<bool, StoreError> {
            self.0.update_item(item).await
        }
        async fn delete_item(&mut self, id: InventoryItemId) -> Result<bool, StoreError> {
            self.0.delete_item(id).await
        }
        async fn adjust_stock(
            &mut self,
            id: InventoryItemId,
            adjustment: StockAdjustment,
        ) -> Result<Option<Decimal>, StoreError> {
            self.0.adjust_stock(id, adjustment).await
        }
        async fn list_items(&mut self) -> Result<Vec<InventoryItem>, StoreError> {
            self.0.list_items().await
        }
        async fn list_low_stock(&mut self) -> Result<Vec<InventoryItem>, StoreError> {
            self.0.list_low_stock().await
        }
        async fn item_categories(&mut self) -> Result<Vec<String>, StoreError> {
            self.0.item_categories().await
        }
    }

    #[async_trait::async_trait]
    impl RecipeStore for BrokenTx {
        async fn find_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
            self.0.find_recipe(id).await
        }
        async fn lock_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
            self.0.lock_recipe(id).await
        }
        async fn insert_recipe(&mut self, _recipe: &Recipe) -> Result<(), StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
        async fn update_recipe(&mut self, _recipe: &Recipe) -> Result<bool, StoreError> {
            Err(StoreError::Backend("disk full".to_string()))
        }
        async fn delete_recipe(&mut self, id: RecipeId) -> Result<bool, StoreError> {
            self.0.delete_recipe(id).await
        }
        async fn list_recipes(&mut self) -> Result<Vec<Recipe>, StoreError> {
            self.0.list_recipes().await
        }
        async fn recipe_categories(&mut self) -> Result<Vec<String>, StoreError> {
            self.0.recipe_categories().await
        }
        async fn recipes_using_item(&mut self, item: InventoryItemId) -> Result<Vec<RecipeId>, StoreError> {
            self.0.recipes_using_item(item).await
        }
    }

    #[async_trait::async_trait]
    impl Transaction for BrokenTx {
        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            self.0.commit().await
        }
        async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
            self.0.rollback().await
        }
    }

    #[tokio::test]
    async fn storage_failure_rolls_back_stock_changes() {
        let healthy = kitchen();
        let item = healthy.stock("Beef", 10, Decimal::ONE, 1).await;
        let created = healthy
            .recipes
            .create_recipe(&recipe("Stew", &[(item.id, Decimal::from(3))]))
            .await
            .unwrap();

        let broken = RecipeCoordinator::new(
            Arc::new(BrokenRecipeWrites((*healthy.db).clone())),
            healthy.images.clone(),
            InventoryPolicy::default(),
        );

        let create = broken.create_recipe(&recipe("Roast", &[(item.id, Decimal::from(4))])).await;
        assert!(matches!(create, Err(ServiceError::Store(StoreError::Backend(_)))));

        let update = broken
            .update_recipe(created.id, &recipe("Stew", &[(item.id, Decimal::from(9))]))
            .await;
        assert!(matches!(update, Err(ServiceError::Store(StoreError::Backend(_)))));

        assert_eq!(healthy.quantity(item.id).await, Decimal::from(7));
        assert_eq!(healthy.recipes.get_recipe(created.id).await.unwrap(), created);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn runtime() -> tokio::runtime::Runtime {
            tokio::runtime::Builder::new_current_thread().build().unwrap()
        }

        proptest! {
            /// Property: deleting a freshly created recipe restores every touched quantity,
            /// and re-submitting the same body in between changes nothing.
            #[test]
            fn create_update_delete_round_trip_restores_stock(
                stock in proptest::collection::vec(0i64..1_000, 1..5),
                uses in proptest::collection::vec((0usize..5, 1i64..50_000), 1..8)
            ) {
                runtime().block_on(async {
                    let k = kitchen();
                    let mut items = Vec::new();
                    for (i, q) in stock.iter().enumerate() {
                        items.push(k.stock(&format!("item-{i}"), *q, Decimal::ONE, 0).await);
                    }
                    let lines: Vec<(InventoryItemId, Decimal)> = uses
                        .iter()
                        .map(|(i, q)| (items[i % items.len()].id, Decimal::new(*q, 2)))
                        .collect();
                    let draft = recipe("Prop", &lines);

                    let created = k.recipes.create_recipe(&draft).await.unwrap();
                    for item in &items {
                        let consumed: Decimal = lines.iter().filter(|(id, _)| *id == item.id).map(|(_, q)| *q).sum();
                        assert_eq!(k.quantity(item.id).await, item.quantity - consumed);
                    }

                    let mid: Vec<Decimal> = {
                        let mut v = Vec::new();
                        for item in &items { v.push(k.quantity(item.id).await); }
                        v
                    };
                    k.recipes.update_recipe(created.id, &draft).await.unwrap();
                    for (item, before) in items.iter().zip(&mid) {
                        assert_eq!(k.quantity(item.id).await, *before);
                    }

                    k.recipes.delete_recipe(created.id).await.unwrap();
                    for item in &items {
                        assert_eq!(k.quantity(item.id).await, item.quantity);
                    }
                });
            }
        }
    }
}
