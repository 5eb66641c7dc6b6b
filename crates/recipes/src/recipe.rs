use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use galley_core::validation::{required, required_text};
use galley_core::{DomainError, DomainResult, Entity, InventoryItemId, RecipeId, ValidationErrors, ValueObject};

pub const NAME_MAX_LEN: usize = 255;
pub const CATEGORY_MAX_LEN: usize = 255;

/// Category value that asks for `new_category` to be used instead.
pub const NEW_CATEGORY_TOKEN: &str = "new";

/// Smallest accepted ingredient quantity (0.01).
pub const MIN_INGREDIENT_QUANTITY: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest accepted ingredient quantity (999 999 999 999.99), the stock
/// column's range.
pub const MAX_INGREDIENT_QUANTITY: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Largest cost per serving (9 999 999 999.99).
pub const MAX_COST_PER_SERVING: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Upper bound for minutes and serving sizes.
pub const MAX_WHOLE_NUMBER: i64 = i32::MAX as i64;

const MAX_SCALE: u32 = 2;

/// Quantity of one inventory item consumed by a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientUse {
    pub inventory_item_id: InventoryItemId,
    pub quantity: Decimal,
}

impl ValueObject for IngredientUse {}

impl IngredientUse {
    pub fn new(inventory_item_id: InventoryItemId, quantity: Decimal) -> Self {
        Self {
            inventory_item_id,
            quantity,
        }
    }
}

/// Unvalidated ingredient entry, as submitted by the recipe form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngredientDraft {
    #[serde(alias = "inventory_item_id")]
    pub id: Option<InventoryItemId>,
    pub quantity: Option<Decimal>,
}

impl From<IngredientUse> for IngredientDraft {
    fn from(value: IngredientUse) -> Self {
        Self {
            id: Some(value.inventory_item_id),
            quantity: Some(value.quantity),
        }
    }
}

/// Validate ingredient entries, reporting under `ingredients[i].*`.
///
/// Existence of the referenced inventory items is checked later, against the
/// store, inside the transaction that consumes the stock.
pub fn validate_ingredients(
    drafts: &[IngredientDraft],
    errors: &mut ValidationErrors,
    require_non_empty: bool,
) -> Vec<IngredientUse> {
    if require_non_empty && drafts.is_empty() {
        errors.push("ingredients", "must contain at least one ingredient");
    }

    let mut uses = Vec::with_capacity(drafts.len());
    for (idx, draft) in drafts.iter().enumerate() {
        let id = required(errors, &format!("ingredients[{idx}].id"), draft.id);
        let field = format!("ingredients[{idx}].quantity");
        let quantity = required(errors, &field, draft.quantity).filter(|q| {
            if *q < MIN_INGREDIENT_QUANTITY {
                errors.push(&field, "must be at least 0.01");
                false
            } else if *q > MAX_INGREDIENT_QUANTITY {
                errors.push(&field, format!("may not be greater than {MAX_INGREDIENT_QUANTITY}"));
                false
            } else if q.normalize().scale() > MAX_SCALE {
                errors.push(&field, "may have at most 2 decimal places");
                false
            } else {
                true
            }
        });

        if let (Some(id), Some(quantity)) = (id, quantity) {
            uses.push(IngredientUse::new(id, quantity.normalize()));
        }
    }
    uses
}

/// Unvalidated create/edit input for a recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeDraft {
    pub name: String,
    /// Existing category, or [`NEW_CATEGORY_TOKEN`] to use `new_category`.
    pub category: String,
    pub new_category: Option<String>,
    pub description: String,
    pub instructions: Vec<String>,
    pub ingredients: Vec<IngredientDraft>,
    pub preparation_time: Option<i64>,
    pub cooking_time: Option<i64>,
    pub serving_size: Option<i64>,
    pub cost_per_serving: Option<Decimal>,
}

/// Validated recipe content (everything but identity, image and timestamps).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBody {
    pub name: String,
    pub category: String,
    pub description: String,
    pub instructions: Vec<String>,
    pub ingredients: Vec<IngredientUse>,
    pub preparation_time: i64,
    pub cooking_time: i64,
    pub serving_size: i64,
    pub cost_per_serving: Decimal,
}

impl RecipeDraft {
    pub fn validate(&self) -> DomainResult<RecipeBody> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", &self.name, NAME_MAX_LEN);
        let category = self.resolve_category(&mut errors);
        let description = required_text(&mut errors, "description", &self.description, usize::MAX);

        if self.instructions.is_empty() {
            errors.push("instructions", "must contain at least one step");
        }
        let instructions: Vec<String> = self
            .instructions
            .iter()
            .enumerate()
            .filter_map(|(idx, step)| required_text(&mut errors, &format!("instructions[{idx}]"), step, usize::MAX))
            .collect();

        let ingredients = validate_ingredients(&self.ingredients, &mut errors, true);

        let preparation_time = non_negative(&mut errors, "preparation_time", self.preparation_time, 0);
        let cooking_time = non_negative(&mut errors, "cooking_time", self.cooking_time, 0);
        let serving_size = non_negative(&mut errors, "serving_size", self.serving_size, 1);

        let cost_per_serving = required(&mut errors, "cost_per_serving", self.cost_per_serving).filter(|c| {
            if *c < Decimal::ZERO {
                errors.push("cost_per_serving", "must be at least 0");
                false
            } else if *c > MAX_COST_PER_SERVING {
                errors.push("cost_per_serving", format!("may not be greater than {MAX_COST_PER_SERVING}"));
                false
            } else if c.normalize().scale() > MAX_SCALE {
                errors.push("cost_per_serving", "may have at most 2 decimal places");
                false
            } else {
                true
            }
        });

        errors.into_result()?;

        match (name, category, description, preparation_time, cooking_time, serving_size, cost_per_serving) {
            (
                Some(name),
                Some(category),
                Some(description),
                Some(preparation_time),
                Some(cooking_time),
                Some(serving_size),
                Some(cost_per_serving),
            ) => Ok(RecipeBody {
                name,
                category,
                description,
                instructions,
                ingredients,
                preparation_time,
                cooking_time,
                serving_size,
                cost_per_serving,
            }),
            _ => Err(DomainError::validation("recipe", "incomplete input")),
        }
    }

    fn resolve_category(&self, errors: &mut ValidationErrors) -> Option<String> {
        if self.category.trim() == NEW_CATEGORY_TOKEN {
            let new_category = self.new_category.as_deref().unwrap_or_default();
            return required_text(errors, "new_category", new_category, CATEGORY_MAX_LEN);
        }
        required_text(errors, "category", &self.category, CATEGORY_MAX_LEN)
    }
}

fn non_negative(errors: &mut ValidationErrors, field: &str, value: Option<i64>, min: i64) -> Option<i64> {
    required(errors, field, value).filter(|v| {
        if *v < min {
            errors.push(field, format!("must be at least {min}"));
            false
        } else if *v > MAX_WHOLE_NUMBER {
            errors.push(field, format!("may not be greater than {MAX_WHOLE_NUMBER}"));
            false
        } else {
            true
        }
    })
}

/// Stored recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub instructions: Vec<String>,
    pub ingredients: Vec<IngredientUse>,
    /// Minutes.
    pub preparation_time: i64,
    /// Minutes.
    pub cooking_time: i64,
    pub serving_size: i64,
    /// As entered by staff; may be stale relative to current unit prices.
    pub cost_per_serving: Decimal,
    /// Blob storage reference of the recipe photo.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(id: RecipeId, body: RecipeBody, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: body.name,
            category: body.category,
            description: body.description,
            instructions: body.instructions,
            ingredients: body.ingredients,
            preparation_time: body.preparation_time,
            cooking_time: body.cooking_time,
            serving_size: body.serving_size,
            cost_per_serving: body.cost_per_serving,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content; the image and creation time are kept.
    pub fn replace_body(&mut self, body: RecipeBody, now: DateTime<Utc>) {
        self.name = body.name;
        self.category = body.category;
        self.description = body.description;
        self.instructions = body.instructions;
        self.ingredients = body.ingredients;
        self.preparation_time = body.preparation_time;
        self.cooking_time = body.cooking_time;
        self.serving_size = body.serving_size;
        self.cost_per_serving = body.cost_per_serving;
        self.updated_at = now;
    }

    /// Set the image reference, returning the one it replaces.
    pub fn set_image(&mut self, image: Option<String>, now: DateTime<Utc>) -> Option<String> {
        self.updated_at = now;
        std::mem::replace(&mut self.image, image)
    }

    pub fn total_time(&self) -> i64 {
        self.preparation_time.saturating_add(self.cooking_time)
    }

    pub fn ingredient_ids(&self) -> impl Iterator<Item = InventoryItemId> + '_ {
        self.ingredients.iter().map(|u| u.inventory_item_id)
    }
}

impl Entity for Recipe {
    type Id = RecipeId;

    fn id(&self) -> Self::Id {
        self.id
    }
}
