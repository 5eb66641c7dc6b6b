//! Recipe domain module.
//!
//! Recipe drafts and their validation, ingredient uses, and the costing
//! function. Pure domain logic; stock consumption is coordinated in
//! `galley-infra`.

pub mod costing;
pub mod recipe;

pub use costing::{compute_cost, RecipeCost, SUGGESTED_PRICE_MARKUP};
pub use recipe::{
    validate_ingredients, IngredientDraft, IngredientUse, Recipe, RecipeBody, RecipeDraft, MAX_INGREDIENT_QUANTITY,
    NEW_CATEGORY_TOKEN,
};
