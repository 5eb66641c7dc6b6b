use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use galley_core::{CategoryGroup, DomainError};
use galley_customers::Customer;
use galley_inventory::{InventoryItem, StockDirection};
use galley_recipes::{IngredientDraft, Recipe};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdjustStockRequest {
    pub adjustment: Option<Decimal>,
    #[serde(rename = "type")]
    pub direction: Option<StockDirection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CalculateCostRequest {
    pub ingredients: Vec<IngredientDraft>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoyaltyPointsRequest {
    pub points: Option<i64>,
}

// -------------------------
// Response views
// -------------------------

#[derive(Debug, Serialize)]
pub struct ItemView<'a> {
    #[serde(flatten)]
    pub item: &'a InventoryItem,
    pub is_low_stock: bool,
}

impl<'a> From<&'a InventoryItem> for ItemView<'a> {
    fn from(item: &'a InventoryItem) -> Self {
        Self {
            item,
            is_low_stock: item.is_low_stock(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeView<'a> {
    #[serde(flatten)]
    pub recipe: &'a Recipe,
    pub total_time: i64,
}

impl<'a> From<&'a Recipe> for RecipeView<'a> {
    fn from(recipe: &'a Recipe) -> Self {
        Self {
            recipe,
            total_time: recipe.total_time(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerView<'a> {
    #[serde(flatten)]
    pub customer: &'a Customer,
    pub formatted_phone: Option<String>,
}

impl<'a> From<&'a Customer> for CustomerView<'a> {
    fn from(customer: &'a Customer) -> Self {
        Self {
            customer,
            formatted_phone: customer.formatted_phone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupView<V> {
    pub category: String,
    pub items: Vec<V>,
}

/// Map each group's records through a view.
pub fn group_views<'a, T, V>(groups: &'a [CategoryGroup<T>], view: impl Fn(&'a T) -> V) -> Vec<GroupView<V>> {
    groups
        .iter()
        .map(|g| GroupView {
            category: g.category.clone(),
            items: g.items.iter().map(&view).collect(),
        })
        .collect()
}

// -------------------------
// Extraction helpers
// -------------------------

pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse()
        .map_err(|e: DomainError| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// Unwrap a JSON body, reporting malformed JSON as 400.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_json", e.body_text()))
}
