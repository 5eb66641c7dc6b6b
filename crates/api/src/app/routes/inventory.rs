use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use galley_core::InventoryItemId;
use galley_inventory::ItemDraft;

use crate::app::dto::{self, ItemView};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/items/:id/adjust", post(adjust_stock))
        .route("/low-stock", get(low_stock))
        .route("/categories", get(categories))
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory.list_by_category_then_name().await {
        Ok(groups) => Json(dto::group_views(&groups, ItemView::from)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ItemDraft>, JsonRejection>,
) -> axum::response::Response {
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.inventory.create_item(&draft).await {
        Ok(item) => (StatusCode::CREATED, Json(ItemView::from(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.get_item(id).await {
        Ok(item) => Json(ItemView::from(&item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ItemDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.inventory.update_item(id, &draft).await {
        Ok(item) => Json(ItemView::from(&item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.delete_item(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.inventory.adjust_stock(id, body.adjustment, body.direction).await {
        Ok(quantity) => Json(json!({
            "id": id.to_string(),
            "quantity": quantity,
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory.list_low_stock().await {
        Ok(items) => Json(items.iter().map(ItemView::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.inventory.item_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
