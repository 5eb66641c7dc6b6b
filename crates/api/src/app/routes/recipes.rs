use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Extension, Path},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use galley_core::RecipeId;
use galley_infra::MAX_IMAGE_BYTES;
use galley_recipes::RecipeDraft;

use crate::app::dto::{self, RecipeView};
use crate::app::errors;
use crate::app::services::AppServices;

/// Headroom above the image limit so oversized uploads reach validation
/// and get a field error instead of a bare 413.
const IMAGE_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/categories", get(categories))
        .route("/calculate-cost", post(calculate_cost))
        .route("/:id", get(get_recipe).put(update_recipe).delete(delete_recipe))
        .route(
            "/:id/image",
            put(replace_image).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
}

pub async fn list_recipes(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.recipes.list_grouped_by_category().await {
        Ok(groups) => Json(dto::group_views(&groups, RecipeView::from)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RecipeDraft>, JsonRejection>,
) -> axum::response::Response {
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.recipes.create_recipe(&draft).await {
        Ok(recipe) => (StatusCode::CREATED, Json(RecipeView::from(&recipe))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RecipeId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.recipes.get_recipe(id).await {
        Ok(recipe) => Json(RecipeView::from(&recipe)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<RecipeDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: RecipeId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.recipes.update_recipe(id, &draft).await {
        Ok(recipe) => Json(RecipeView::from(&recipe)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RecipeId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.recipes.delete_recipe(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn replace_image(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let id: RecipeId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match services.recipes.replace_image(id, &body, content_type).await {
        Ok(recipe) => Json(RecipeView::from(&recipe)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.recipes.recipe_categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn calculate_cost(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CalculateCostRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.recipes.calculate_cost(&body.ingredients).await {
        Ok(cost) => Json(cost).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
