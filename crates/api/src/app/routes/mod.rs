use axum::Router;

pub mod customers;
pub mod inventory;
pub mod recipes;
pub mod system;

/// Router for all API endpoints except `/health`.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .nest("/recipes", recipes::router())
        .nest("/customers", customers::router())
}
