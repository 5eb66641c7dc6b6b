use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use galley_core::{CustomerId, ValidationErrors};
use galley_customers::{CustomerDraft, OrderDraft};

use crate::app::dto::{self, CustomerView};
use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/:id/loyalty-points", post(add_loyalty_points))
        .route("/:id/orders", get(list_orders).post(place_order))
}

pub async fn list_customers(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.customers.list() {
        Ok(customers) => Json(customers.iter().map(CustomerView::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<CustomerDraft>, JsonRejection>,
) -> axum::response::Response {
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.customers.create(&draft) {
        Ok(customer) => (StatusCode::CREATED, Json(CustomerView::from(&customer))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.customers.get(id) {
        Ok(customer) => Json(CustomerView::from(&customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<CustomerDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: CustomerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.customers.update(id, &draft) {
        Ok(customer) => Json(CustomerView::from(&customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.customers.delete(id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_loyalty_points(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::LoyaltyPointsRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: CustomerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let body = match dto::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let Some(points) = body.points else {
        return errors::validation_error(ValidationErrors::single("points", "points is required"));
    };

    match services.customers.add_loyalty_points(id, points) {
        Ok(customer) => Json(CustomerView::from(&customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.customers.orders_for(id) {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<OrderDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: CustomerId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let draft = match dto::json_body(body) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match services.customers.place_order(id, &draft) {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
