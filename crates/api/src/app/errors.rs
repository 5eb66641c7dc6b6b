use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use galley_core::ValidationErrors;
use galley_infra::store::StoreError;
use galley_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(errors) => validation_error(errors),
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Integrity(msg) => {
            tracing::error!(error = %msg, "integrity violation");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "integrity_error", msg)
        }
        ServiceError::Store(StoreError::Conflict(msg)) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        ServiceError::Blob(e) => {
            tracing::error!(error = %e, "image storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "blob_error", e.to_string())
        }
    }
}

pub fn validation_error(errors: ValidationErrors) -> axum::response::Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.to_string(),
            "fields": errors,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
