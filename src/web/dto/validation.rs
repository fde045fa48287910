//! Validation utilities for Web API DTOs.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;

/// A JSON extractor whose rejections use the API error format.
///
/// The body is not validated: handlers call `validate()` once the caller's
/// permissions have been checked.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request("parse_error", format!("JSON parse error - {}", e.body_text())))?;
        Ok(JsonBody(value))
    }
}

/// A JSON extractor that validates the request body.
///
/// This extractor deserializes the request body as JSON and then validates it
/// using the `validator` crate. If validation fails, it returns a detailed
/// error response with field-level error information.
///
/// # Example
///
/// ```ignore
/// use drive::web::dto::ValidatedJson;
///
/// async fn create_item(
///     ValidatedJson(payload): ValidatedJson<CreateItemRequest>,
/// ) -> Result<Json<ItemResponse>, ApiError> {
///     // payload is already validated
///     // ...
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate().map_err(ApiError::from_validation_errors)?;
        Ok(ValidatedJson(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate an item title: not blank, no control characters, no slashes.
pub fn valid_title(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank")
            .with_message("This field may not be blank.".into()));
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(validator::ValidationError::new("invalid")
            .with_message("Must not contain control characters.".into()));
    }
    if value.contains('/') {
        return Err(validator::ValidationError::new("invalid")
            .with_message("Must not contain '/'.".into()));
    }
    Ok(())
}

/// Validate a role name.
pub fn valid_role(value: &str) -> Result<(), validator::ValidationError> {
    match value.parse::<crate::item::Role>() {
        Ok(_) => Ok(()),
        Err(_) => Err(invalid_choice(value)),
    }
}

/// Build an `invalid_choice` error for `value`.
pub fn invalid_choice(value: &str) -> validator::ValidationError {
    validator::ValidationError::new("invalid_choice")
        .with_message(format!("\"{value}\" is not a valid choice.").into())
}
