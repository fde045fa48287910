//! User handlers for Web API.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::{AppState, Caller};
use crate::web::dto::UserResponse;
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// GET /api/v1.0/users/me/ - The authenticated user, provisioned on first call.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?.clone();
    Ok(Json(user.into()))
}
