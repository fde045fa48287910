//! Favorite handlers for Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Map;
use std::sync::Arc;

use super::{item_responses, load_item, AppState, Caller};
use crate::analytics::{ITEM_FAVORITED, ITEM_UNFAVORITED};
use crate::item::{FavoriteRepository, ItemRepository};
use crate::web::dto::{DetailResponse, FavoriteResponse, ItemResponse, ListResponse};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// POST /api/v1.0/items/:id/favorite/ - Mark an item as favorite.
///
/// 201 on the first call, 200 with a detail message afterwards. The event
/// only fires when the favorite is created.
pub async fn favorite_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.favorite {
        return Err(ApiError::permission_denied());
    }

    let created = FavoriteRepository::new(state.db.pool())
        .add(&ctx.item.id, &user.id)
        .await?;
    if !created {
        return Ok(Json(DetailResponse::new("item already marked as favorite")).into_response());
    }

    state
        .analytics
        .capture(ITEM_FAVORITED, Some(user), Map::new(), Some(&ctx.item));

    Ok((
        StatusCode::CREATED,
        Json(FavoriteResponse {
            id: ctx.item.id,
            is_favorite: true,
        }),
    )
        .into_response())
}

/// DELETE /api/v1.0/items/:id/favorite/ - Unmark an item as favorite.
pub async fn unfavorite_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.favorite {
        return Err(ApiError::permission_denied());
    }

    let removed = FavoriteRepository::new(state.db.pool())
        .remove(&ctx.item.id, &user.id)
        .await?;
    if !removed {
        return Ok(
            Json(DetailResponse::new("item was already not marked as favorite")).into_response(),
        );
    }

    state
        .analytics
        .capture(ITEM_UNFAVORITED, Some(user), Map::new(), Some(&ctx.item));

    Ok(Json(FavoriteResponse {
        id: ctx.item.id,
        is_favorite: false,
    })
    .into_response())
}

/// GET /api/v1.0/items/favorite_list/ - Items the caller marked as favorite.
pub async fn favorite_list(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ListResponse<ItemResponse>>, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?;

    let items = ItemRepository::new(state.db.pool())
        .list_favorites(&user.id)
        .await?;
    Ok(Json(ListResponse::new(
        item_responses(&state, &caller, items).await?,
    )))
}
