//! Item handlers for Web API.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Map;
use std::sync::Arc;
use validator::Validate;

use super::{item_response, item_responses, load_item, AppState, Caller};
use crate::analytics::ITEM_CREATED;
use crate::item::{ItemRepository, ItemUpdate};
use crate::storage::media_url;
use crate::web::dto::{
    ChildKind, CreateChildRequest, CreateItemRequest, ItemResponse, JsonBody, ListResponse,
    MessageResponse, MoveItemRequest, UpdateItemRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, OptionalAuthUser};
use crate::DriveError;

/// GET /api/v1.0/items/ - Items the caller holds an access on.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ListResponse<ItemResponse>>, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?;

    let items = ItemRepository::new(state.db.pool())
        .list_accessible(&user.id, &caller.teams)
        .await?;

    Ok(Json(ListResponse::new(
        item_responses(&state, &caller, items).await?,
    )))
}

/// POST /api/v1.0/items/ - Create a root folder owned by the caller.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?;

    let item = state.item_service().create_root_folder(user, &req.title).await?;
    state
        .analytics
        .capture(ITEM_CREATED, Some(user), Map::new(), Some(&item));

    let ctx = super::describe(&state, &caller, item).await?;
    Ok((
        StatusCode::CREATED,
        Json(item_response(&state, &caller, ctx).await?),
    ))
}

/// GET /api/v1.0/items/:id/ - Retrieve an item.
pub async fn retrieve_item(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.retrieve {
        return Err(caller.denied());
    }

    Ok(Json(item_response(&state, &caller, ctx).await?))
}

/// PATCH /api/v1.0/items/:id/ - Rename an item or change its link settings.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;

    let allowed = ctx.abilities.update
        && (!req.changes_link() || ctx.abilities.link_configuration);
    if !allowed {
        return Err(caller.denied());
    }
    req.validate().map_err(ApiError::from_validation_errors)?;

    let service = state.item_service();
    let mut item = ctx.item;
    if let Some(title) = req.title.as_deref() {
        item = service.rename(&item, title).await?;
    }
    if req.changes_link() {
        let mut update = ItemUpdate::new();
        if let Some(reach) = req.link_reach {
            update = update.link_reach(reach);
        }
        if let Some(role) = req.link_role {
            update = update.link_role(role);
        }
        item = ItemRepository::new(state.db.pool())
            .update(&item.id, &update)
            .await?
            .ok_or_else(ApiError::not_found)?;
        tracing::info!(item_id = %item.id, "Updated link settings");
    }

    let ctx = super::describe(&state, &caller, item).await?;
    Ok(Json(item_response(&state, &caller, ctx).await?))
}

/// DELETE /api/v1.0/items/:id/ - Delete an item and its descendants.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.destroy {
        return Err(caller.denied());
    }

    state.item_service().delete(&ctx.item).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1.0/items/:id/children/ - List the children of a folder.
pub async fn list_children(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<String>,
) -> Result<Json<ListResponse<ItemResponse>>, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.retrieve {
        return Err(caller.denied());
    }
    if !ctx.abilities.children_list {
        return Ok(Json(ListResponse::new(Vec::new())));
    }

    let children = ItemRepository::new(state.db.pool())
        .list_children_visible(&ctx.item.id, caller.user_id())
        .await?;
    Ok(Json(ListResponse::new(
        item_responses(&state, &caller, children).await?,
    )))
}

/// POST /api/v1.0/items/:id/children/ - Create a child item.
///
/// Checks run in order: authentication, item lookup, ability, body.
pub async fn create_child(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateChildRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let user = caller.require_user()?;
    let parent = load_item(&state, &caller, &id).await?;
    if !parent.abilities.children_create {
        return Err(ApiError::permission_denied());
    }

    req.validate().map_err(ApiError::from_validation_errors)?;
    let kind = req
        .kind()
        .ok_or_else(|| ApiError::bad_request("invalid", "Invalid child description."))?;

    let service = state.item_service();
    let created = match kind {
        ChildKind::Folder { title } => service.create_folder(&parent.item, user, title).await,
        ChildKind::Template { title, template } => {
            service
                .create_from_template(&parent.item, user, title, template)
                .await
        }
        ChildKind::Pending { filename } => {
            service
                .create_pending_file(&parent.item, user, filename)
                .await
        }
    };
    let item = match created {
        Ok(item) => item,
        Err(DriveError::Storage(_)) => return Err(ApiError::storage_upload_error()),
        Err(e) => return Err(e.into()),
    };

    state
        .analytics
        .capture(ITEM_CREATED, Some(user), Map::new(), Some(&item));

    let ctx = super::describe(&state, &caller, item).await?;
    Ok((
        StatusCode::CREATED,
        Json(item_response(&state, &caller, ctx).await?),
    ))
}

/// POST /api/v1.0/items/:id/move/ - Move an item into another folder.
pub async fn move_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<MoveItemRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.move_item {
        return Err(ApiError::permission_denied());
    }
    req.validate().map_err(ApiError::from_validation_errors)?;

    let target = load_item(&state, &caller, &req.target_item_id)
        .await
        .map_err(|e| match e.status() {
            StatusCode::NOT_FOUND => ApiError::invalid_field(
                "target_item_id",
                "invalid",
                "Target parent folder does not exist.",
            ),
            _ => e,
        })?;
    if !target.abilities.children_create {
        return Err(ApiError::permission_denied());
    }

    state.item_service().move_item(&ctx.item, &target.item).await?;
    Ok(Json(MessageResponse::new("item moved successfully.")))
}

/// POST /api/v1.0/items/:id/upload/ - Upload the content of a pending file.
///
/// Expects a multipart body with a `file` field.
pub async fn upload_item(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ItemResponse>, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.upload {
        return Err(ApiError::permission_denied());
    }

    let mut content: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("parse_error", "Invalid multipart data.")
    })? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                tracing::warn!("Failed to read file content: {}", e);
                ApiError::bad_request("parse_error", "Failed to read file.")
            })?;
            content = Some(bytes.to_vec());
        }
    }

    let content = content
        .ok_or_else(|| ApiError::invalid_field("file", "required", "No file was submitted."))?;
    if content.len() as u64 > state.max_upload_size {
        let max_mb = state.max_upload_size / 1024 / 1024;
        return Err(ApiError::invalid_field(
            "file",
            "file_too_large",
            format!("File too large (max {max_mb}MB)."),
        ));
    }

    let item = state.item_service().upload_content(&ctx.item, &content).await?;
    let ctx = super::describe(&state, &caller, item).await?;
    Ok(Json(item_response(&state, &caller, ctx).await?))
}

/// GET /api/v1.0/items/:id/download/ - Redirect to the item's content.
///
/// The redirect is built from the current filename, so it stays valid
/// across renames.
pub async fn download_item(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.retrieve {
        return Err(caller.denied());
    }
    if !ctx.abilities.download {
        return Err(ApiError::permission_denied());
    }

    let key = ctx.item.file_key().ok_or_else(ApiError::permission_denied)?;
    let location = media_url(&state.media_base_url, &key);
    tracing::debug!(item_id = %ctx.item.id, "Redirecting download");

    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
