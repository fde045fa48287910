//! Access handlers for Web API.
//!
//! Administrators manage accesses, but only owners may grant, change or
//! revoke the owner role. An item always keeps at least one direct owner
//! once it has one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use super::{load_item, AppState, Caller, ItemContext};
use crate::db::UserRepository;
use crate::item::{ItemAccess, ItemAccessRepository, NewItemAccess, Role};
use crate::web::dto::{
    AccessResponse, CreateAccessRequest, JsonBody, ListResponse, UpdateAccessRequest,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, OptionalAuthUser};

fn require_owner_for(ctx: &ItemContext, role: Role) -> Result<(), ApiError> {
    if role == Role::Owner && ctx.user_role() != Some(Role::Owner) {
        return Err(ApiError::permission_denied());
    }
    Ok(())
}

async fn load_access(
    state: &AppState,
    ctx: &ItemContext,
    access_id: &str,
) -> Result<ItemAccess, ApiError> {
    ItemAccessRepository::new(state.db.pool())
        .get_by_id(access_id)
        .await?
        .filter(|access| access.item_id == ctx.item.id)
        .ok_or_else(|| ApiError::not_found_resource("ItemAccess"))
}

async fn ensure_not_last_owner(state: &AppState, access: &ItemAccess) -> Result<(), ApiError> {
    if access.role != Role::Owner {
        return Ok(());
    }
    let owners = ItemAccessRepository::new(state.db.pool())
        .count_owners(&access.item_id)
        .await?;
    if owners <= 1 {
        return Err(ApiError::bad_request(
            "last_owner",
            "Cannot remove or demote the last owner of an item.",
        ));
    }
    Ok(())
}

/// GET /api/v1.0/items/:id/accesses/ - List the accesses granted on an item.
pub async fn list_accesses(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path(id): Path<String>,
) -> Result<Json<ListResponse<AccessResponse>>, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.accesses_view {
        return Err(caller.denied());
    }

    let accesses = ItemAccessRepository::new(state.db.pool())
        .list_by_item(&ctx.item.id)
        .await?;
    Ok(Json(ListResponse::new(
        accesses.into_iter().map(AccessResponse::from).collect(),
    )))
}

/// POST /api/v1.0/items/:id/accesses/ - Grant an access to a user or team.
pub async fn create_access(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<CreateAccessRequest>,
) -> Result<(StatusCode, Json<AccessResponse>), ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.accesses_manage {
        return Err(ApiError::permission_denied());
    }
    req.validate().map_err(ApiError::from_validation_errors)?;

    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::invalid_field("role", "invalid_choice", "Invalid role."))?;
    require_owner_for(&ctx, role)?;

    let user_id = req.user_id.as_deref().filter(|u| !u.is_empty());
    let team = req.team.as_deref().filter(|t| !t.is_empty()).unwrap_or_default();

    if let Some(user_id) = user_id {
        let exists = UserRepository::new(state.db.pool())
            .get_by_id(user_id)
            .await?
            .is_some();
        if !exists {
            return Err(ApiError::invalid_field(
                "user_id",
                "does_not_exist",
                format!("Invalid pk \"{user_id}\" - object does not exist."),
            ));
        }
    }

    let repo = ItemAccessRepository::new(state.db.pool());
    if repo
        .find_for_grantee(&ctx.item.id, user_id, team)
        .await?
        .is_some()
    {
        return Err(ApiError::bad_request(
            "unique",
            "This user or team already has an access on this item.",
        ));
    }

    let new_access = match user_id {
        Some(user_id) => NewItemAccess::for_user(&ctx.item.id, user_id, role),
        None => NewItemAccess::for_team(&ctx.item.id, team, role),
    };
    let access = repo.create(&new_access).await?;
    tracing::info!(item_id = %ctx.item.id, access_id = %access.id, role = %role, "Granted access");

    Ok((StatusCode::CREATED, Json(access.into())))
}

/// PATCH /api/v1.0/items/:id/accesses/:access_id/ - Change the role of an access.
pub async fn update_access(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path((id, access_id)): Path<(String, String)>,
    JsonBody(req): JsonBody<UpdateAccessRequest>,
) -> Result<Json<AccessResponse>, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.accesses_manage {
        return Err(ApiError::permission_denied());
    }
    req.validate().map_err(ApiError::from_validation_errors)?;

    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::invalid_field("role", "invalid_choice", "Invalid role."))?;
    let access = load_access(&state, &ctx, &access_id).await?;
    require_owner_for(&ctx, access.role)?;
    require_owner_for(&ctx, role)?;
    if role != Role::Owner {
        ensure_not_last_owner(&state, &access).await?;
    }

    let updated = ItemAccessRepository::new(state.db.pool())
        .update_role(&access.id, role)
        .await?
        .ok_or_else(|| ApiError::not_found_resource("ItemAccess"))?;
    tracing::info!(item_id = %ctx.item.id, access_id = %updated.id, role = %role, "Changed access role");

    Ok(Json(updated.into()))
}

/// DELETE /api/v1.0/items/:id/accesses/:access_id/ - Revoke an access.
pub async fn delete_access(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path((id, access_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::resolve(&state, Some(claims)).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.accesses_manage {
        return Err(ApiError::permission_denied());
    }

    let access = load_access(&state, &ctx, &access_id).await?;
    require_owner_for(&ctx, access.role)?;
    ensure_not_last_owner(&state, &access).await?;

    ItemAccessRepository::new(state.db.pool())
        .delete(&access.id)
        .await?;
    tracing::info!(item_id = %ctx.item.id, access_id = %access.id, "Revoked access");

    Ok(StatusCode::NO_CONTENT)
}
