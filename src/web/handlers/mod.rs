//! API handlers for the drive API.
//!
//! Every item endpoint resolves the item the same way: suspicious items are
//! hidden from everyone but their creator (404), then the caller's abilities
//! are computed from accesses over the lineage and the link settings.

pub mod access;
pub mod favorite;
pub mod item;
pub mod media;
pub mod user;

pub use access::*;
pub use favorite::*;
pub use item::*;
pub use media::*;
pub use user::*;

use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::analytics::Analytics;
use crate::db::{Database, User, UserRepository};
use crate::item::{
    Abilities, FavoriteRepository, Item, ItemPermissions, ItemRepository, ItemService, Role,
};
use crate::storage::ObjectStorage;
use crate::web::dto::ItemResponse;
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;

/// Default maximum upload size in bytes.
const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Application state shared by handlers.
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<Database>,
    /// Object storage holding item content.
    pub storage: Arc<dyn ObjectStorage>,
    /// Analytics hook.
    pub analytics: Analytics,
    /// Base URL download redirects point to.
    pub media_base_url: String,
    /// Maximum upload size in bytes.
    pub max_upload_size: u64,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        db: Arc<Database>,
        storage: Arc<dyn ObjectStorage>,
        jwt_secret: &str,
        access_expiry: u64,
    ) -> Self {
        Self {
            db,
            storage,
            analytics: Analytics::disabled(),
            media_base_url: "/media".to_string(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            access_token_expiry: access_expiry,
        }
    }

    /// Set the analytics hook.
    pub fn with_analytics(mut self, analytics: Analytics) -> Self {
        self.analytics = analytics;
        self
    }

    /// Set the media base URL.
    pub fn with_media_base_url(mut self, url: impl Into<String>) -> Self {
        self.media_base_url = url.into();
        self
    }

    /// Set the maximum upload size in bytes.
    pub fn with_max_upload_size(mut self, max: u64) -> Self {
        self.max_upload_size = max;
        self
    }

    /// Item service bound to this state.
    pub fn item_service(&self) -> ItemService<'_> {
        ItemService::new(&self.db, self.storage.as_ref())
    }

    /// Generate an access token.
    ///
    /// Tokens are normally minted by the identity provider; this is used by
    /// tooling and tests sharing the same secret.
    pub fn generate_access_token(
        &self,
        sub: &str,
        email: Option<&str>,
        name: Option<&str>,
        teams: &[String],
    ) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            teams: teams.to_vec(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal()
        })
    }
}

/// Who is calling: a provisioned user with their teams, or nobody.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user: Option<User>,
    pub teams: Vec<String>,
}

impl Caller {
    /// Resolve the caller from token claims, provisioning the user on first sight.
    pub async fn resolve(state: &AppState, claims: Option<JwtClaims>) -> Result<Self, ApiError> {
        let Some(claims) = claims else {
            return Ok(Self::default());
        };

        let user = UserRepository::new(state.db.pool())
            .get_or_create(&claims.to_new_user())
            .await?;
        // An empty team name would match every user access.
        let teams = claims
            .teams
            .into_iter()
            .filter(|team| !team.trim().is_empty())
            .collect();
        Ok(Self {
            user: Some(user),
            teams,
        })
    }

    /// ID of the caller, None when anonymous.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    /// The authenticated user.
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user.as_ref().ok_or_else(ApiError::not_authenticated)
    }

    /// Error for a missing ability: 401 for anonymous callers, 403 otherwise.
    pub fn denied(&self) -> ApiError {
        if self.user.is_some() {
            ApiError::permission_denied()
        } else {
            ApiError::not_authenticated()
        }
    }
}

/// An item with what the caller may do on it.
#[derive(Debug, Clone)]
pub struct ItemContext {
    pub item: Item,
    pub permissions: ItemPermissions,
    pub abilities: Abilities,
}

impl ItemContext {
    /// Highest role held by the caller.
    pub fn user_role(&self) -> Option<Role> {
        self.permissions.max_role()
    }
}

/// Resolve an item for the caller.
///
/// Missing items and suspicious items of other users are both `not_found`.
pub async fn load_item(state: &AppState, caller: &Caller, id: &str) -> Result<ItemContext, ApiError> {
    let item = ItemRepository::new(state.db.pool())
        .get_visible(id, caller.user_id())
        .await?
        .ok_or_else(ApiError::not_found)?;
    describe(state, caller, item).await
}

/// Compute the caller's permissions and abilities on an item.
pub async fn describe(state: &AppState, caller: &Caller, item: Item) -> Result<ItemContext, ApiError> {
    let permissions = state
        .item_service()
        .permissions(&item, caller.user_id(), &caller.teams)
        .await?;
    let abilities = Abilities::compute(&item, &permissions, caller.user_id());
    Ok(ItemContext {
        item,
        permissions,
        abilities,
    })
}

/// Build the item response for the caller.
pub async fn item_response(
    state: &AppState,
    caller: &Caller,
    ctx: ItemContext,
) -> Result<ItemResponse, ApiError> {
    let is_favorite = match caller.user_id() {
        Some(user_id) => {
            FavoriteRepository::new(state.db.pool())
                .exists(&ctx.item.id, user_id)
                .await?
        }
        None => false,
    };
    let user_role = ctx.user_role();

    Ok(ItemResponse::new(
        ctx.item,
        ctx.abilities,
        user_role,
        is_favorite,
        &state.media_base_url,
    ))
}

/// Build responses for a list of items, with per-item abilities.
pub async fn item_responses(
    state: &AppState,
    caller: &Caller,
    items: Vec<Item>,
) -> Result<Vec<ItemResponse>, ApiError> {
    let mut responses = Vec::with_capacity(items.len());
    for item in items {
        let ctx = describe(state, caller, item).await?;
        if ctx.abilities.retrieve {
            responses.push(item_response(state, caller, ctx).await?);
        }
    }
    Ok(responses)
}
