//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    create_access, create_child, create_item, delete_access, delete_item, download_item,
    favorite_item, favorite_list, list_accesses, list_children, list_items, me, move_item,
    retrieve_item, serve_media, unfavorite_item, update_access, update_item, upload_item,
    AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Room left for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Options for building the API router.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Serve stored content under `/media`.
    pub serve_media: bool,
}

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    options: &RouterOptions,
) -> Router {
    let upload_limit = usize::try_from(app_state.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let user_routes = Router::new().route("/me/", get(me));

    let item_routes = Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/favorite_list/", get(favorite_list))
        .route(
            "/:id/",
            get(retrieve_item).patch(update_item).delete(delete_item),
        )
        .route("/:id/children/", get(list_children).post(create_child))
        .route("/:id/move/", post(move_item))
        .route(
            "/:id/upload/",
            post(upload_item).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/:id/download/", get(download_item))
        .route("/:id/favorite/", post(favorite_item).delete(unfavorite_item))
        .route("/:id/accesses/", get(list_accesses).post(create_access))
        .route(
            "/:id/accesses/:access_id/",
            patch(update_access).delete(delete_access),
        );

    let api_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/items", item_routes);

    let mut router = Router::new().nest("/api/v1.0", api_routes);
    if options.serve_media {
        router = router.route("/media/item/:id/:filename", get(serve_media));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&options.cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
