//! Web server for drive.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::analytics::Analytics;
use crate::config::Config;
use crate::storage::ObjectStorage;
use crate::{Database, DriveError, Result};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router, RouterOptions};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// JWT state.
    jwt_state: Arc<JwtState>,
    /// Router options.
    options: RouterOptions,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(
        config: &Config,
        db: Database,
        storage: Arc<dyn ObjectStorage>,
        analytics: Analytics,
    ) -> Result<Self> {
        let server = &config.server;
        let addr: SocketAddr = format!("{}:{}", server.host, server.port)
            .parse()
            .map_err(|e| DriveError::Config(format!("invalid server address: {e}")))?;

        let app_state = AppState::new(
            Arc::new(db),
            storage,
            &server.jwt_secret,
            server.jwt_access_token_expiry_secs,
        )
        .with_analytics(analytics)
        .with_media_base_url(&config.storage.media_base_url)
        .with_max_upload_size(config.storage.max_upload_size_mb * 1024 * 1024);

        Ok(Self {
            addr,
            app_state: Arc::new(app_state),
            jwt_state: Arc::new(JwtState::new(&server.jwt_secret)),
            options: RouterOptions {
                cors_origins: server.cors_origins.clone(),
                serve_media: server.serve_media,
            },
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Application state shared by the handlers.
    pub fn app_state(&self) -> Arc<AppState> {
        self.app_state.clone()
    }

    /// Build the full router.
    pub fn router(&self) -> Router {
        create_router(self.app_state.clone(), self.jwt_state.clone(), &self.options)
            .merge(create_health_router())
            .layer(CompressionLayer::new())
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Web server listening on http://{}", local_addr);
        if self.options.serve_media {
            tracing::info!("Serving media under /media");
        }
        Ok((listener, local_addr))
    }

    /// Run the web server.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.router();
        let (listener, _) = self.bind().await?;
        axum::serve(listener, router).await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.router();
        let (listener, local_addr) = self.bind().await?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
