//! Web API module for drive.
//!
//! This module provides the REST API over items, accesses and favorites,
//! plus the optional media route serving stored content.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router, RouterOptions};
pub use server::WebServer;
