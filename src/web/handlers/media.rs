//! Media handler serving stored item content.
//!
//! Download redirects point here when the server is configured to serve
//! media itself instead of a CDN or object store front.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use std::sync::Arc;

use super::{load_item, AppState, Caller};
use crate::web::error::ApiError;
use crate::web::middleware::OptionalAuthUser;
use crate::DriveError;

/// Build a Content-Disposition header value for `filename`.
///
/// Control characters are dropped and quotes or backslashes replaced in the
/// plain `filename` parameter; non-ASCII names also get an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let needs_encoding = !filename.is_ascii()
        || filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');
    if !needs_encoding {
        return format!("inline; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

/// GET /media/item/:id/:filename - Serve the content of a file.
///
/// Applies the same checks as the download permalink. The filename must be
/// the item's current one.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Path((id, filename)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let caller = Caller::resolve(&state, claims).await?;
    let ctx = load_item(&state, &caller, &id).await?;
    if !ctx.abilities.retrieve {
        return Err(caller.denied());
    }
    if !ctx.abilities.download {
        return Err(ApiError::permission_denied());
    }
    if ctx.item.filename.as_deref() != Some(filename.as_str()) {
        return Err(ApiError::not_found_resource("file"));
    }

    let key = ctx.item.file_key().ok_or_else(ApiError::not_found)?;
    let content = match state.storage.load(&key) {
        Ok(content) => content,
        Err(DriveError::NotFound(_)) => {
            tracing::warn!(item_id = %ctx.item.id, key = %key, "Stored object is missing");
            return Err(ApiError::not_found_resource("file"));
        }
        Err(e) => {
            tracing::error!(item_id = %ctx.item.id, "Failed to load object: {}", e);
            return Err(ApiError::internal());
        }
    };

    let content_type = ctx
        .item
        .mimetype
        .clone()
        .unwrap_or_else(|| mime_guess::from_path(&filename).first_or_octet_stream().to_string());

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition_header(&filename))
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal()
        })
}
