//! JWT authentication middleware.
//!
//! Tokens are issued by the identity provider and carry the user's identity
//! and team memberships. The first authenticated request provisions the user.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::NewUser;
use crate::web::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Teams the user belongs to.
    #[serde(default)]
    pub teams: Vec<String>,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

impl JwtClaims {
    /// User record described by these claims.
    pub fn to_new_user(&self) -> NewUser {
        let mut user = NewUser::with_id(&self.sub);
        user.email = self.email.clone();
        user.full_name = self.name.clone();
        user
    }
}

/// Application state for JWT authentication.
#[derive(Clone)]
pub struct JwtState {
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn verify(&self, token: &str) -> Result<JwtClaims, ApiError> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                ApiError::authentication_failed("Invalid or expired token.")
            })
    }
}

/// Token sent with the request.
///
/// Read from the `Authorization: Bearer` header, or from a `token` query
/// parameter so that browser navigations to download links can authenticate.
fn request_token(parts: &Parts) -> Option<String> {
    if let Some(header) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        return header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    parts.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key == "token" {
                urlencoding::decode(value).ok().map(|s| s.into_owned())
            } else {
                None
            }
        })
    })
}

fn jwt_state(parts: &Parts) -> Result<Arc<JwtState>, ApiError> {
    parts.extensions.get::<Arc<JwtState>>().cloned().ok_or_else(|| {
        tracing::error!("JWT state not configured");
        ApiError::internal()
    })
}

/// Extractor for authenticated users.
///
/// Rejects with `not_authenticated` when no token is sent and with
/// `authentication_failed` when the token is invalid.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = request_token(parts).ok_or_else(ApiError::not_authenticated)?;
            let claims = jwt_state(parts)?.verify(&token)?;
            Ok(AuthUser(claims))
        })
    }
}

/// Optional authentication extractor.
///
/// Anonymous requests yield `None`. A token that is sent but invalid is
/// still rejected.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<JwtClaims>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let Some(token) = request_token(parts) else {
                return Ok(OptionalAuthUser(None));
            };
            let claims = jwt_state(parts)?.verify(&token)?;
            Ok(OptionalAuthUser(Some(claims)))
        })
    }
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}
