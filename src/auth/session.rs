//! Request authentication.
//!
//! [`require_session`] runs as a route layer in front of every authenticated
//! route. It resolves the bearer token to a stored user and attaches that
//! user to the request; handlers read it back with the [`AuthUser`] extractor.
//!
//! Outcomes:
//! - no `Authorization` header: 403
//! - token fails verification, or its subject no longer exists: 401
//! - token expired: 401 with a message asking the client to log in again

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::{repo_types::User, token::TokenError};
use crate::{error::ApiError, state::AppState};

pub const NOT_AUTHORIZED: &str = "Not Authorized";
pub const SESSION_EXPIRED: &str = "Session Token Expired. Login to get a new Session Token";

/// The identity resolved for the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Accepts both `Bearer <token>` and a bare `<token>`. A scheme with nothing
/// after it yields `None`.
pub fn extract_token(header: &str) -> Option<&str> {
    let value = header.trim_start();
    let rest = match value.get(..6) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("bearer")
                && value[6..].chars().next().map_or(true, char::is_whitespace) =>
        {
            &value[6..]
        }
        _ => value,
    };
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Runs the header -> token -> identity resolution for one request.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let Some(raw) = headers.get(AUTHORIZATION) else {
        return Err(ApiError::Forbidden);
    };
    let raw = raw
        .to_str()
        .map_err(|_| ApiError::Unauthorized(NOT_AUTHORIZED.into()))?;
    let token = extract_token(raw).ok_or(ApiError::Forbidden)?;

    let verified = state.tokens.verify(token).map_err(|e| {
        warn!(reason = %e, "session token rejected");
        match e {
            TokenError::Expired => ApiError::Unauthorized(SESSION_EXPIRED.into()),
            TokenError::Malformed | TokenError::InvalidSignature => {
                ApiError::Unauthorized(NOT_AUTHORIZED.into())
            }
        }
    })?;

    match state.users.find_by_id(verified.subject).await? {
        Some(user) => {
            debug!(
                user_id = %user.id,
                issued_at = %verified.issued_at,
                expires_at = %verified.expires_at,
                "session resolved"
            );
            Ok(user)
        }
        None => {
            warn!(user_id = %verified.subject, "token subject no longer exists");
            Err(ApiError::Unauthorized(NOT_AUTHORIZED.into()))
        }
    }
}

/// Middleware for authenticated routes. Preflight requests pass through
/// untouched.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// The user attached by [`require_session`].
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .map(|CurrentUser(user)| AuthUser(user.clone()))
            .ok_or_else(|| ApiError::Unauthorized(NOT_AUTHORIZED.into()))
    }
}
