// src/handlers/api/authentication.rs

use axum::{
    Extension, Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;

use crate::{
    db::users,
    error::AppError,
    models::{Permissions, user::User},
    state::AppState,
    utils::token::AuthClaim,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Who is calling the API, injected by [`authenticate`].
#[derive(Debug, Clone)]
pub struct ApiCaller {
    pub user: User,
    /// The caller presented a token rather than a password.
    pub token_used: bool,
}

impl ApiCaller {
    /// The calling user, provided they hold every bit of `permissions`.
    ///
    /// Users lacking a bit get 403.
    pub fn require(&self, permissions: Permissions) -> Result<&User, AppError> {
        if !self.user.can(permissions) {
            return Err(AppError::Forbidden("Insufficient permissions".to_string()));
        }
        Ok(&self.user)
    }
}

/// `(identifier, secret)` from an `Authorization: Basic` header.
///
/// `Ok(None)` when no header was sent. A header that is not valid Basic
/// credentials is an error.
fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let invalid = || AppError::AuthError(INVALID_CREDENTIALS.to_string());

    let encoded = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or_else(invalid)?;
    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
    let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
    let (identifier, secret) = decoded.split_once(':').ok_or_else(invalid)?;

    Ok(Some((identifier.to_string(), secret.to_string())))
}

/// Resolves the caller from Basic credentials.
///
/// * no header or empty identifier: rejected, the API has no anonymous access
/// * empty secret: the identifier is an API token
/// * otherwise: email and password
///
/// Any failure is the same 401 so callers cannot tell which part was wrong.
/// Confirmed accounts only; unconfirmed ones get 403.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let invalid = || AppError::AuthError(INVALID_CREDENTIALS.to_string());

    let caller = match basic_credentials(req.headers())? {
        None => return Err(invalid()),
        Some((identifier, _)) if identifier.is_empty() => return Err(invalid()),
        Some((token, secret)) if secret.is_empty() => {
            let claim = state
                .tokens
                .verify::<AuthClaim>(&token)
                .ok_or_else(invalid)?;
            let user = users::find_by_id(&state.pool, claim.id)
                .await?
                .ok_or_else(invalid)?;
            ApiCaller {
                user,
                token_used: true,
            }
        }
        Some((email, password)) => {
            let user = users::find_by_email(&state.pool, email.trim())
                .await?
                .ok_or_else(invalid)?;
            if !user.verify_password(&password)? {
                return Err(invalid());
            }
            ApiCaller {
                user,
                token_used: false,
            }
        }
    };

    if !caller.user.confirmed {
        tracing::debug!("API call by unconfirmed user {}", caller.user.username);
        return Err(AppError::Forbidden("Unconfirmed account".to_string()));
    }
    users::ping(&state.pool, caller.user.id).await?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Lifetime in seconds.
    pub expiration: i64,
}

/// `POST /tokens/`: issues a short-lived API token.
///
/// A token cannot be used to obtain another one.
pub async fn get_token(
    State(state): State<AppState>,
    Extension(caller): Extension<ApiCaller>,
) -> Result<impl IntoResponse, AppError> {
    if caller.token_used {
        return Err(AppError::AuthError(INVALID_CREDENTIALS.to_string()));
    }

    let expiration = state.config.api_token_ttl;
    let token = state.tokens.auth_token(caller.user.id, expiration)?;
    Ok(Json(TokenResponse { token, expiration }))
}
