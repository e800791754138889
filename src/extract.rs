// src/extract.rs

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::{
    db::users,
    error::{AppError, HtmlError},
    models::user::{Identity, User},
    session,
    state::AppState,
};

/// Identity behind the session cookie, anonymous when nobody is logged in.
///
/// Resolving a logged-in user also refreshes their `last_seen`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = HtmlError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(CurrentUser(identity.clone()));
        }

        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::InternalServerError(msg.to_string()))?;

        let identity = match session::user_id(&session).await? {
            None => Identity::Anonymous,
            Some(id) => match users::find_by_id(&state.pool, id).await? {
                Some(user) => {
                    users::ping(&state.pool, user.id).await?;
                    Identity::User(user)
                }
                None => {
                    tracing::debug!("Session refers to missing user {}", id);
                    session::log_out(&session).await?;
                    Identity::Anonymous
                }
            },
        };

        parts.extensions.insert(identity.clone());
        Ok(CurrentUser(identity))
    }
}

/// A logged-in user; anonymous visitors are sent to the login page.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match identity {
            Identity::User(user) => Ok(AuthUser(user)),
            Identity::Anonymous => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                let next: String =
                    url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
                Err(Redirect::to(&format!("/auth/login?next={next}")).into_response())
            }
        }
    }
}
