// src/handlers/auth.rs

use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    config::Config,
    db::users,
    error::{AppError, HtmlError, validation_messages},
    extract::{AuthUser, CurrentUser},
    handlers::safe_next,
    models::user::{Identity, LoginForm, NewUser, RegisterForm, User},
    session,
    templates::{Layout, LoginTemplate, RegisterTemplate, UnconfirmedTemplate, render},
    utils::{
        mail::{self, Email, Mailer},
        token::{ConfirmClaim, TokenService},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct NextParams {
    pub next: Option<String>,
}

/// Shows the login form.
pub async fn login_page(
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Query(params): Query<NextParams>,
) -> Result<Response, HtmlError> {
    render(&LoginTemplate {
        layout: Layout::build(&identity, &session, !config.ssl_disable).await?,
        username: String::new(),
        next: params.next.unwrap_or_default(),
        errors: Vec::new(),
    })
}

/// Authenticates by username and password and starts a session.
///
/// A wrong username and a wrong password produce the same message.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Query(params): Query<NextParams>,
    Form(form): Form<LoginForm>,
) -> Result<Response, HtmlError> {
    let next = params.next.unwrap_or_default();

    let errors = match form.validate() {
        Err(e) => validation_messages(&e),
        Ok(()) => {
            let user = users::find_by_username(&pool, form.username.trim()).await?;
            let verified = match &user {
                Some(user) => user.verify_password(&form.password)?,
                None => false,
            };
            match user {
                Some(user) if verified => {
                    session::log_in(&session, user.id, form.remember_me.is_some()).await?;
                    tracing::info!("User {} logged in", user.username);
                    return Ok(Redirect::to(safe_next(Some(&next))).into_response());
                }
                _ => vec!["Invalid username or password.".to_string()],
            }
        }
    };

    render(&LoginTemplate {
        layout: Layout::build(&identity, &session, !config.ssl_disable).await?,
        username: form.username,
        next,
        errors,
    })
}

pub async fn logout(
    AuthUser(user): AuthUser,
    session: Session,
) -> Result<Response, HtmlError> {
    session::log_out(&session).await?;
    session::flash(&session, "You have been logged out.").await?;
    tracing::debug!("User {} logged out", user.username);
    Ok(Redirect::to("/").into_response())
}

pub async fn register_page(
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
) -> Result<Response, HtmlError> {
    render(&RegisterTemplate {
        layout: Layout::build(&identity, &session, !config.ssl_disable).await?,
        email: String::new(),
        username: String::new(),
        errors: Vec::new(),
    })
}

/// Registers a new account and mails the confirmation link.
pub async fn register(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(tokens): State<TokenService>,
    State(mailer): State<Arc<dyn Mailer>>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, HtmlError> {
    let email = form.email.trim().to_string();
    let username = form.username.trim().to_string();

    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => validation_messages(&e),
    };
    if errors.is_empty() {
        if users::email_taken(&pool, &email).await? {
            errors.push("Email already registered.".to_string());
        }
        if users::username_taken(&pool, &username).await? {
            errors.push("Username already in use.".to_string());
        }
    }

    if errors.is_empty() {
        let new_user = NewUser {
            email: &email,
            username: &username,
            password: &form.password,
            confirmed: false,
        };
        match users::create(&pool, &new_user, config.admin_email.as_deref()).await {
            Ok(user) => {
                send_confirmation(&config, &tokens, mailer, &user)?;
                session::flash(&session, "A confirmation email has been sent to you by email.")
                    .await?;
                return Ok(Redirect::to("/auth/login").into_response());
            }
            Err(AppError::Conflict(msg)) => errors.push(msg),
            Err(e) => return Err(e.into()),
        }
    }

    render(&RegisterTemplate {
        layout: Layout::build(&identity, &session, !config.ssl_disable).await?,
        email,
        username,
        errors,
    })
}

/// Confirms the logged-in account with a mailed token.
pub async fn confirm(
    State(pool): State<SqlitePool>,
    State(tokens): State<TokenService>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(token): Path<String>,
) -> Result<Response, HtmlError> {
    if user.confirmed {
        return Ok(Redirect::to("/").into_response());
    }

    match tokens.verify::<ConfirmClaim>(&token) {
        Some(claim) if claim.confirm == user.id => {
            users::confirm(&pool, user.id).await?;
            tracing::info!("User {} confirmed", user.username);
            session::flash(&session, "You have confirmed your account. Thanks!").await?;
        }
        _ => {
            session::flash(&session, "The confirmation link is invalid or has expired.").await?;
        }
    }
    Ok(Redirect::to("/").into_response())
}

/// Sends a fresh confirmation mail.
pub async fn resend_confirmation(
    State(config): State<Config>,
    State(tokens): State<TokenService>,
    State(mailer): State<Arc<dyn Mailer>>,
    AuthUser(user): AuthUser,
    session: Session,
) -> Result<Response, HtmlError> {
    if user.confirmed {
        return Ok(Redirect::to("/").into_response());
    }
    send_confirmation(&config, &tokens, mailer, &user)?;
    session::flash(
        &session,
        "A new confirmation email has been sent to you by email.",
    )
    .await?;
    Ok(Redirect::to("/").into_response())
}

pub async fn unconfirmed(
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
) -> Result<Response, HtmlError> {
    if user.confirmed {
        return Ok(Redirect::to("/").into_response());
    }
    let username = user.username.clone();
    render(&UnconfirmedTemplate {
        layout: Layout::build(&Identity::User(user), &session, !config.ssl_disable).await?,
        username,
    })
}

fn send_confirmation(
    config: &Config,
    tokens: &TokenService,
    mailer: Arc<dyn Mailer>,
    user: &User,
) -> Result<(), AppError> {
    let token = tokens.confirmation_token(user.id, config.confirm_token_ttl)?;
    let url = config.external_url(&format!("/auth/confirm/{token}"));
    let email = Email::confirmation(&config.mail, &user.email, &user.username, &url)?;
    mail::dispatch(mailer, email);
    Ok(())
}
