// src/handlers/follow.rs

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    config::Config,
    db::{follows, users},
    error::{AppError, HtmlError},
    extract::{AuthUser, CurrentUser},
    models::{Permissions, user::User},
    session,
    templates::{FollowView, FollowersTemplate, Layout, Pager, render},
    utils::pagination::PageParams,
};

fn require_follow(user: &User) -> Result<(), AppError> {
    if user.can(Permissions::FOLLOW) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You may not follow users.".to_string()))
    }
}

/// Looks up the target by username; unknown names flash and go home.
async fn target_or_redirect(
    pool: &SqlitePool,
    session: &Session,
    username: &str,
) -> Result<Result<User, Response>, HtmlError> {
    match users::find_by_username(pool, username).await? {
        Some(user) => Ok(Ok(user)),
        None => {
            session::flash(session, "Invalid user.").await?;
            Ok(Err(Redirect::to("/").into_response()))
        }
    }
}

pub async fn follow(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, HtmlError> {
    require_follow(&user)?;
    let target = match target_or_redirect(&pool, &session, &username).await? {
        Ok(target) => target,
        Err(redirect) => return Ok(redirect),
    };

    let message = if follows::follow(&pool, user.id, target.id).await? {
        tracing::debug!("{} now follows {}", user.username, target.username);
        format!("You are now following {}.", target.username)
    } else {
        "You are already following this user.".to_string()
    };
    session::flash(&session, message).await?;
    Ok(Redirect::to(&format!("/user/{}", target.username)).into_response())
}

pub async fn unfollow(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(username): Path<String>,
) -> Result<Response, HtmlError> {
    require_follow(&user)?;
    let target = match target_or_redirect(&pool, &session, &username).await? {
        Ok(target) => target,
        Err(redirect) => return Ok(redirect),
    };

    let message = if target.id == user.id {
        "You cannot unfollow yourself.".to_string()
    } else if follows::unfollow(&pool, user.id, target.id).await? {
        format!("You are not following {} anymore.", target.username)
    } else {
        "You are not following this user.".to_string()
    };
    session::flash(&session, message).await?;
    Ok(Redirect::to(&format!("/user/{}", target.username)).into_response())
}

/// Who follows `username`.
pub async fn followers(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    let target = match target_or_redirect(&pool, &session, &username).await? {
        Ok(target) => target,
        Err(redirect) => return Ok(redirect),
    };
    let secure = !config.ssl_disable;
    let page = follows::followers(&pool, target.id, params.request(), config.posts_per_page).await?;

    render(&FollowersTemplate {
        layout: Layout::build(&identity, &session, secure).await?,
        title: format!("Followers of {}", target.username),
        follows: page.items.iter().map(|f| FollowView::new(f, secure)).collect(),
        pager: Pager::new(&page, &format!("/followers/{}", target.username), ""),
        username: target.username,
    })
}

/// Whom `username` follows.
pub async fn followed_by(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    let target = match target_or_redirect(&pool, &session, &username).await? {
        Ok(target) => target,
        Err(redirect) => return Ok(redirect),
    };
    let secure = !config.ssl_disable;
    let page = follows::followed(&pool, target.id, params.request(), config.posts_per_page).await?;

    render(&FollowersTemplate {
        layout: Layout::build(&identity, &session, secure).await?,
        title: format!("Followed by {}", target.username),
        follows: page.items.iter().map(|f| FollowView::new(f, secure)).collect(),
        pager: Pager::new(&page, &format!("/followed-by/{}", target.username), ""),
        username: target.username,
    })
}
