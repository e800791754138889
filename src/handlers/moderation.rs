// src/handlers/moderation.rs

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    config::Config,
    db::comments,
    error::{AppError, HtmlError},
    extract::AuthUser,
    models::{Permissions, user::{Identity, User}},
    templates::{CommentView, Layout, ModerateTemplate, Pager, render},
    utils::pagination::{PageParams, PageRequest},
};

fn require_moderator(user: &User) -> Result<(), AppError> {
    if user.can(Permissions::MODERATE_COMMENTS) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Moderator access required.".to_string()))
    }
}

/// Every comment, newest first, with enable/disable controls.
pub async fn moderate(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    require_moderator(&user)?;
    let secure = !config.ssl_disable;
    let page = comments::list(&pool, params.request(), config.posts_per_page).await?;

    render(&ModerateTemplate {
        layout: Layout::build(&Identity::User(user), &session, secure).await?,
        page: page.page,
        comments: page
            .items
            .iter()
            .map(|c| CommentView::new(c, true, secure))
            .collect(),
        pager: Pager::new(&page, "/moderate", ""),
    })
}

pub async fn enable(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    set_disabled(&pool, &user, id, false, &params).await
}

pub async fn disable(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    set_disabled(&pool, &user, id, true, &params).await
}

async fn set_disabled(
    pool: &SqlitePool,
    user: &User,
    id: i64,
    disabled: bool,
    params: &PageParams,
) -> Result<Response, HtmlError> {
    require_moderator(user)?;
    if !comments::set_disabled(pool, id, disabled).await? {
        return Err(AppError::NotFound("Comment not found".to_string()).into());
    }
    tracing::info!(
        "Comment {} {} by {}",
        id,
        if disabled { "disabled" } else { "enabled" },
        user.username
    );

    let page = match params.request() {
        PageRequest::Number(n) => n.to_string(),
        PageRequest::Last => "last".to_string(),
    };
    Ok(Redirect::to(&format!("/moderate?page={page}")).into_response())
}
