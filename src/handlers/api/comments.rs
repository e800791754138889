// src/handlers/api/comments.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db::{comments, posts},
    error::AppError,
    handlers::api::{authentication::ApiCaller, list_json},
    models::{
        Permissions,
        comment::{CommentJson, CommentPayload},
    },
    utils::pagination::PageParams,
};

/// `GET /comments/`: every comment, newest first.
pub async fn get_comments(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let page = comments::list(&pool, params.request(), config.posts_per_page).await?;
    Ok(list_json("comments", &page, "/api/v1/comments/", &config, |c| {
        CommentJson::new(c, &config)
    }))
}

pub async fn get_comment(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
) -> Result<Json<CommentJson>, AppError> {
    let comment = comments::find(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
    Ok(Json(CommentJson::new(&comment, &config)))
}

/// `GET /posts/{id}/comments/`: comments under a post, oldest first.
pub async fn get_post_comments(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    if posts::find(&pool, id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    let page = comments::for_post(&pool, id, params.request(), config.posts_per_page).await?;
    Ok(list_json(
        "comments",
        &page,
        &format!("/api/v1/posts/{id}/comments/"),
        &config,
        |c| CommentJson::new(c, &config),
    ))
}

/// `POST /posts/{id}/comments/`
pub async fn new_post_comment(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(caller): Extension<ApiCaller>,
    Path(id): Path<i64>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let author = caller.require(Permissions::COMMENT)?;
    if posts::find(&pool, id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    let body = payload.into_body()?;

    let comment = comments::create(&pool, id, author.id, &body).await?;
    let json = CommentJson::new(&comment, &config);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, json.url.clone())],
        Json(json),
    ))
}
