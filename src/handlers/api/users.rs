// src/handlers/api/users.rs

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    db::{posts, users},
    error::AppError,
    handlers::api::list_json,
    models::{post::PostJson, user::{User, UserJson}},
    utils::pagination::PageParams,
};

async fn find_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    users::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// `GET /users/{id}`
pub async fn get_user(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
) -> Result<Json<UserJson>, AppError> {
    let user = find_user(&pool, id).await?;
    let post_count = users::post_count(&pool, user.id).await?;
    Ok(Json(UserJson::new(&user, post_count, &config)))
}

/// `GET /users/{id}/posts/`: posts written by the user, newest first.
pub async fn get_user_posts(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let user = find_user(&pool, id).await?;
    let page = posts::by_author(&pool, user.id, params.request(), config.posts_per_page).await?;
    Ok(list_json(
        "posts",
        &page,
        &format!("/api/v1/users/{}/posts/", user.id),
        &config,
        |p| PostJson::new(p, &config),
    ))
}

/// `GET /users/{id}/timeline/`: the user's feed.
pub async fn get_user_followed_posts(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let user = find_user(&pool, id).await?;
    let page =
        posts::followed_posts(&pool, user.id, params.request(), config.posts_per_page).await?;
    Ok(list_json(
        "posts",
        &page,
        &format!("/api/v1/users/{}/timeline/", user.id),
        &config,
        |p| PostJson::new(p, &config),
    ))
}
