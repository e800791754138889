// src/handlers/api/posts.rs

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
    db::posts,
    error::AppError,
    handlers::api::{authentication::ApiCaller, list_json},
    models::{
        Permissions,
        post::{PostJson, PostPayload},
    },
    utils::pagination::PageParams,
};

/// `GET /posts/`
pub async fn get_posts(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let page = posts::list(&pool, params.request(), config.posts_per_page).await?;
    Ok(list_json("posts", &page, "/api/v1/posts/", &config, |p| {
        PostJson::new(p, &config)
    }))
}

/// `POST /posts/`: answers 201 with the new post and its `Location`.
pub async fn new_post(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(caller): Extension<ApiCaller>,
    Json(payload): Json<PostPayload>,
) -> Result<impl IntoResponse, AppError> {
    let author = caller.require(Permissions::WRITE_ARTICLES)?;
    let body = payload.into_body()?;

    let post = posts::create(&pool, author.id, &body).await?;
    tracing::info!("API post {} created by {}", post.id, author.username);

    let json = PostJson::new(&post, &config);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, json.url.clone())],
        Json(json),
    ))
}

/// `GET /posts/{id}`
pub async fn get_post(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
) -> Result<Json<PostJson>, AppError> {
    let post = posts::find(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(Json(PostJson::new(&post, &config)))
}

/// `PUT /posts/{id}`: the author, or an administrator, replaces the body.
pub async fn edit_post(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(caller): Extension<ApiCaller>,
    Path(id): Path<i64>,
    Json(payload): Json<PostPayload>,
) -> Result<Json<PostJson>, AppError> {
    let user = caller.require(Permissions::WRITE_ARTICLES)?;
    let post = posts::find(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.author_id != user.id && !user.can(Permissions::ADMINISTER) {
        return Err(AppError::Forbidden("Insufficient permissions".to_string()));
    }
    let body = payload.into_body()?;

    posts::set_body(&pool, post.id, &body).await?;
    let post = posts::find(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(Json(PostJson::new(&post, &config)))
}
