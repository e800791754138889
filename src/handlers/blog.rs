// src/handlers/blog.rs

use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::{
    Session,
    cookie::{Cookie, time::Duration},
};
use validator::Validate;

use crate::{
    config::Config,
    db::{comments, posts},
    error::{AppError, HtmlError, validation_messages},
    extract::{AuthUser, CurrentUser},
    handlers::cookie_value,
    models::{
        Permissions,
        comment::CommentForm,
        post::{Post, PostForm},
        user::{Identity, User},
    },
    session,
    templates::{
        CommentView, EditPostTemplate, IndexTemplate, Layout, Pager, PostTemplate, PostView,
        render,
    },
    utils::pagination::{PageParams, PageRequest},
};

const SHOW_FOLLOWED_COOKIE: &str = "show_followed";
const SHOW_FOLLOWED_DAYS: i64 = 30;

/// Home page: the post form and either every post or the followed feed.
pub async fn index(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    render_index(
        &pool,
        &config,
        &identity,
        &session,
        &headers,
        params.request(),
        String::new(),
        Vec::new(),
    )
    .await
}

/// Publishes a post from the home page form.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<PostForm>,
) -> Result<Response, HtmlError> {
    let Some(user) = identity.user().filter(|u| u.can(Permissions::WRITE_ARTICLES)) else {
        return Err(AppError::Forbidden("You may not write posts.".to_string()).into());
    };

    if let Err(e) = form.validate() {
        return render_index(
            &pool,
            &config,
            &identity,
            &session,
            &headers,
            PageRequest::default(),
            form.body,
            validation_messages(&e),
        )
        .await;
    }

    posts::create(&pool, user.id, &form.body).await?;
    Ok(Redirect::to("/").into_response())
}

#[allow(clippy::too_many_arguments)]
async fn render_index(
    pool: &SqlitePool,
    config: &Config,
    identity: &Identity,
    session: &Session,
    headers: &HeaderMap,
    request: PageRequest,
    body: String,
    errors: Vec<String>,
) -> Result<Response, HtmlError> {
    let secure = !config.ssl_disable;
    let show_followed = identity.is_authenticated()
        && cookie_value(headers, SHOW_FOLLOWED_COOKIE).is_some_and(|v| !v.is_empty());

    let page = match identity.user() {
        Some(user) if show_followed => {
            posts::followed_posts(pool, user.id, request, config.posts_per_page).await?
        }
        _ => posts::list(pool, request, config.posts_per_page).await?,
    };

    render(&IndexTemplate {
        layout: Layout::build(identity, session, secure).await?,
        can_write: identity.can(Permissions::WRITE_ARTICLES),
        show_followed,
        body,
        errors,
        posts: page
            .items
            .iter()
            .map(|p| PostView::new(p, identity, secure))
            .collect(),
        pager: Pager::new(&page, "/", ""),
    })
}

/// Switches the home page to every post.
pub async fn show_all(AuthUser(_): AuthUser) -> impl IntoResponse {
    show_followed_cookie("")
}

/// Switches the home page to the followed feed.
pub async fn show_followed(AuthUser(_): AuthUser) -> impl IntoResponse {
    show_followed_cookie("1")
}

fn show_followed_cookie(value: &'static str) -> impl IntoResponse {
    let cookie = Cookie::build((SHOW_FOLLOWED_COOKIE, value))
        .path("/")
        .max_age(Duration::days(SHOW_FOLLOWED_DAYS))
        .build();
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to("/"),
    )
}

/// A single post with its comments, oldest first.
pub async fn post(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    render_post(
        &pool,
        &config,
        &identity,
        &session,
        id,
        params.request(),
        String::new(),
        Vec::new(),
    )
    .await
}

/// Adds a comment, then jumps to the last comment page.
pub async fn add_comment(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, HtmlError> {
    if !user.can(Permissions::COMMENT) {
        return Err(AppError::Forbidden("You may not comment.".to_string()).into());
    }
    if posts::find(&pool, id).await?.is_none() {
        return Err(AppError::NotFound("Post not found".to_string()).into());
    }

    if let Err(e) = form.validate() {
        return render_post(
            &pool,
            &config,
            &Identity::User(user),
            &session,
            id,
            PageRequest::default(),
            form.body,
            validation_messages(&e),
        )
        .await;
    }

    comments::create(&pool, id, user.id, &form.body).await?;
    session::flash(&session, "Your comment has been published.").await?;
    Ok(Redirect::to(&format!("/post/{id}?page=-1#comments")).into_response())
}

#[allow(clippy::too_many_arguments)]
async fn render_post(
    pool: &SqlitePool,
    config: &Config,
    identity: &Identity,
    session: &Session,
    id: i64,
    request: PageRequest,
    body: String,
    errors: Vec<String>,
) -> Result<Response, HtmlError> {
    let secure = !config.ssl_disable;
    let post = posts::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let moderate = identity.can(Permissions::MODERATE_COMMENTS);
    let page = comments::for_post(pool, id, request, config.posts_per_page).await?;

    render(&PostTemplate {
        layout: Layout::build(identity, session, secure).await?,
        posts: vec![PostView::new(&post, identity, secure)],
        can_comment: identity.can(Permissions::COMMENT),
        body,
        errors,
        comments: page
            .items
            .iter()
            .map(|c| CommentView::new(c, moderate, secure))
            .collect(),
        moderate,
        pager: Pager::new(&page, &format!("/post/{id}"), "#comments"),
    })
}

/// Edit form; only the author or an administrator may open it.
pub async fn edit_page(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, HtmlError> {
    let post = editable_post(&pool, &user, id).await?;
    render(&EditPostTemplate {
        layout: Layout::build(&Identity::User(user), &session, !config.ssl_disable).await?,
        post_id: post.id,
        body: post.body,
        errors: Vec::new(),
    })
}

pub async fn edit(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Response, HtmlError> {
    let post = editable_post(&pool, &user, id).await?;

    if let Err(e) = form.validate() {
        return render(&EditPostTemplate {
            layout: Layout::build(&Identity::User(user), &session, !config.ssl_disable).await?,
            post_id: post.id,
            body: form.body,
            errors: validation_messages(&e),
        });
    }

    posts::set_body(&pool, post.id, &form.body).await?;
    session::flash(&session, "The post has been updated.").await?;
    Ok(Redirect::to(&format!("/post/{}", post.id)).into_response())
}

async fn editable_post(
    pool: &SqlitePool,
    user: &User,
    id: i64,
) -> Result<Post, HtmlError> {
    let post = posts::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if post.author_id != user.id && !user.can(Permissions::ADMINISTER) {
        return Err(AppError::Forbidden("You may not edit this post.".to_string()).into());
    }
    Ok(post)
}
