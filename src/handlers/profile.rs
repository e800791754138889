// src/handlers/profile.rs

use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;
use validator::Validate;

use crate::{
    config::Config,
    db::{follows, posts, roles, users},
    error::{AppError, HtmlError, validation_messages},
    extract::{AuthUser, CurrentUser},
    models::{
        Permissions,
        user::{EditProfileAdminForm, EditProfileForm, Identity, User, non_empty},
    },
    session,
    templates::{
        EditProfileAdminTemplate, EditProfileTemplate, Layout, Pager, PostView, ProfileView,
        RoleOption, UserTemplate, format_time, render,
    },
    utils::pagination::PageParams,
};

/// Public profile with the user's posts, newest first.
pub async fn user(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    CurrentUser(identity): CurrentUser,
    session: Session,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, HtmlError> {
    let secure = !config.ssl_disable;
    let user = users::find_by_username(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {username} not found")))?;

    let page = posts::by_author(&pool, user.id, params.request(), config.posts_per_page).await?;

    let (is_following, follows_viewer) = match identity.id() {
        Some(viewer) if viewer != user.id => (
            follows::is_following(&pool, viewer, user.id).await?,
            follows::is_followed_by(&pool, viewer, user.id).await?,
        ),
        _ => (false, false),
    };

    let profile = ProfileView {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        location: user.location.clone(),
        about_me: user.about_me.clone(),
        avatar_url: user.gravatar(256, secure),
        member_since: format_time(&user.member_since),
        last_seen: format_time(&user.last_seen),
        post_count: page.total,
        followers: follows::follower_count(&pool, user.id).await?,
        following: follows::followed_count(&pool, user.id).await?,
    };

    render(&UserTemplate {
        layout: Layout::build(&identity, &session, secure).await?,
        is_self: identity.id() == Some(user.id),
        viewer_is_admin: identity.is_administrator(),
        can_follow: identity.can(Permissions::FOLLOW),
        is_following,
        follows_viewer,
        posts: page
            .items
            .iter()
            .map(|p| PostView::new(p, &identity, secure))
            .collect(),
        pager: Pager::new(&page, &format!("/user/{}", user.username), ""),
        profile,
    })
}

pub async fn edit_profile_page(
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
) -> Result<Response, HtmlError> {
    let form = EditProfileForm {
        name: user.name.clone().unwrap_or_default(),
        location: user.location.clone().unwrap_or_default(),
        about_me: user.about_me.clone().unwrap_or_default(),
    };
    render_edit_profile(&config, user, &session, form, Vec::new()).await
}

/// Updates the caller's own name, location and bio.
pub async fn edit_profile(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(user): AuthUser,
    session: Session,
    Form(form): Form<EditProfileForm>,
) -> Result<Response, HtmlError> {
    if let Err(e) = form.validate() {
        return render_edit_profile(&config, user, &session, form, validation_messages(&e)).await;
    }

    users::update_profile(
        &pool,
        user.id,
        non_empty(&form.name),
        non_empty(&form.location),
        non_empty(&form.about_me),
    )
    .await?;
    session::flash(&session, "Your profile has been updated.").await?;
    Ok(Redirect::to(&format!("/user/{}", user.username)).into_response())
}

async fn render_edit_profile(
    config: &Config,
    user: User,
    session: &Session,
    form: EditProfileForm,
    errors: Vec<String>,
) -> Result<Response, HtmlError> {
    render(&EditProfileTemplate {
        layout: Layout::build(&Identity::User(user), session, !config.ssl_disable).await?,
        name: form.name,
        location: form.location,
        about_me: form.about_me,
        errors,
    })
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_administrator() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator access required.".to_string(),
        ))
    }
}

/// Administrator view of any account.
pub async fn edit_profile_admin_page(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(admin): AuthUser,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, HtmlError> {
    require_admin(&admin)?;
    let target = users::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let roles = roles::all(&pool).await?;
    render(&EditProfileAdminTemplate {
        layout: Layout::build(&Identity::User(admin), &session, !config.ssl_disable).await?,
        user_id: target.id,
        email: target.email,
        username: target.username,
        confirmed: target.confirmed,
        roles: RoleOption::list(&roles, target.role_id),
        name: target.name.unwrap_or_default(),
        location: target.location.unwrap_or_default(),
        about_me: target.about_me.unwrap_or_default(),
        errors: Vec::new(),
    })
}

/// Overwrites any account. Email and username stay unique; the role must exist.
pub async fn edit_profile_admin(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AuthUser(admin): AuthUser,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<EditProfileAdminForm>,
) -> Result<Response, HtmlError> {
    require_admin(&admin)?;
    let target = users::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let email = form.email.trim().to_string();
    let username = form.username.trim().to_string();

    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => validation_messages(&e),
    };
    if errors.is_empty() {
        if email != target.email && users::email_taken(&pool, &email).await? {
            errors.push("Email already registered.".to_string());
        }
        if username != target.username && users::username_taken(&pool, &username).await? {
            errors.push("Username already in use.".to_string());
        }
        if roles::find(&pool, form.role).await?.is_none() {
            errors.push("Unknown role.".to_string());
        }
    }

    if errors.is_empty() {
        let update = users::AdminUpdate {
            email: &email,
            username: &username,
            confirmed: form.confirmed.is_some(),
            role_id: form.role,
            name: non_empty(&form.name),
            location: non_empty(&form.location),
            about_me: non_empty(&form.about_me),
        };
        match users::admin_update(&pool, target.id, &update).await {
            Ok(()) => {
                tracing::info!("Administrator {} updated user {}", admin.username, target.id);
                session::flash(&session, "The profile has been updated.").await?;
                return Ok(Redirect::to(&format!("/user/{username}")).into_response());
            }
            Err(AppError::Conflict(msg)) => errors.push(msg),
            Err(e) => return Err(e.into()),
        }
    }

    let roles = roles::all(&pool).await?;
    render(&EditProfileAdminTemplate {
        layout: Layout::build(&Identity::User(admin), &session, !config.ssl_disable).await?,
        user_id: target.id,
        email,
        username,
        confirmed: form.confirmed.is_some(),
        roles: RoleOption::list(&roles, Some(form.role)),
        name: form.name,
        location: form.location,
        about_me: form.about_me,
        errors,
    })
}

/// Deletes an account with its posts, comments and follow edges.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    AuthUser(admin): AuthUser,
    session: Session,
    Path(id): Path<i64>,
) -> Result<Response, HtmlError> {
    require_admin(&admin)?;
    if id == admin.id {
        session::flash(&session, "You cannot delete your own account.").await?;
        return Ok(Redirect::to(&format!("/edit-profile/{id}")).into_response());
    }

    if !users::delete(&pool, id).await? {
        return Err(AppError::NotFound("User not found".to_string()).into());
    }
    tracing::info!("Administrator {} deleted user {}", admin.username, id);
    session::flash(&session, "The user has been deleted.").await?;
    Ok(Redirect::to("/").into_response())
}
