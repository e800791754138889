// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::{
    handlers::{
        api::{self, authentication},
        auth, blog, follow, moderation, profile,
    },
    middleware::https_redirect,
    state::AppState,
};

const SESSION_COOKIE: &str = "inkpost_session";

/// Assembles the application router.
///
/// * Web pages use a session cookie (memory store).
/// * `/api/v1` uses Basic credentials, CORS and an optional rate limit.
/// * HTTPS redirect and tracing wrap everything.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let auth_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/confirm", get(auth::resend_confirmation))
        .route("/confirm/{token}", get(auth::confirm))
        .route("/unconfirmed", get(auth::unconfirmed));

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(!config.ssl_disable)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnSessionEnd);

    let web_routes = Router::new()
        .route("/", get(blog::index).post(blog::create_post))
        .route("/all", get(blog::show_all))
        .route("/followed", get(blog::show_followed))
        .route("/post/{id}", get(blog::post).post(blog::add_comment))
        .route("/edit/{id}", get(blog::edit_page).post(blog::edit))
        .route("/user/{username}", get(profile::user))
        .route(
            "/edit-profile",
            get(profile::edit_profile_page).post(profile::edit_profile),
        )
        .route(
            "/edit-profile/{id}",
            get(profile::edit_profile_admin_page).post(profile::edit_profile_admin),
        )
        .route("/edit-profile/{id}/delete", post(profile::delete_user))
        .route("/follow/{username}", get(follow::follow))
        .route("/unfollow/{username}", get(follow::unfollow))
        .route("/followers/{username}", get(follow::followers))
        .route("/followed-by/{username}", get(follow::followed_by))
        .route("/moderate", get(moderation::moderate))
        .route("/moderate/enable/{id}", get(moderation::enable))
        .route("/moderate/disable/{id}", get(moderation::disable))
        .nest("/auth", auth_routes)
        .layer(session_layer);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let mut api_routes = Router::new()
        .route("/tokens/", post(authentication::get_token))
        .route(
            "/posts/",
            get(api::posts::get_posts).post(api::posts::new_post),
        )
        .route(
            "/posts/{id}",
            get(api::posts::get_post).put(api::posts::edit_post),
        )
        .route(
            "/posts/{id}/comments/",
            get(api::comments::get_post_comments).post(api::comments::new_post_comment),
        )
        .route("/users/{id}", get(api::users::get_user))
        .route("/users/{id}/posts/", get(api::users::get_user_posts))
        .route(
            "/users/{id}/timeline/",
            get(api::users::get_user_followed_posts),
        )
        .route("/comments/", get(api::comments::get_comments))
        .route("/comments/{id}", get(api::comments::get_comment))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication::authenticate,
        ))
        .layer(cors);

    if let Some(per_second) = config.api_rate_limit.filter(|n| *n > 0) {
        // Replenishes one request every 1000/n ms, bursting up to n.
        let governor_conf = GovernorConfigBuilder::default()
            .per_millisecond((1000 / per_second).max(1))
            .burst_size(per_second.min(u64::from(u32::MAX)) as u32)
            .finish();
        match governor_conf {
            Some(conf) => {
                tracing::info!("API rate limit: {} requests/s per client", per_second);
                api_routes = api_routes.layer(GovernorLayer::new(Arc::new(conf)));
            }
            None => tracing::warn!("Invalid API rate limit {}, not applied", per_second),
        }
    }

    Router::new()
        .merge(web_routes)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn_with_state(config, https_redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
