// src/templates.rs

use askama::Template;
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use tower_sessions::Session;

use crate::{
    error::{AppError, HtmlError},
    models::{
        Permissions, comment::Comment, follow::FollowEntry, post::Post, role::Role,
        user::{Identity, gravatar_url},
    },
    session,
    utils::pagination::Page,
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

pub fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

/// Renders any template as an HTML response.
pub fn render<T: Template>(template: &T) -> Result<Response, HtmlError> {
    let html = template.render().map_err(AppError::from)?;
    Ok(Html(html).into_response())
}

/// Signed-in user as shown in the navigation bar.
#[derive(Debug, Clone)]
pub struct NavUser {
    pub id: i64,
    pub username: String,
    pub avatar_url: String,
    pub confirmed: bool,
}

/// Data every page shares through `base.html`.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub current_user: Option<NavUser>,
    pub flashes: Vec<String>,
    pub can_moderate: bool,
}

impl Layout {
    /// Collects the navigation data and consumes pending flash messages.
    pub async fn build(
        identity: &Identity,
        session: &Session,
        secure: bool,
    ) -> Result<Self, HtmlError> {
        let flashes = session::take_flashes(session).await?;
        Ok(Self {
            current_user: identity.user().map(|u| NavUser {
                id: u.id,
                username: u.username.clone(),
                avatar_url: u.gravatar(18, secure),
                confirmed: u.confirmed,
            }),
            flashes,
            can_moderate: identity.can(Permissions::MODERATE_COMMENTS),
        })
    }
}

/// A post as listed or shown.
#[derive(Debug, Clone)]
pub struct PostView {
    pub id: i64,
    pub author_username: String,
    pub author_avatar: String,
    pub timestamp: String,
    pub body_html: String,
    pub comments_count: i64,
    pub can_edit: bool,
    pub is_admin_edit: bool,
}

impl PostView {
    pub fn new(post: &Post, viewer: &Identity, secure: bool) -> Self {
        let is_author = viewer.id() == Some(post.author_id);
        let is_admin = viewer.can(Permissions::ADMINISTER);
        Self {
            id: post.id,
            author_username: post.author_username.clone(),
            author_avatar: gravatar_url(&post.author_avatar_hash, 40, secure),
            timestamp: format_time(&post.timestamp),
            body_html: post.body_html.clone(),
            comments_count: post.comments_count,
            can_edit: is_author || is_admin,
            is_admin_edit: !is_author && is_admin,
        }
    }
}

/// A comment under a post or on the moderation page.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub author_username: String,
    pub author_avatar: String,
    pub timestamp: String,
    pub body_html: String,
    pub disabled: bool,
    /// Disabled comments are only shown to moderators.
    pub show_body: bool,
}

impl CommentView {
    pub fn new(comment: &Comment, moderator: bool, secure: bool) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author_username: comment.author_username.clone(),
            author_avatar: gravatar_url(&comment.author_avatar_hash, 40, secure),
            timestamp: format_time(&comment.timestamp),
            body_html: comment.body_html.clone(),
            disabled: comment.disabled,
            show_body: moderator || !comment.disabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FollowView {
    pub username: String,
    pub avatar_url: String,
    pub since: String,
}

impl FollowView {
    pub fn new(entry: &FollowEntry, secure: bool) -> Self {
        Self {
            username: entry.username.clone(),
            avatar_url: gravatar_url(&entry.avatar_hash, 32, secure),
            since: format_time(&entry.timestamp),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PagerLink {
    /// `None` renders as an ellipsis.
    pub num: Option<i64>,
    pub href: String,
    pub current: bool,
}

/// Pagination widget for a listing at `base` (a path without query string).
#[derive(Debug, Clone, Default)]
pub struct Pager {
    pub links: Vec<PagerLink>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pager {
    pub fn new<T>(page: &Page<T>, base: &str, fragment: &str) -> Self {
        let href = |n: i64| format!("{base}?page={n}{fragment}");
        Self {
            links: page
                .iter_pages()
                .into_iter()
                .map(|num| PagerLink {
                    num,
                    href: num.map(href).unwrap_or_default(),
                    current: num == Some(page.page),
                })
                .collect(),
            prev: page.prev_num().map(href),
            next: page.next_num().map(href),
        }
    }

    pub fn is_needed(&self) -> bool {
        self.links.len() > 1
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub layout: Layout,
    pub can_write: bool,
    pub show_followed: bool,
    pub body: String,
    pub errors: Vec<String>,
    pub posts: Vec<PostView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub layout: Layout,
    pub posts: Vec<PostView>,
    pub can_comment: bool,
    pub body: String,
    pub errors: Vec<String>,
    pub comments: Vec<CommentView>,
    pub moderate: bool,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "edit_post.html")]
pub struct EditPostTemplate {
    pub layout: Layout,
    pub post_id: i64,
    pub body: String,
    pub errors: Vec<String>,
}

/// Profile page data.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub avatar_url: String,
    pub member_since: String,
    pub last_seen: String,
    pub post_count: i64,
    pub followers: i64,
    pub following: i64,
}

#[derive(Template)]
#[template(path = "user.html")]
pub struct UserTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub is_self: bool,
    pub viewer_is_admin: bool,
    pub can_follow: bool,
    pub is_following: bool,
    pub follows_viewer: bool,
    pub posts: Vec<PostView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "edit_profile.html")]
pub struct EditProfileTemplate {
    pub layout: Layout,
    pub name: String,
    pub location: String,
    pub about_me: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RoleOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

impl RoleOption {
    pub fn list(roles: &[Role], selected: Option<i64>) -> Vec<Self> {
        roles
            .iter()
            .map(|r| RoleOption {
                id: r.id,
                name: r.name.clone(),
                selected: Some(r.id) == selected,
            })
            .collect()
    }
}

#[derive(Template)]
#[template(path = "edit_profile_admin.html")]
pub struct EditProfileAdminTemplate {
    pub layout: Layout,
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub confirmed: bool,
    pub roles: Vec<RoleOption>,
    pub name: String,
    pub location: String,
    pub about_me: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "followers.html")]
pub struct FollowersTemplate {
    pub layout: Layout,
    pub title: String,
    pub username: String,
    pub follows: Vec<FollowView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "moderate.html")]
pub struct ModerateTemplate {
    pub layout: Layout,
    pub page: i64,
    pub comments: Vec<CommentView>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub username: String,
    pub next: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub email: String,
    pub username: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "auth/unconfirmed.html")]
pub struct UnconfirmedTemplate {
    pub layout: Layout,
    pub username: String,
}

/// Standalone error page; it cannot rely on a session.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub code: u16,
    pub reason: String,
    pub message: String,
}

#[derive(Template)]
#[template(path = "mail/confirm.txt")]
pub struct ConfirmMailText<'a> {
    pub username: &'a str,
    pub confirm_url: &'a str,
}

#[derive(Template)]
#[template(path = "mail/confirm.html")]
pub struct ConfirmMailHtml<'a> {
    pub username: &'a str,
    pub confirm_url: &'a str,
}
