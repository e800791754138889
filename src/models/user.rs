// src/models/user.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::role::Permissions,
    utils::hash,
};

pub static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").expect("username pattern is valid"));

/// A row of the 'users' table joined with its role.
///
/// The password hash is private and has no accessor; use
/// [`User::verify_password`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    password_hash: String,
    pub confirmed: bool,
    pub role_id: Option<i64>,
    pub role_name: Option<String>,
    pub role_permissions: Option<Permissions>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub avatar_hash: String,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl User {
    /// True iff the user has a role and that role carries every bit of `permissions`.
    pub fn can(&self, permissions: Permissions) -> bool {
        self.role_permissions
            .is_some_and(|granted| granted.contains(permissions))
    }

    pub fn is_administrator(&self) -> bool {
        self.can(Permissions::ADMINISTER)
    }

    pub fn verify_password(&self, password: &str) -> Result<bool, AppError> {
        hash::verify_password(password, &self.password_hash)
    }

    /// Gravatar image URL for this account.
    pub fn gravatar(&self, size: u32, secure: bool) -> String {
        gravatar_url(&self.avatar_hash, size, secure)
    }
}

/// Gravatar image URL for an avatar hash.
pub fn gravatar_url(hash: &str, size: u32, secure: bool) -> String {
    let base = if secure {
        "https://secure.gravatar.com/avatar"
    } else {
        "http://www.gravatar.com/avatar"
    };
    format!("{base}/{hash}?s={size}&d=identicon&r=g")
}

/// Lowercase hex MD5 of the normalized email.
pub fn avatar_hash(email: &str) -> String {
    let digest = Md5::digest(email.trim().to_lowercase().as_bytes());
    format!("{:x}", digest)
}

/// Whoever is making the request.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(User),
}

impl Identity {
    /// Always false for anonymous visitors.
    pub fn can(&self, permissions: Permissions) -> bool {
        match self {
            Identity::Anonymous => false,
            Identity::User(user) => user.can(permissions),
        }
    }

    pub fn is_administrator(&self) -> bool {
        match self {
            Identity::Anonymous => false,
            Identity::User(user) => user.is_administrator(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }

    pub fn id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }
}

/// Data needed to insert a user. The role is resolved by the data layer.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub confirmed: bool,
}

/// Login form.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 64, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    /// HTML checkbox: present ("on") when ticked.
    pub remember_me: Option<String>,
}

/// Registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = 1, max = 64, message = "Email must be between 1 and 64 characters."),
        email(message = "Invalid email address.")
    )]
    pub email: String,
    #[validate(
        length(min = 1, max = 64, message = "Username must be between 1 and 64 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Usernames must have only letters, numbers, dots or underscores."
        )
    )]
    pub username: String,
    #[validate(
        length(min = 1, message = "Password is required."),
        must_match(other = "password2", message = "Passwords must match.")
    )]
    pub password: String,
    #[validate(length(min = 1, message = "Please confirm the password."))]
    pub password2: String,
}

/// Profile fields a user may edit on their own account.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EditProfileForm {
    #[validate(length(max = 64, message = "Real name must be at most 64 characters."))]
    #[serde(default)]
    pub name: String,
    #[validate(length(max = 64, message = "Location must be at most 64 characters."))]
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub about_me: String,
}

/// Everything an administrator may change on any account.
#[derive(Debug, Deserialize, Validate)]
pub struct EditProfileAdminForm {
    #[validate(
        length(min = 1, max = 64, message = "Email must be between 1 and 64 characters."),
        email(message = "Invalid email address.")
    )]
    pub email: String,
    #[validate(
        length(min = 1, max = 64, message = "Username must be between 1 and 64 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Usernames must have only letters, numbers, dots or underscores."
        )
    )]
    pub username: String,
    pub confirmed: Option<String>,
    pub role: i64,
    #[validate(length(max = 64, message = "Real name must be at most 64 characters."))]
    #[serde(default)]
    pub name: String,
    #[validate(length(max = 64, message = "Location must be at most 64 characters."))]
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub about_me: String,
}

/// Empty form input is stored as NULL.
pub fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// API representation of a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserJson {
    pub url: String,
    pub username: String,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub posts: String,
    pub followed_posts: String,
    pub post_count: i64,
}

impl UserJson {
    pub fn new(user: &User, post_count: i64, config: &Config) -> Self {
        Self {
            url: config.external_url(&format!("/api/v1/users/{}", user.id)),
            username: user.username.clone(),
            member_since: user.member_since,
            last_seen: user.last_seen,
            posts: config.external_url(&format!("/api/v1/users/{}/posts/", user.id)),
            followed_posts: config.external_url(&format!("/api/v1/users/{}/timeline/", user.id)),
            post_count,
        }
    }
}
