// src/models/post.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::Config;

/// A row of the 'posts' table with its author's display fields.
///
/// `body_html` is only ever written by the data layer, derived from `body`.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub body: String,
    pub body_html: String,
    pub timestamp: DateTime<Utc>,
    pub author_username: String,
    pub author_avatar_hash: String,
    pub comments_count: i64,
}

/// Web form for writing or editing a post.
#[derive(Debug, Deserialize, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, message = "What's on your mind? The post body is required."))]
    pub body: String,
}

/// Body of `POST /api/v1/posts/` and `PUT /api/v1/posts/{id}`.
#[derive(Debug, Deserialize)]
pub struct PostPayload {
    pub body: Option<String>,
}

impl PostPayload {
    /// The body, or a bad request when missing or blank.
    pub fn into_body(self) -> Result<String, crate::error::AppError> {
        match self.body {
            Some(body) if !body.trim().is_empty() => Ok(body),
            _ => Err(crate::error::AppError::BadRequest(
                "post does not have a body".to_string(),
            )),
        }
    }
}

/// API representation of a post.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostJson {
    pub url: String,
    pub body: String,
    pub body_html: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub comments: String,
    pub comments_count: i64,
}

impl PostJson {
    pub fn new(post: &Post, config: &Config) -> Self {
        Self {
            url: config.external_url(&format!("/api/v1/posts/{}", post.id)),
            body: post.body.clone(),
            body_html: post.body_html.clone(),
            timestamp: post.timestamp,
            author: config.external_url(&format!("/api/v1/users/{}", post.author_id)),
            comments: config.external_url(&format!("/api/v1/posts/{}/comments/", post.id)),
            comments_count: post.comments_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_requires_a_body() {
        assert!(PostPayload { body: None }.into_body().is_err());
        assert!(PostPayload { body: Some("  ".into()) }.into_body().is_err());
        assert_eq!(
            PostPayload { body: Some("hello".into()) }.into_body().unwrap(),
            "hello"
        );
    }
}
