// src/models/comment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::Config;

/// A row of the 'comments' table with its author's display fields.
#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub body: String,
    pub body_html: String,
    pub timestamp: DateTime<Utc>,
    /// Hidden by a moderator.
    pub disabled: bool,
    pub author_username: String,
    pub author_avatar_hash: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "The comment body is required."))]
    pub body: String,
}

/// Body of `POST /api/v1/posts/{id}/comments/`.
#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub body: Option<String>,
}

impl CommentPayload {
    pub fn into_body(self) -> Result<String, crate::error::AppError> {
        match self.body {
            Some(body) if !body.trim().is_empty() => Ok(body),
            _ => Err(crate::error::AppError::BadRequest(
                "comment does not have a body".to_string(),
            )),
        }
    }
}

/// API representation of a comment.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentJson {
    pub url: String,
    pub post: String,
    pub body: String,
    pub body_html: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
}

impl CommentJson {
    pub fn new(comment: &Comment, config: &Config) -> Self {
        Self {
            url: config.external_url(&format!("/api/v1/comments/{}", comment.id)),
            post: config.external_url(&format!("/api/v1/posts/{}", comment.post_id)),
            body: comment.body.clone(),
            body_html: comment.body_html.clone(),
            timestamp: comment.timestamp,
            author: config.external_url(&format!("/api/v1/users/{}", comment.author_id)),
        }
    }
}
