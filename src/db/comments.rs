// src/db/comments.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    db,
    models::comment::Comment,
    utils::{
        html::render_comment_body,
        pagination::{Page, PageRequest},
    },
};

const SELECT_COMMENT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, c.body, c.body_html, c.timestamp, c.disabled,
           u.username AS author_username, u.avatar_hash AS author_avatar_hash
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Adds a comment to a post, deriving its stripped HTML.
pub async fn create(
    pool: &SqlitePool,
    post_id: i64,
    author_id: i64,
    body: &str,
) -> Result<Comment, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (post_id, author_id, body, body_html, timestamp, disabled)
        VALUES (?, ?, ?, ?, ?, 0)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(author_id)
    .bind(body)
    .bind(render_comment_body(body))
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!("{SELECT_COMMENT} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Moderation switch. Returns `false` when the comment does not exist.
pub async fn set_disabled(pool: &SqlitePool, id: i64, disabled: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE comments SET disabled = ? WHERE id = ?")
        .bind(disabled)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Comments under a post, oldest first. Disabled ones are included.
pub async fn for_post(
    pool: &SqlitePool,
    post_id: i64,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<Comment>, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, Comment>(&format!(
        "{SELECT_COMMENT} WHERE c.post_id = ? ORDER BY c.timestamp ASC, c.id ASC LIMIT ? OFFSET ?"
    ))
    .bind(post_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(db::page(items, page, per_page, total))
}

/// Every comment, newest first.
pub async fn list(
    pool: &SqlitePool,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<Comment>, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, Comment>(&format!(
        "{SELECT_COMMENT} ORDER BY c.timestamp DESC, c.id DESC LIMIT ? OFFSET ?"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(db::page(items, page, per_page, total))
}
