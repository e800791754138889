// src/db/posts.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    db,
    models::post::Post,
    utils::{
        html::render_post_body,
        pagination::{Page, PageRequest},
    },
};

const SELECT_POST: &str = r#"
    SELECT p.id, p.author_id, p.body, p.body_html, p.timestamp,
           u.username AS author_username, u.avatar_hash AS author_avatar_hash,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

const NEWEST_FIRST: &str = "ORDER BY p.timestamp DESC, p.id DESC LIMIT ? OFFSET ?";

/// Publishes a post. `body_html` is derived from `body` here and nowhere else.
pub async fn create(pool: &SqlitePool, author_id: i64, body: &str) -> Result<Post, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO posts (author_id, body, body_html, timestamp)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(body)
    .bind(render_post_body(body))
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    tracing::debug!("Post {} published by user {}", id, author_id);

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Replaces the body and recomputes its HTML in the same statement.
pub async fn set_body(pool: &SqlitePool, id: i64, body: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE posts SET body = ?, body_html = ? WHERE id = ?")
        .bind(body)
        .bind(render_post_body(body))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!("{SELECT_POST} WHERE p.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Every post, newest first.
pub async fn list(
    pool: &SqlitePool,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<Post>, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, Post>(&format!("{SELECT_POST} {NEWEST_FIRST}"))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(db::page(items, page, per_page, total))
}

/// Posts written by `author_id`, newest first.
pub async fn by_author(
    pool: &SqlitePool,
    author_id: i64,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<Post>, sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, Post>(&format!(
        "{SELECT_POST} WHERE p.author_id = ? {NEWEST_FIRST}"
    ))
    .bind(author_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(db::page(items, page, per_page, total))
}

/// The feed: posts by everyone `user_id` follows, newest first.
///
/// Includes the user's own posts through the self-edge.
pub async fn followed_posts(
    pool: &SqlitePool,
    user_id: i64,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<Post>, sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM posts p
        JOIN follows f ON f.followed_id = p.author_id
        WHERE f.follower_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, Post>(&format!(
        r#"{SELECT_POST}
        JOIN follows f ON f.followed_id = p.author_id
        WHERE f.follower_id = ?
        {NEWEST_FIRST}"#
    ))
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(db::page(items, page, per_page, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{deploy, follows, memory_pool, users};
    use crate::models::user::NewUser;

    async fn user(pool: &SqlitePool, email: &str, username: &str) -> i64 {
        users::create(
            pool,
            &NewUser {
                email,
                username,
                password: "cat",
                confirmed: true,
            },
            None,
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn body_html_is_derived_on_every_write() {
        let pool = memory_pool().await.unwrap();
        deploy(&pool).await.unwrap();
        let author = user(&pool, "a@example.com", "alice").await;

        let post = create(&pool, author, "**hi** <script>x()</script>").await.unwrap();
        assert!(post.body_html.contains("<strong>hi</strong>"));
        assert!(!post.body_html.contains("script"));

        assert!(set_body(&pool, post.id, "*changed*").await.unwrap());
        let post = find(&pool, post.id).await.unwrap().unwrap();
        assert_eq!(post.body, "*changed*");
        assert!(post.body_html.contains("<em>changed</em>"));
        assert!(!post.body_html.contains("strong"));
    }

    #[tokio::test]
    async fn own_posts_are_in_the_feed_before_following_anyone() {
        let pool = memory_pool().await.unwrap();
        deploy(&pool).await.unwrap();
        let alice = user(&pool, "a@example.com", "alice").await;

        let post = create(&pool, alice, "first").await.unwrap();
        let feed = followed_posts(&pool, alice, PageRequest::Number(1), 15)
            .await
            .unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].id, post.id);
    }

    #[tokio::test]
    async fn feed_follows_the_edge_set_newest_first() {
        let pool = memory_pool().await.unwrap();
        deploy(&pool).await.unwrap();
        let alice = user(&pool, "a@example.com", "alice").await;
        let bob = user(&pool, "b@example.com", "bob").await;
        let carol = user(&pool, "c@example.com", "carol").await;

        let from_bob = create(&pool, bob, "from bob").await.unwrap();
        create(&pool, carol, "from carol").await.unwrap();
        let from_alice = create(&pool, alice, "from alice").await.unwrap();

        let feed = followed_posts(&pool, alice, PageRequest::Number(1), 15)
            .await
            .unwrap();
        assert_eq!(feed.total, 1);

        follows::follow(&pool, alice, bob).await.unwrap();
        let feed = followed_posts(&pool, alice, PageRequest::Number(1), 15)
            .await
            .unwrap();
        let ids: Vec<i64> = feed.items.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![from_alice.id, from_bob.id]);

        follows::unfollow(&pool, alice, bob).await.unwrap();
        let feed = followed_posts(&pool, alice, PageRequest::Number(1), 15)
            .await
            .unwrap();
        assert_eq!(feed.total, 1);
    }

    #[tokio::test]
    async fn listing_pages_thirty_one_posts() {
        let pool = memory_pool().await.unwrap();
        deploy(&pool).await.unwrap();
        let alice = user(&pool, "a@example.com", "alice").await;
        for i in 0..31 {
            create(&pool, alice, &format!("post {i}")).await.unwrap();
        }

        let mut sizes = Vec::new();
        for n in 1..=4 {
            let page = list(&pool, PageRequest::Number(n), 15).await.unwrap();
            sizes.push(page.items.len());
        }
        assert_eq!(sizes, vec![15, 15, 1, 0]);

        let last = list(&pool, PageRequest::Last, 15).await.unwrap();
        assert_eq!(last.page, 3);
        assert_eq!(last.items[0].body, "post 0");

        let first = list(&pool, PageRequest::Number(1), 15).await.unwrap();
        assert_eq!(first.items[0].body, "post 30");
        assert!(first.has_next() && !first.has_prev());
    }

    #[tokio::test]
    async fn deleting_an_author_deletes_their_posts() {
        let pool = memory_pool().await.unwrap();
        deploy(&pool).await.unwrap();
        let alice = user(&pool, "a@example.com", "alice").await;
        let post = create(&pool, alice, "bye").await.unwrap();

        users::delete(&pool, alice).await.unwrap();
        assert!(find(&pool, post.id).await.unwrap().is_none());
    }
}
