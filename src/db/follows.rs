// src/db/follows.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    db,
    models::follow::FollowEntry,
    utils::pagination::{Page, PageRequest},
};

/// Creates the edge `follower -> followed`.
///
/// Returns `false` when the edge already existed; never creates a duplicate.
pub async fn follow(pool: &SqlitePool, follower: i64, followed: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO follows (follower_id, followed_id, timestamp)
        VALUES (?, ?, ?)
        ON CONFLICT(follower_id, followed_id) DO NOTHING
        "#,
    )
    .bind(follower)
    .bind(followed)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Removes the edge `follower -> followed` if present.
///
/// Self-edges are kept: the feed relies on everyone following themselves.
/// Returns whether an edge was removed.
pub async fn unfollow(
    pool: &SqlitePool,
    follower: i64,
    followed: i64,
) -> Result<bool, sqlx::Error> {
    if follower == followed {
        return Ok(false);
    }

    let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followed_id = ?")
        .bind(follower)
        .bind(followed)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn is_following(
    pool: &SqlitePool,
    follower: i64,
    followed: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND followed_id = ?)",
    )
    .bind(follower)
    .bind(followed)
    .fetch_one(pool)
    .await
}

/// Whether `user` is followed by `follower`.
pub async fn is_followed_by(
    pool: &SqlitePool,
    user: i64,
    follower: i64,
) -> Result<bool, sqlx::Error> {
    is_following(pool, follower, user).await
}

/// Number of other users following `user_id`.
pub async fn follower_count(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE followed_id = ? AND follower_id <> followed_id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Number of other users `user_id` follows.
pub async fn followed_count(pool: &SqlitePool, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND follower_id <> followed_id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Users following `user_id`, most recent edge first.
pub async fn followers(
    pool: &SqlitePool,
    user_id: i64,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<FollowEntry>, sqlx::Error> {
    let total = follower_count(pool, user_id).await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, FollowEntry>(
        r#"
        SELECT u.id AS user_id, u.username, u.avatar_hash, f.timestamp
        FROM follows f
        JOIN users u ON u.id = f.follower_id
        WHERE f.followed_id = ? AND f.follower_id <> f.followed_id
        ORDER BY f.timestamp DESC, u.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(db::page(items, page, per_page, total))
}

/// Users `user_id` follows, most recent edge first.
pub async fn followed(
    pool: &SqlitePool,
    user_id: i64,
    request: PageRequest,
    per_page: i64,
) -> Result<Page<FollowEntry>, sqlx::Error> {
    let total = followed_count(pool, user_id).await?;
    let (page, limit, offset) = db::bounds(request, total, per_page);

    let items = sqlx::query_as::<_, FollowEntry>(
        r#"
        SELECT u.id AS user_id, u.username, u.avatar_hash, f.timestamp
        FROM follows f
        JOIN users u ON u.id = f.followed_id
        WHERE f.follower_id = ? AND f.follower_id <> f.followed_id
        ORDER BY f.timestamp DESC, u.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(db::page(items, page, per_page, total))
}

/// Restores the self-edge of every user missing one. Returns how many were added.
pub async fn add_self_follows(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO follows (follower_id, followed_id, timestamp)
        SELECT id, id, ? FROM users
        "#,
    )
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{deploy, memory_pool, users};
    use crate::models::user::NewUser;

    async fn two_users() -> (SqlitePool, i64, i64) {
        let pool = memory_pool().await.unwrap();
        deploy(&pool).await.unwrap();
        let mut ids = Vec::new();
        for (email, username) in [("a@example.com", "alice"), ("b@example.com", "bob")] {
            let user = users::create(
                &pool,
                &NewUser {
                    email,
                    username,
                    password: "cat",
                    confirmed: true,
                },
                None,
            )
            .await
            .unwrap();
            ids.push(user.id);
        }
        (pool, ids[0], ids[1])
    }

    async fn edge_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM follows")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn follow_and_unfollow_are_symmetric_views_of_one_edge() {
        let (pool, a, b) = two_users().await;

        assert!(!is_following(&pool, a, b).await.unwrap());
        assert!(follow(&pool, a, b).await.unwrap());
        assert!(is_following(&pool, a, b).await.unwrap());
        assert!(is_followed_by(&pool, b, a).await.unwrap());
        assert!(!is_following(&pool, b, a).await.unwrap());

        assert!(unfollow(&pool, a, b).await.unwrap());
        assert!(!is_following(&pool, a, b).await.unwrap());
        assert!(!is_followed_by(&pool, b, a).await.unwrap());
        assert!(!unfollow(&pool, a, b).await.unwrap());
    }

    #[tokio::test]
    async fn following_twice_creates_one_edge() {
        let (pool, a, b) = two_users().await;
        let before = edge_count(&pool).await;

        assert!(follow(&pool, a, b).await.unwrap());
        assert!(!follow(&pool, a, b).await.unwrap());
        assert_eq!(edge_count(&pool).await, before + 1);
    }

    #[tokio::test]
    async fn self_edges_exist_and_survive_unfollow() {
        let (pool, a, _) = two_users().await;

        assert!(is_following(&pool, a, a).await.unwrap());
        assert!(!unfollow(&pool, a, a).await.unwrap());
        assert!(is_following(&pool, a, a).await.unwrap());
    }

    #[tokio::test]
    async fn listings_exclude_the_self_edge() {
        let (pool, a, b) = two_users().await;
        follow(&pool, a, b).await.unwrap();

        assert_eq!(follower_count(&pool, b).await.unwrap(), 1);
        assert_eq!(followed_count(&pool, b).await.unwrap(), 0);

        let page = followers(&pool, b, PageRequest::Number(1), 15).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "alice");

        let page = followed(&pool, a, PageRequest::Number(1), 15).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].username, "bob");
    }

    #[tokio::test]
    async fn deleting_a_user_removes_all_their_edges() {
        let (pool, a, b) = two_users().await;
        follow(&pool, a, b).await.unwrap();
        follow(&pool, b, a).await.unwrap();

        assert!(users::delete(&pool, b).await.unwrap());

        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? OR followed_id = ?",
        )
        .bind(b)
        .bind(b)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(orphans, 0);
        assert_eq!(edge_count(&pool).await, 1);
        assert!(!is_followed_by(&pool, a, b).await.unwrap());
    }

    #[tokio::test]
    async fn missing_self_follows_are_restored() {
        let (pool, a, _) = two_users().await;
        sqlx::query("DELETE FROM follows WHERE follower_id = followed_id")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(add_self_follows(&pool).await.unwrap(), 2);
        assert_eq!(add_self_follows(&pool).await.unwrap(), 0);
        assert!(is_following(&pool, a, a).await.unwrap());
    }
}
