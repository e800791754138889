// src/db/users.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    db::roles,
    error::{AppError, is_unique_violation},
    models::user::{NewUser, User, avatar_hash},
    utils::hash::hash_password,
};

const SELECT_USER: &str = r#"
    SELECT u.id, u.email, u.username, u.password_hash, u.confirmed, u.role_id,
           r.name AS role_name, r.permissions AS role_permissions,
           u.name, u.location, u.about_me, u.avatar_hash, u.member_since, u.last_seen
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

/// Fields an administrator may overwrite.
#[derive(Debug)]
pub struct AdminUpdate<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub confirmed: bool,
    pub role_id: i64,
    pub name: Option<&'a str>,
    pub location: Option<&'a str>,
    pub about_me: Option<&'a str>,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE u.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE u.email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE u.username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub async fn username_taken(pool: &SqlitePool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
        .bind(username)
        .fetch_one(pool)
        .await
}

/// Registers an account.
///
/// Assigns the role, stores the password hash and creates the self-follow
/// in one transaction. A duplicate email or username is a `Conflict`; a
/// database without a default role refuses the account.
pub async fn create(
    pool: &SqlitePool,
    new_user: &NewUser<'_>,
    admin_email: Option<&str>,
) -> Result<User, AppError> {
    let password_hash = hash_password(new_user.password)?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let role_id = roles::role_for_new_user(&mut *tx, new_user.email, admin_email)
        .await?
        .ok_or_else(|| {
            AppError::InternalServerError("no default role, run `inkpost deploy`".to_string())
        })?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users
            (email, username, password_hash, confirmed, role_id, avatar_hash, member_since, last_seen)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(new_user.email)
    .bind(new_user.username)
    .bind(&password_hash)
    .bind(new_user.confirmed)
    .bind(role_id)
    .bind(avatar_hash(new_user.email))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(duplicate_account)?;

    sqlx::query("INSERT INTO follows (follower_id, followed_id, timestamp) VALUES (?, ?, ?)")
        .bind(id)
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!("Registered user {} (id={})", new_user.username, id);

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::InternalServerError(format!("user {id} vanished after insert")))
}

pub async fn confirm(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET confirmed = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records activity by moving `last_seen` to now.
pub async fn ping(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    name: Option<&str>,
    location: Option<&str>,
    about_me: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET name = ?, location = ?, about_me = ? WHERE id = ?")
        .bind(name)
        .bind(location)
        .bind(about_me)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Overwrites an account as an administrator. The avatar hash follows the email.
pub async fn admin_update(
    pool: &SqlitePool,
    id: i64,
    update: &AdminUpdate<'_>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, username = ?, confirmed = ?, role_id = ?,
            name = ?, location = ?, about_me = ?, avatar_hash = ?
        WHERE id = ?
        "#,
    )
    .bind(update.email)
    .bind(update.username)
    .bind(update.confirmed)
    .bind(update.role_id)
    .bind(update.name)
    .bind(update.location)
    .bind(update.about_me)
    .bind(avatar_hash(update.email))
    .bind(id)
    .execute(pool)
    .await
    .map_err(duplicate_account)?;
    Ok(())
}

/// Deletes an account. Its posts, comments and follow edges go with it.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn post_count(pool: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

fn duplicate_account(err: sqlx::Error) -> AppError {
    if !is_unique_violation(&err) {
        return AppError::from(err);
    }
    let detail = err
        .as_database_error()
        .map(|d| d.message().to_string())
        .unwrap_or_default();
    if detail.contains("users.email") {
        AppError::Conflict("Email already registered.".to_string())
    } else if detail.contains("users.username") {
        AppError::Conflict("Username already in use.".to_string())
    } else {
        AppError::Conflict("Account already exists.".to_string())
    }
}
