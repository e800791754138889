// src/db/mod.rs

use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::utils::pagination::{Page, PageRequest};

pub mod comments;
pub mod follows;
pub mod posts;
pub mod roles;
pub mod users;

/// Opens a pool, retrying while the database is unreachable.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut retry_count = 0;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

/// Single-connection in-memory database with the schema applied.
///
/// The connection is never recycled, since that would drop the database.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Brings reference data up to date: canonical roles and missing self-follows.
pub async fn deploy(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    roles::insert_roles(pool).await?;
    let restored = follows::add_self_follows(pool).await?;
    if restored > 0 {
        tracing::info!("Restored {} missing self-follow(s)", restored);
    }
    Ok(())
}

/// Resolves `request` against `total` rows and returns `(page, limit, offset)`.
pub(crate) fn bounds(request: PageRequest, total: i64, per_page: i64) -> (i64, i64, i64) {
    let page = request.resolve(total, per_page);
    (page, per_page, (page - 1) * per_page)
}

pub(crate) fn page<T>(items: Vec<T>, page: i64, per_page: i64, total: i64) -> Page<T> {
    Page {
        items,
        page,
        per_page,
        total,
    }
}
