// src/db/roles.rs

use sqlx::{SqliteConnection, SqlitePool};

use crate::models::role::{ADMINISTRATOR_ROLE, Role, seed_roles};

/// Upserts the canonical roles by name.
///
/// Existing rows get their permissions and default flag overwritten; any
/// other role keeps its data but loses the default flag.
pub async fn insert_roles(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for seed in seed_roles() {
        sqlx::query(
            r#"
            INSERT INTO roles (name, is_default, permissions)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE
            SET is_default = excluded.is_default,
                permissions = excluded.permissions
            "#,
        )
        .bind(seed.name)
        .bind(seed.is_default)
        .bind(seed.permissions)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(default) = seed_roles().into_iter().find(|r| r.is_default) {
        sqlx::query("UPDATE roles SET is_default = 0 WHERE name <> ?")
            .bind(default.name)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::debug!("Roles seeded");
    Ok(())
}

pub async fn all(pool: &SqlitePool) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT id, name, is_default, permissions FROM roles ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT id, name, is_default, permissions FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Role given to a new account: administrator for the configured admin
/// email, the default role otherwise.
pub(crate) async fn role_for_new_user(
    conn: &mut SqliteConnection,
    email: &str,
    admin_email: Option<&str>,
) -> Result<Option<i64>, sqlx::Error> {
    if admin_email.is_some_and(|admin| admin.eq_ignore_ascii_case(email)) {
        let admin: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
            .bind(ADMINISTRATOR_ROLE)
            .fetch_optional(&mut *conn)
            .await?;
        if admin.is_some() {
            return Ok(admin);
        }
    }

    sqlx::query_scalar("SELECT id FROM roles WHERE is_default = 1 ORDER BY id LIMIT 1")
        .fetch_optional(&mut *conn)
        .await
}
