// src/models/follow.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// The other end of a follow edge, as listed on follower/followed pages.
#[derive(Debug, Clone, FromRow)]
pub struct FollowEntry {
    pub user_id: i64,
    pub username: String,
    pub avatar_hash: String,
    /// When the edge was created.
    pub timestamp: DateTime<Utc>,
}
