// src/models/role.rs

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Set of capability bits carried by a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct Permissions(u8);

impl Permissions {
    pub const NONE: Permissions = Permissions(0);
    pub const FOLLOW: Permissions = Permissions(0x01);
    pub const COMMENT: Permissions = Permissions(0x02);
    pub const WRITE_ARTICLES: Permissions = Permissions(0x04);
    pub const MODERATE_COMMENTS: Permissions = Permissions(0x08);
    pub const ADMINISTER: Permissions = Permissions(0x80);
    pub const ALL: Permissions = Permissions(0xff);

    pub const fn from_bits(bits: u8) -> Self {
        Permissions(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True when every bit of `other` is present.
    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Permissions) {
        self.0 |= rhs.0;
    }
}

/// Represents the 'roles' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub permissions: Permissions,
}

/// Canonical role set written at startup.
#[derive(Debug, Clone, Copy)]
pub struct RoleSeed {
    pub name: &'static str,
    pub permissions: Permissions,
    pub is_default: bool,
}

pub const ADMINISTRATOR_ROLE: &str = "Administrator";

pub fn seed_roles() -> [RoleSeed; 3] {
    let user = Permissions::FOLLOW | Permissions::COMMENT | Permissions::WRITE_ARTICLES;
    [
        RoleSeed {
            name: "User",
            permissions: user,
            is_default: true,
        },
        RoleSeed {
            name: "Moderator",
            permissions: user | Permissions::MODERATE_COMMENTS,
            is_default: false,
        },
        RoleSeed {
            name: ADMINISTRATOR_ROLE,
            permissions: Permissions::ALL,
            is_default: false,
        },
    ]
}
