// src/models/mod.rs

pub mod comment;
pub mod follow;
pub mod post;
pub mod role;
pub mod user;

pub use role::Permissions;
