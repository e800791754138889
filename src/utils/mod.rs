// src/utils/mod.rs

pub mod hash;
pub mod html;
pub mod mail;
pub mod pagination;
pub mod token;
