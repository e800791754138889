// src/lib.rs

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod templates;
pub mod utils;

pub use routes::create_router;
