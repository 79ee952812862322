// handlers/public/mod.rs - Unauthenticated endpoints

pub mod auth;
pub mod health;

pub use health::{health, root};
