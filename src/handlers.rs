// src/handlers.rs

pub mod auth;
pub mod cost_hints;
pub mod profile;
pub mod quotes;
pub mod sessions;
pub mod webhooks;
