// src/models.rs

pub mod auth;
pub mod premise;
pub mod profile;
pub mod quote;
