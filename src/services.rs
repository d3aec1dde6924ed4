// src/services.rs

pub mod ai;
pub mod auth;
pub mod cost_hint_service;
pub mod export_service;
pub mod plan_service;
pub mod quote_service;
