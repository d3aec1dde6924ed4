// src/db.rs

pub mod cost_hint_repo;
pub mod profile_repo;
pub mod quote_repo;
pub mod user_repo;

pub use cost_hint_repo::CostHintRepository;
pub use profile_repo::ProfileRepository;
pub use quote_repo::QuoteRepository;
pub use user_repo::UserRepository;
