pub mod auth;
pub mod error;
pub mod graph;
pub mod models;
pub mod openapi;
pub mod password;
pub mod policy;
pub mod rate_limit; // per-IP sliding window
pub mod repo;
pub mod routes;
pub mod security;
pub mod storage;
pub mod toggle;
pub mod views;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
