// ABOUTME: Library root for nocli - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod error;
pub mod gateway;
pub mod health;
pub mod runtime;
pub mod server;
pub mod stream;
pub mod types;
