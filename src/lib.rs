// ABOUTME: Library root for skylift - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod bootstrap;
pub mod config;
pub mod deploy;
pub mod error;
pub mod exec;
pub mod provider;
pub mod retry;
pub mod ssh;
pub mod types;
pub mod workflow;
