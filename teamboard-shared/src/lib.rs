//! # Teamboard Shared Library
//!
//! Domain types, storage and realtime plumbing used by the Teamboard API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: users, boards, tasks, messages and teams
//! - `auth`: password hashing, session tokens, the bearer gate and access rules
//! - `store`: the [`store::Repository`] trait with its PostgreSQL and in-memory
//!   backings, and the per-request selector [`store::Storage`]
//! - `db`: connection pool and migrations for the PostgreSQL backing
//! - `realtime`: room-based event hub

pub mod auth;
pub mod db;
pub mod models;
pub mod realtime;
pub mod store;

/// Current version of the Teamboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
