//! # TaskBoard Shared Library
//!
//! Access control, caching and domain services shared by the TaskBoard API.
//!
//! ## Module Organization
//!
//! - `access`: resource hierarchy, permission engine and the `AccessService` façade
//! - `cache`: typed read-through cache over in-memory or Redis backends
//! - `db`: connection pool and migrations
//! - `events`: domain events published after mutations
//! - `models`: database models
//! - `redis`: Redis client
//! - `services`: domain services (companies, boards, columns, tasks, memberships)
//! - `store`: store traits with PostgreSQL and in-memory implementations

pub mod access;
pub mod cache;
pub mod db;
pub mod events;
pub mod models;
pub mod redis;
pub mod services;
pub mod store;

/// Current version of the TaskBoard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
