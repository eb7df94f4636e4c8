/// API route handlers
///
/// Each handler resolves the caller from the bearer token and calls one
/// domain-service operation:
///
/// - `health`: Health check endpoint
/// - `companies`, `boards`, `columns`, `tasks`: board hierarchy
/// - `memberships`: role grants and revocations
/// - `task_types`: per-company reference data

pub mod boards;
pub mod columns;
pub mod companies;
pub mod health;
pub mod memberships;
pub mod task_types;
pub mod tasks;
