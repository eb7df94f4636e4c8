/// Middleware modules
///
/// - `auth`: JWT bearer authentication

pub mod auth;
