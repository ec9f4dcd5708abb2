/// Middleware for the API server
///
/// - `security`: hardening response headers
/// - `session`: bearer-token session resolution

pub mod security;
pub mod session;
