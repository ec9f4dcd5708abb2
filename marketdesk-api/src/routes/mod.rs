/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, logout and the current session
/// - `admin`: Account administration and dashboard counts
/// - `master_data`: Reference data per kind
/// - `pricing`: Pricing configurations and resolution

pub mod admin;
pub mod auth;
pub mod health;
pub mod master_data;
pub mod pricing;
