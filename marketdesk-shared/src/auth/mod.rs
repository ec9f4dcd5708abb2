/// Authentication and session management
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and registration password rules
/// - [`token`]: signed session tokens (HS256 JWT)
/// - [`provider`]: the [`provider::AuthProvider`] service, per-class session
///   policies and the error taxonomy
/// - [`middleware`]: per-request [`middleware::AuthContext`] and bearer parsing
///
/// # Example
///
/// ```
/// use marketdesk_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Welcome#2024")?;
/// assert!(verify_password("Welcome#2024", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod middleware;
pub mod password;
pub mod provider;
pub mod token;
