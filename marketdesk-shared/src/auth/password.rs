/// Password hashing and strength rules
///
/// Account secrets are stored as Argon2id PHC strings. Verification reads
/// the parameters back from the stored hash, so tuning [`HASH_PARAMS`] only
/// affects newly hashed passwords.
///
/// # Example
///
/// ```
/// use marketdesk_shared::auth::password::{check_password_strength, hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// check_password_strength("Welcome#2024")?;
///
/// let hash = hash_password("Welcome#2024")?;
/// assert!(verify_password("Welcome#2024", &hash)?);
/// assert!(!verify_password("welcome#2024", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, ParamsBuilder, Version,
};
use std::sync::OnceLock;

/// Argon2id cost parameters: (memory KiB, iterations, lanes)
pub const HASH_PARAMS: (u32, u32, u32) = (19_456, 2, 1);

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("failed to verify password: {0}")]
    Verify(String),
}

/// Reason a password was rejected at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordStrengthError {
    #[error("Password must be at least 8 characters long")]
    TooShort,

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSpecial,
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let (m_cost, t_cost, p_cost) = HASH_PARAMS;
    let params: Params = ParamsBuilder::new()
        .m_cost(m_cost)
        .t_cost(t_cost)
        .p_cost(p_cost)
        .build()
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Returns
///
/// PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC hash
///
/// # Returns
///
/// `Ok(false)` on mismatch; errors only for unreadable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Verify(e.to_string())),
    }
}

/// Verifies a password against a fixed dummy hash and discards the result
///
/// Logins for unknown accounts call this so they cost the same Argon2 work
/// as a wrong password.
pub fn verify_dummy(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let hash = DUMMY_HASH.get_or_init(|| hash_password("dummy#Password0").ok());
    if let Some(hash) = hash {
        let _ = verify_password(password, hash);
    }
}

/// Checks the registration password rules
///
/// At least [`MIN_PASSWORD_LENGTH`] characters with an uppercase letter, a
/// lowercase letter, a digit and a special character. The first failing
/// rule is reported.
pub fn check_password_strength(password: &str) -> Result<(), PasswordStrengthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordStrengthError::TooShort);
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(PasswordStrengthError::MissingUppercase);
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(PasswordStrengthError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordStrengthError::MissingDigit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(PasswordStrengthError::MissingSpecial);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_format() {
        let hash = hash_password("Secret#123").expect("hash should succeed");

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("Secret#123").unwrap();
        let second = hash_password("Secret#123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify() {
        let hash = hash_password("Secret#123").unwrap();

        assert!(verify_password("Secret#123", &hash).unwrap());
        assert!(!verify_password("secret#123", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_plaintext_storage() {
        // Legacy records stored the password itself
        assert!(matches!(
            verify_password("Secret#123", "Secret#123"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn test_strength_rules() {
        assert_eq!(check_password_strength("Ab1#"), Err(PasswordStrengthError::TooShort));
        assert_eq!(
            check_password_strength("lowercase1#"),
            Err(PasswordStrengthError::MissingUppercase)
        );
        assert_eq!(
            check_password_strength("UPPERCASE1#"),
            Err(PasswordStrengthError::MissingLowercase)
        );
        assert_eq!(
            check_password_strength("NoDigits#"),
            Err(PasswordStrengthError::MissingDigit)
        );
        assert_eq!(
            check_password_strength("NoSpecial123"),
            Err(PasswordStrengthError::MissingSpecial)
        );
        assert_eq!(check_password_strength("Welcome#2024"), Ok(()));
    }
}
