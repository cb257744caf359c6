use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use duoq_shared::errors::{AppError, ErrorCode};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

/// Usernames: 3-20 chars, letters/numbers/underscore.
pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.len() < 3 || username.len() > 20 {
        return Err(AppError::new(
            ErrorCode::InvalidUsername,
            "username must be between 3 and 20 characters",
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(AppError::new(
            ErrorCode::InvalidUsername,
            "username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("hunter42x").unwrap();
        assert!(verify_password("hunter42x", &hash).unwrap());
        assert!(!verify_password("hunter42y", &hash).unwrap());
    }

    #[test]
    fn weak_passwords_are_rejected() {
        assert!(validate_password("short1").is_err());
        assert!(validate_password("nodigitshere").is_err());
        assert!(validate_password("123456789").is_err());
        assert!(validate_password("goodpass1").is_ok());
    }

    #[test]
    fn usernames_are_bounded_and_alphanumeric() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("a".repeat(21).as_str()).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("jett_main_42").is_ok());
    }
}
