//! Client-side format checks run before anything reaches the backend.

use crate::error::ValidationError;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Validate a username.
///
/// Accepts 3-32 ASCII letters, digits, `_` or `-`, starting with a letter.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }

    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::UsernameLength {
            min: USERNAME_MIN_LEN,
            max: USERNAME_MAX_LEN,
            actual: len,
        });
    }

    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(ValidationError::UsernameCharacter(bad));
    }

    if !username.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::UsernameStart);
    }

    Ok(())
}

/// Validate the password chosen for a new account.
///
/// # Errors
/// - Length outside 8-128 characters
/// - Missing a lowercase letter, uppercase letter, digit or symbol
pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    check_password_length(password, PASSWORD_MIN_LEN)?;

    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::PasswordMissing("lowercase letter"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::PasswordMissing("uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasswordMissing("digit"));
    }
    if password.chars().all(|c| c.is_alphanumeric()) {
        return Err(ValidationError::PasswordMissing("symbol"));
    }

    Ok(())
}

/// Validate a password supplied at login.
///
/// Only the shape is checked here; strength rules apply at account creation.
pub fn validate_login_password(password: &str) -> Result<(), ValidationError> {
    check_password_length(password, 1)
}

fn check_password_length(password: &str, min: usize) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    let len = password.chars().count();
    if len < min || len > PASSWORD_MAX_LEN {
        return Err(ValidationError::PasswordLength {
            min,
            max: PASSWORD_MAX_LEN,
            actual: len,
        });
    }
    Ok(())
}

/// Validate a file name used for upload or as a local save target.
///
/// The name must be a single path component.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::FileName("name cannot be empty".to_string()));
    }
    if name == "." || name == ".." {
        return Err(ValidationError::FileName(format!("{name:?} is reserved")));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(ValidationError::FileName(format!(
            "{name:?} cannot contain separators"
        )));
    }
    Ok(())
}
