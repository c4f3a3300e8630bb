use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;
use crate::users::dto::{RegisterRequest, UpdateUserRequest};
use crate::users::repo::Role;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z ]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.trim().is_empty() {
        return Err(AppError::InvalidInput("Error: Required field.".into()));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(AppError::InvalidInput(
            "Error: Only alphabets allowed.".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::InvalidInput(
            "Error: Invalid email format.".into(),
        ));
    }
    Ok(())
}

/// At least 8 chars with one uppercase, one lowercase, one digit and one
/// symbol (underscore does not count as a symbol).
pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::InvalidInput(
            "Error: Password must be at least 8 characters.".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::InvalidInput(
            "Error: Password must contain an uppercase letter.".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::InvalidInput(
            "Error: Password must contain a lowercase letter.".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidInput(
            "Error: Password must contain a number.".into(),
        ));
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && c != '_') {
        return Err(AppError::InvalidInput(
            "Error: Password must contain a special character.".into(),
        ));
    }
    Ok(())
}

pub fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse()
        .map_err(|_| AppError::InvalidInput("Error: Invalid role.".into()))
}

/// Registration: all fields required; role defaults to `user` when absent.
pub fn validate_register(req: &RegisterRequest) -> Result<Role, AppError> {
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    match req.role.as_deref() {
        Some(r) => parse_role(r),
        None => Ok(Role::User),
    }
}

/// Update: each rule applies only when its field is supplied.
pub fn validate_update(req: &UpdateUserRequest) -> Result<Option<Role>, AppError> {
    if let Some(username) = &req.username {
        validate_username(username)?;
    }
    if let Some(email) = &req.email {
        validate_email(email)?;
    }
    if let Some(password) = &req.password {
        validate_password(password)?;
    }
    match req.role.as_deref() {
        Some(r) => Ok(Some(parse_role(r)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_allows_letters_and_spaces() {
        assert!(validate_username("Alice Doe").is_ok());
        assert!(validate_username("Alice2").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
    }

    #[test]
    fn email_syntax_is_checked() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@x.com").is_err());
    }

    #[test]
    fn password_policy_requires_all_character_classes() {
        assert!(validate_password("Abcdef1!").is_ok());
        assert!(validate_password("Ab1!").is_err()); // too short
        assert!(validate_password("abcdef1!").is_err()); // no uppercase
        assert!(validate_password("ABCDEF1!").is_err()); // no lowercase
        assert!(validate_password("Abcdefg!").is_err()); // no digit
        assert!(validate_password("Abcdefg1").is_err()); // no symbol
        assert!(validate_password("Abcdefg1_").is_err()); // underscore is not a symbol
    }

    #[test]
    fn role_must_be_user_or_admin() {
        assert_eq!(parse_role("user").unwrap(), Role::User);
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert!(parse_role("superuser").is_err());
    }

    #[test]
    fn register_defaults_role_to_user() {
        let req = RegisterRequest {
            username: "Alice Doe".into(),
            email: "a@x.com".into(),
            password: "Abcdef1!".into(),
            role: None,
        };
        assert_eq!(validate_register(&req).unwrap(), Role::User);
    }

    #[test]
    fn update_ignores_absent_fields() {
        assert_eq!(validate_update(&UpdateUserRequest::default()).unwrap(), None);
        let bad = UpdateUserRequest {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(validate_update(&bad).is_err());
    }
}
