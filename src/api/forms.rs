//! Credential form checks
//!
//! Client-side validation run before the auth endpoints are called.

use regex::Regex;
use std::sync::OnceLock;

use super::dto::RegisterRequest;
use super::error::ApiError;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_USERNAME_LEN: usize = 3;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("static email pattern"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Check login form input
pub fn validate_login(email: &str, password: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) || password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(
            "Enter a valid email and password (min 6 chars)".to_string(),
        ));
    }
    Ok(())
}

/// Check registration form input
pub fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    if !is_valid_email(&request.email)
        || request.username.trim().chars().count() < MIN_USERNAME_LEN
        || request.password.chars().count() < MIN_PASSWORD_LEN
    {
        return Err(ApiError::Validation(
            "Provide a valid email, username (≥3), and password (≥6)".to_string(),
        ));
    }
    Ok(())
}

/// Password strength score from 0 to 4: one point each for
/// length, an uppercase letter, a digit and a symbol.
pub fn password_strength(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= MIN_PASSWORD_LEN,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    checks.iter().filter(|ok| **ok).count() as u8
}

/// Human label for a strength score
pub fn strength_label(score: u8) -> &'static str {
    match score {
        0 | 1 => "weak",
        2 => "fair",
        3 => "good",
        _ => "strong",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("analyst@lab.example"));
        assert!(!is_valid_email("analyst@lab"));
        assert!(!is_valid_email("analyst.lab.example"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_login_checks() {
        assert!(validate_login("analyst@lab.example", "secret1").is_ok());
        let err = validate_login("analyst@lab.example", "short").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Enter a valid email and password (min 6 chars)"
        );
    }

    #[test]
    fn test_registration_checks() {
        assert!(validate_registration(&request("a@b.io", "ops", "secret")).is_ok());
        assert!(validate_registration(&request("a@b.io", "  op  ", "secret")).is_err());
        assert!(validate_registration(&request("a@b", "ops", "secret")).is_err());
        assert!(validate_registration(&request("a@b.io", "ops", "12345")).is_err());
    }

    #[test]
    fn test_password_strength() {
        assert_eq!(password_strength(""), 0);
        assert_eq!(password_strength("abcdef"), 1);
        assert_eq!(password_strength("Abcdef"), 2);
        assert_eq!(password_strength("Abcde1"), 3);
        assert_eq!(password_strength("SecureOps#2040"), 4);
        assert_eq!(strength_label(4), "strong");
    }
}
