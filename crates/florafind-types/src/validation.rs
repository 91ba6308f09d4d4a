//! Field validation rules shared by every entry point that accepts user input

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 100;
pub const GARDEN_NAME_MIN_LEN: usize = 3;
pub const GARDEN_NAME_MAX_LEN: usize = 100;
pub const GARDEN_DESCRIPTION_MAX_LEN: usize = 1000;
pub const PLANT_ALIAS_MAX_LEN: usize = 100;
pub const NOTE_TEXT_MIN_LEN: usize = 3;
pub const POST_TITLE_MIN_LEN: usize = 3;
pub const POST_TITLE_MAX_LEN: usize = 100;
pub const POST_CONTENT_MIN_LEN: usize = 10;
pub const POST_CONTENT_MAX_LEN: usize = 5000;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is valid")
    })
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("email", "Invalid email format"))
    }
}

pub fn validate_username(username: &str) -> ValidationResult<()> {
    let len = char_len(username);
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::new(
            "username",
            format!(
                "Username must be between {} and {} characters long",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            ),
        ));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::new(
            "username",
            "Username must not contain whitespace",
        ));
    }
    Ok(())
}

/// Password strength: length bounds plus upper, lower and digit classes.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = char_len(password);
    if len < PASSWORD_MIN_LEN {
        return Err(ValidationError::new(
            "password",
            format!("Password must be at least {} characters long", PASSWORD_MIN_LEN),
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ValidationError::new(
            "password",
            format!("Password must be less than {} characters long", PASSWORD_MAX_LEN),
        ));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::new(
            "password",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::new(
            "password",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(
            "password",
            "Password must contain at least one digit",
        ));
    }
    Ok(())
}

/// Returns the trimmed garden name.
pub fn validate_garden_name(name: &str) -> ValidationResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("name", "Garden name must not be empty"));
    }
    let len = char_len(trimmed);
    if !(GARDEN_NAME_MIN_LEN..=GARDEN_NAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::new(
            "name",
            format!(
                "Garden name must be between {} and {} characters long",
                GARDEN_NAME_MIN_LEN, GARDEN_NAME_MAX_LEN
            ),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_garden_description(description: &str) -> ValidationResult<()> {
    if char_len(description) > GARDEN_DESCRIPTION_MAX_LEN {
        return Err(ValidationError::new(
            "description",
            format!(
                "Description must be at most {} characters long",
                GARDEN_DESCRIPTION_MAX_LEN
            ),
        ));
    }
    Ok(())
}

/// Returns the trimmed alias.
pub fn validate_plant_alias(alias: &str) -> ValidationResult<String> {
    let trimmed = alias.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("alias", "Plant alias must not be empty"));
    }
    if char_len(trimmed) > PLANT_ALIAS_MAX_LEN {
        return Err(ValidationError::new(
            "alias",
            format!("Plant alias must be at most {} characters long", PLANT_ALIAS_MAX_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

/// Returns the trimmed note text.
pub fn validate_note_text(text: &str) -> ValidationResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("text", "Note text must not be empty"));
    }
    if char_len(trimmed) < NOTE_TEXT_MIN_LEN {
        return Err(ValidationError::new(
            "text",
            format!("Note text must be at least {} characters long", NOTE_TEXT_MIN_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_post_title(title: &str) -> ValidationResult<()> {
    let len = char_len(title);
    if len < POST_TITLE_MIN_LEN {
        return Err(ValidationError::new(
            "title",
            format!("Title must be at least {} characters long", POST_TITLE_MIN_LEN),
        ));
    }
    if len > POST_TITLE_MAX_LEN {
        return Err(ValidationError::new(
            "title",
            format!("Title must be less than {} characters long", POST_TITLE_MAX_LEN),
        ));
    }
    Ok(())
}

pub fn validate_post_content(content: &str) -> ValidationResult<()> {
    let len = char_len(content);
    if len < POST_CONTENT_MIN_LEN {
        return Err(ValidationError::new(
            "content",
            format!("Content must be at least {} characters long", POST_CONTENT_MIN_LEN),
        ));
    }
    if len > POST_CONTENT_MAX_LEN {
        return Err(ValidationError::new(
            "content",
            format!("Content must be less than {} characters long", POST_CONTENT_MAX_LEN),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_email_format() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign.example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("user@example.c").is_err());
    }

    #[test]
    fn test_username_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password("Test1234!").is_ok());
        assert_eq!(validate_password("Ab1").unwrap_err().field, "password");
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("ALLUPPERCASE1").is_err());
        assert!(validate_password("NoDigitsHere").is_err());
        assert!(validate_password(&format!("Aa1{}", "x".repeat(98))).is_err());
    }

    #[test]
    fn test_garden_name_is_trimmed() {
        assert_eq!(validate_garden_name("  Backyard  ").unwrap(), "Backyard");
        assert!(validate_garden_name("   ").is_err());
        assert!(validate_garden_name("ab").is_err());
        assert!(validate_garden_name(&"g".repeat(101)).is_err());
    }

    #[test]
    fn test_note_text_rules() {
        assert_eq!(validate_note_text("  Watered today ").unwrap(), "Watered today");
        assert_eq!(
            validate_note_text(" ").unwrap_err().message,
            "Note text must not be empty"
        );
        assert!(validate_note_text("ok").is_err());
    }

    #[test]
    fn test_post_rules() {
        assert!(validate_post_title("Hi").is_err());
        assert!(validate_post_title("Hello").is_ok());
        assert!(validate_post_content("too short").is_err());
        assert!(validate_post_content("long enough content").is_ok());
        assert!(validate_post_content(&"c".repeat(5001)).is_err());
    }

    proptest! {
        #[test]
        fn prop_valid_passwords_are_accepted(
            upper in "[A-Z]{1,10}",
            lower in "[a-z]{1,10}",
            digits in "[0-9]{6,10}",
        ) {
            let password = format!("{}{}{}", upper, lower, digits);
            prop_assert!(validate_password(&password).is_ok());
        }

        #[test]
        fn prop_alias_never_keeps_surrounding_whitespace(alias in "[a-zA-Z0-9]{1,50}", pad in " {0,5}") {
            let padded = format!("{pad}{alias}{pad}");
            prop_assert_eq!(validate_plant_alias(&padded).unwrap(), alias);
        }
    }
}
