use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

lazy_static! {
    /// Loose phone number shape: optional leading `+`, digits, spaces, dashes, parentheses
    /// - Valid: "+1-555-0101", "(021) 555 0101", "5550101"
    /// - Invalid: "call me", "12", "+1-555-0101 ext. 4"
    pub static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9(][0-9\s\-()]{4,19}$").unwrap();
}

/// Special characters accepted by the admin password policy
const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Password policy for accounts created by administrators: at least one
/// lowercase, one uppercase, one digit and one of `@$!%*?&`.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if has_lower && has_upper && has_digit && has_special {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength").with_message(
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character"
                .into(),
        ))
    }
}

/// Flatten `validator` output into "field: message" lines, nested fields dotted
pub fn field_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages = Vec::new();
    collect_messages(errors, "", &mut messages);
    messages.sort();
    messages
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' validation", error.code));
                    out.push(format!("{}: {}", path, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_phone_regex() {
        assert!(PHONE_REGEX.is_match("+1-555-0101"));
        assert!(PHONE_REGEX.is_match("(021) 555 0101"));
        assert!(PHONE_REGEX.is_match("5550101"));
        assert!(!PHONE_REGEX.is_match("call me"));
        assert!(!PHONE_REGEX.is_match("12"));
        assert!(!PHONE_REGEX.is_match(""));
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Str0ng!pass").is_ok());
        assert!(validate_password_strength("weakpass").is_err());
        assert!(validate_password_strength("NoDigits!").is_err());
        assert!(validate_password_strength("n0upper!").is_err());
        assert!(validate_password_strength("N0SPECIAL1a").is_err());
    }

    #[derive(Validate)]
    struct Inner {
        #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
        latitude: f64,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
        #[validate(nested)]
        inner: Inner,
    }

    #[test]
    fn test_field_messages_flatten_nested() {
        let value = Outer {
            title: String::new(),
            inner: Inner { latitude: 120.0 },
        };
        let errors = value.validate().unwrap_err();

        assert_eq!(
            field_messages(&errors),
            vec![
                "inner.latitude: Latitude must be between -90 and 90".to_string(),
                "title: Title is required".to_string(),
            ]
        );
    }
}
