use std::sync::OnceLock;

use regex::Regex;

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("valid phone pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
    })
}

/// Ten digits, no separators.
pub fn is_valid_phone(phone: &str) -> bool {
    phone_pattern().is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Trimmed, non-empty text field.
pub fn required_text(field: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(trimmed.to_string())
    }
}
