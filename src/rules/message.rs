//! Violation message formatting
//!
//! Rules produce bare messages ("is too short (minimum is 3 characters)").
//! The evaluator prefixes them with a readable attribute name, so
//! `first_name` becomes "First name is too short ...". A message starting
//! with `^` is used verbatim without the prefix.

use serde_json::Value;

/// Turns an attribute key into words: `first_name` -> "first name",
/// `avatarUrl` -> "avatar url", `address.city` -> "address city".
pub fn prettify(attribute: &str) -> String {
    let mut out = String::with_capacity(attribute.len() + 4);
    let mut prev: Option<char> = None;
    let mut chars = attribute.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '_' | '-' => out.push(' '),
            '\\' => {}
            '.' => {
                let joins_words = prev.is_some_and(|p| !p.is_whitespace())
                    && chars.peek().is_some_and(|n| !n.is_whitespace());
                out.push(if joins_words { ' ' } else { '.' });
            }
            c if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase()) => {
                out.push(' ');
                out.extend(c.to_lowercase());
            }
            c => out.extend(c.to_lowercase()),
        }
        prev = Some(c);
    }

    out
}

/// Uppercases the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds the full message for an attribute
pub fn full_message(attribute: &str, message: &str) -> String {
    match message.strip_prefix('^') {
        Some(verbatim) => verbatim.to_string(),
        None => capitalize(&format!("{} {}", prettify(attribute), message)),
    }
}

/// Renders a numeric option for messages (`3`, not `3.0`)
pub fn format_count(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Renders a value the way it should appear inside a message
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prettify() {
        assert_eq!(prettify("first_name"), "first name");
        assert_eq!(prettify("avatarUrl"), "avatar url");
        assert_eq!(prettify("registration-date"), "registration date");
        assert_eq!(prettify("address.city"), "address city");
        assert_eq!(prettify("password"), "password");
    }

    #[test]
    fn test_full_message() {
        assert_eq!(
            full_message("password", "is too short (minimum is 3 characters)"),
            "Password is too short (minimum is 3 characters)"
        );
        assert_eq!(full_message("first_name", "can't be blank"), "First name can't be blank");
        assert_eq!(full_message("email", "^Provide an email"), "Provide an email");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(3.0), "3");
        assert_eq!(format_count(2.5), "2.5");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("admin")), "admin");
        assert_eq!(format_value(&json!(3)), "3");
    }
}
