//! Built-in rule kinds
//!
//! Every rule except `presence` passes absent and `null` values, so a patch
//! can clear an optional field without tripping format checks.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::evaluator::{Rule, RuleError, RuleResult};
use super::message::{format_count, format_value};

/// All built-in rules
pub fn all() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(Presence),
        Arc::new(NotBlank),
        Arc::new(Length),
        Arc::new(Format::default()),
        Arc::new(Email),
        Arc::new(Inclusion),
        Arc::new(Exclusion),
        Arc::new(Numericality),
    ]
}

fn defined(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn number_option(rule: &str, options: &Value, key: &str) -> RuleResult<Option<f64>> {
    match options.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| RuleError::bad_options(rule, format!("'{}' must be a number", key))),
    }
}

fn list_option<'a>(rule: &str, options: &'a Value) -> RuleResult<&'a Vec<Value>> {
    let list = match options {
        Value::Array(items) => Some(items),
        other => other.get("within").and_then(Value::as_array),
    };
    list.ok_or_else(|| RuleError::bad_options(rule, "expected a list or {\"within\": [...]}"))
}

/// Fails on absent or null values
pub struct Presence;

impl Rule for Presence {
    fn name(&self) -> &str {
        "presence"
    }

    fn check(&self, value: Option<&Value>, _options: &Value) -> RuleResult<Vec<String>> {
        Ok(match defined(value) {
            Some(_) => vec![],
            None => vec!["can't be blank".into()],
        })
    }
}

/// Fails on strings that are empty or only whitespace
pub struct NotBlank;

impl Rule for NotBlank {
    fn name(&self) -> &str {
        "notBlank"
    }

    fn check(&self, value: Option<&Value>, _options: &Value) -> RuleResult<Vec<String>> {
        Ok(match defined(value) {
            Some(Value::String(s)) if s.trim().is_empty() => vec!["can't be blank".into()],
            _ => vec![],
        })
    }
}

/// Character count of strings, element count of arrays
pub struct Length;

impl Rule for Length {
    fn name(&self) -> &str {
        "length"
    }

    fn check_options(&self, options: &Value) -> RuleResult<()> {
        for key in ["is", "minimum", "maximum"] {
            number_option(self.name(), options, key)?;
        }
        Ok(())
    }

    fn check(&self, value: Option<&Value>, options: &Value) -> RuleResult<Vec<String>> {
        let Some(value) = defined(value) else {
            return Ok(vec![]);
        };
        let len = match value {
            Value::String(s) => s.chars().count() as f64,
            Value::Array(items) => items.len() as f64,
            _ => return Ok(vec!["has an incorrect length".into()]),
        };

        let mut messages = Vec::new();
        if let Some(is) = number_option(self.name(), options, "is")? {
            if len != is {
                messages.push(format!(
                    "is the wrong length (should be {} characters)",
                    format_count(is)
                ));
            }
        }
        if let Some(minimum) = number_option(self.name(), options, "minimum")? {
            if len < minimum {
                messages.push(format!(
                    "is too short (minimum is {} characters)",
                    format_count(minimum)
                ));
            }
        }
        if let Some(maximum) = number_option(self.name(), options, "maximum")? {
            if len > maximum {
                messages.push(format!(
                    "is too long (maximum is {} characters)",
                    format_count(maximum)
                ));
            }
        }
        Ok(messages)
    }
}

/// Whole-string regex match
///
/// Options: a pattern string, or `{"pattern": ..., "flags": "i"}`. Compiled
/// patterns are cached per pattern and flags.
#[derive(Default)]
pub struct Format {
    compiled: Mutex<HashMap<(String, String), Regex>>,
}

impl Format {
    fn pattern<'a>(&self, options: &'a Value) -> RuleResult<(&'a str, &'a str)> {
        match options {
            Value::String(pattern) => Ok((pattern.as_str(), "")),
            other => {
                let pattern = other
                    .get("pattern")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RuleError::bad_options(self.name(), "missing 'pattern'"))?;
                let flags = other.get("flags").and_then(Value::as_str).unwrap_or("");
                Ok((pattern, flags))
            }
        }
    }

    fn build(&self, pattern: &str, flags: &str) -> RuleResult<Regex> {
        let mut builder = RegexBuilder::new(&format!("^(?:{})$", pattern));
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                // no meaning for a single whole-string match
                'g' | 'u' => {}
                other => {
                    let reason = format!("unsupported flag '{}'", other);
                    return Err(RuleError::bad_options(self.name(), reason));
                }
            }
        }
        builder
            .build()
            .map_err(|e| RuleError::bad_options(self.name(), e.to_string()))
    }

    fn compile(&self, options: &Value) -> RuleResult<Regex> {
        let (pattern, flags) = self.pattern(options)?;
        let key = (pattern.to_string(), flags.to_string());

        let mut compiled = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(regex) = compiled.get(&key) {
            return Ok(regex.clone());
        }
        let regex = self.build(pattern, flags)?;
        compiled.insert(key, regex.clone());
        Ok(regex)
    }

    #[cfg(test)]
    fn cached_patterns(&self) -> usize {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Rule for Format {
    fn name(&self) -> &str {
        "format"
    }

    fn check_options(&self, options: &Value) -> RuleResult<()> {
        self.compile(options).map(|_| ())
    }

    fn check(&self, value: Option<&Value>, options: &Value) -> RuleResult<Vec<String>> {
        let Some(value) = defined(value) else {
            return Ok(vec![]);
        };
        let regex = self.compile(options)?;
        Ok(match value {
            Value::String(s) if regex.is_match(s) => vec![],
            _ => vec!["is invalid".into()],
        })
    }
}

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(concat!(
        r"^[a-z0-9\x{7F}-\x{FFFF}!#$%&'*+/=?^_`{|}~-]+",
        r"(?:\.[a-z0-9\x{7F}-\x{FFFF}!#$%&'*+/=?^_`{|}~-]+)*",
        r"@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$",
    ))
    .case_insensitive(true)
    .build()
    .expect("email pattern is a valid regex")
});

/// Email address shape
pub struct Email;

impl Rule for Email {
    fn name(&self) -> &str {
        "email"
    }

    fn check(&self, value: Option<&Value>, _options: &Value) -> RuleResult<Vec<String>> {
        Ok(match defined(value) {
            None => vec![],
            Some(Value::String(s)) if EMAIL_PATTERN.is_match(s) => vec![],
            Some(_) => vec!["is not a valid email".into()],
        })
    }
}

/// Value must be one of a list
pub struct Inclusion;

impl Rule for Inclusion {
    fn name(&self) -> &str {
        "inclusion"
    }

    fn check_options(&self, options: &Value) -> RuleResult<()> {
        list_option(self.name(), options).map(|_| ())
    }

    fn check(&self, value: Option<&Value>, options: &Value) -> RuleResult<Vec<String>> {
        let within = list_option(self.name(), options)?;
        Ok(match defined(value) {
            Some(v) if !within.contains(v) => {
                vec![format!("^{} is not included in the list", format_value(v))]
            }
            _ => vec![],
        })
    }
}

/// Value must not be one of a list
pub struct Exclusion;

impl Rule for Exclusion {
    fn name(&self) -> &str {
        "exclusion"
    }

    fn check_options(&self, options: &Value) -> RuleResult<()> {
        list_option(self.name(), options).map(|_| ())
    }

    fn check(&self, value: Option<&Value>, options: &Value) -> RuleResult<Vec<String>> {
        let within = list_option(self.name(), options)?;
        Ok(match defined(value) {
            Some(v) if within.contains(v) => vec![format!("^{} is restricted", format_value(v))],
            _ => vec![],
        })
    }
}

/// Numeric bounds
///
/// Strings are parsed as numbers unless `noStrings` is set. With `strict`,
/// strings must also be plain decimal literals (no whitespace, exponent or
/// leading zeros).
pub struct Numericality;

fn flag(options: &Value, key: &str) -> bool {
    options.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn is_plain_number(s: &str, only_integer: bool) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    let int_ok = int == "0" || (all_digits(int) && !int.starts_with('0'));
    let frac_ok = match frac {
        None => true,
        Some(frac) => !only_integer && all_digits(frac),
    };
    int_ok && frac_ok
}

const BOUNDS: [(&str, &str); 5] = [
    ("greaterThan", "greater than"),
    ("greaterThanOrEqualTo", "greater than or equal to"),
    ("equalTo", "equal to"),
    ("lessThanOrEqualTo", "less than or equal to"),
    ("lessThan", "less than"),
];

impl Rule for Numericality {
    fn name(&self) -> &str {
        "numericality"
    }

    fn check_options(&self, options: &Value) -> RuleResult<()> {
        for (key, _) in BOUNDS {
            number_option(self.name(), options, key)?;
        }
        Ok(())
    }

    fn check(&self, value: Option<&Value>, options: &Value) -> RuleResult<Vec<String>> {
        let Some(value) = defined(value) else {
            return Ok(vec![]);
        };
        let only_integer = flag(options, "onlyInteger");
        let n = match value {
            Value::String(s) if !flag(options, "noStrings") => {
                if flag(options, "strict") && !is_plain_number(s, only_integer) {
                    return Ok(vec!["must be a valid number".into()]);
                }
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
            }
            other => other.as_f64(),
        };
        let Some(n) = n else {
            return Ok(vec!["is not a number".into()]);
        };

        if only_integer && n.fract() != 0.0 {
            return Ok(vec!["must be an integer".into()]);
        }

        let mut messages = Vec::new();
        for (key, label) in BOUNDS {
            let Some(bound) = number_option(self.name(), options, key)? else {
                continue;
            };
            let ok = match key {
                "greaterThan" => n > bound,
                "greaterThanOrEqualTo" => n >= bound,
                "equalTo" => n == bound,
                "lessThanOrEqualTo" => n <= bound,
                _ => n < bound,
            };
            if !ok {
                messages.push(format!("must be {} {}", label, format_count(bound)));
            }
        }
        Ok(messages)
    }
}
