//! Rule evaluator
//!
//! Evaluates one attribute value against a rule set such as
//! `{"presence": true, "length": {"minimum": 3}}`. Each key names a rule kind
//! registered on the evaluator; the value is that rule's options. `false` or
//! `null` options disable the rule.
//!
//! The registry is fixed at construction. Evaluation is pure.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::builtin;
use super::message::full_message;
use crate::policy::{Attributes, RuleTable};

/// Rule evaluation errors; all of them point at a malformed declaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Rule kind not registered
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    /// Options do not fit the rule
    #[error("invalid options for rule '{rule}': {reason}")]
    BadOptions { rule: String, reason: String },

    /// A rule set must be a JSON object
    #[error("rule set for '{0}' must be an object")]
    NotAnObject(String),
}

impl RuleError {
    pub fn bad_options(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::BadOptions {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// Failing fields with their messages, in rule-table order
pub type FieldMessages = Vec<(String, Vec<String>)>;

/// A named rule kind.
///
/// `check` receives `None` for absent attributes. It returns bare messages
/// ("is invalid"); the evaluator adds the attribute prefix.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    /// Validates options at declaration time
    fn check_options(&self, _options: &Value) -> RuleResult<()> {
        Ok(())
    }

    fn check(&self, value: Option<&Value>, options: &Value) -> RuleResult<Vec<String>>;
}

/// Registry of rule kinds
#[derive(Clone)]
pub struct RuleEvaluator {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl fmt::Debug for RuleEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.rules.keys().collect();
        names.sort();
        f.debug_struct("RuleEvaluator").field("rules", &names).finish()
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}

impl RuleEvaluator {
    /// Evaluator without any rule kinds
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Evaluator with presence, length, format, email, inclusion, exclusion,
    /// numericality and notBlank
    pub fn with_builtin_rules() -> Self {
        builtin::all()
            .into_iter()
            .fold(Self::empty(), |evaluator, rule| evaluator.register(rule))
    }

    /// Adds or replaces a rule kind
    pub fn register(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.insert(rule.name().to_string(), rule);
        self
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    fn rule(&self, name: &str) -> RuleResult<&Arc<dyn Rule>> {
        self.rules
            .get(name)
            .ok_or_else(|| RuleError::UnknownRule(name.to_string()))
    }

    /// Evaluates one attribute; an empty result means valid.
    ///
    /// Rules run in rule-set order. A string `message` option replaces the
    /// rule's own messages.
    pub fn evaluate(
        &self,
        attribute: &str,
        value: Option<&Value>,
        rule_set: &Value,
    ) -> RuleResult<Vec<String>> {
        let rules = rule_set
            .as_object()
            .ok_or_else(|| RuleError::NotAnObject(attribute.to_string()))?;

        let mut messages = Vec::new();
        for (name, options) in rules {
            if is_disabled(options) {
                continue;
            }
            let rule = self.rule(name)?;
            let options = normalize(options);
            let found = rule.check(value, &options)?;
            if found.is_empty() {
                continue;
            }
            match options.get("message").and_then(Value::as_str) {
                Some(custom) => messages.push(full_message(attribute, custom)),
                None => messages.extend(found.iter().map(|m| full_message(attribute, m))),
            }
        }
        Ok(messages)
    }

    /// Evaluates every field of `table` against `attributes`.
    ///
    /// Fields absent from `attributes` are evaluated with `None`. Only failing
    /// fields appear in the result, in table order.
    pub fn evaluate_set(
        &self,
        attributes: &Attributes,
        table: &RuleTable,
    ) -> RuleResult<FieldMessages> {
        let mut failures = Vec::new();
        for (field, rule_set) in table.iter() {
            let messages = self.evaluate(field, attributes.get(field), rule_set)?;
            if !messages.is_empty() {
                failures.push((field.clone(), messages));
            }
        }
        Ok(failures)
    }

    /// Checks a whole rule table without evaluating any value
    pub fn check_table(&self, table: &RuleTable) -> RuleResult<()> {
        for (field, rule_set) in table.iter() {
            let rules = rule_set
                .as_object()
                .ok_or_else(|| RuleError::NotAnObject(field.clone()))?;
            for (name, options) in rules {
                let rule = self.rule(name)?;
                if !is_disabled(options) {
                    rule.check_options(&normalize(options))?;
                }
            }
        }
        Ok(())
    }
}

fn is_disabled(options: &Value) -> bool {
    matches!(options, Value::Null | Value::Bool(false))
}

/// `true` means "default options"
fn normalize(options: &Value) -> Value {
    match options {
        Value::Bool(true) => Value::Object(Map::new()),
        other => other.clone(),
    }
}
