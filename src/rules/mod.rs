//! Rule evaluation subsystem
//!
//! Validates single attribute values against declarative rule sets.
//!
//! # Design Principles
//!
//! - Rule kinds are registered when the evaluator is built, never afterwards
//! - Evaluation is pure and deterministic
//! - Only `presence` fires on absent or null values
//! - Malformed declarations are errors, not violations

mod builtin;
mod evaluator;
mod message;

pub use builtin::{Email, Exclusion, Format, Inclusion, Length, NotBlank, Numericality, Presence};
pub use evaluator::{FieldMessages, Rule, RuleError, RuleEvaluator, RuleResult};
pub use message::{full_message, prettify};
