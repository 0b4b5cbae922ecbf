//! Policy error types
//!
//! Error codes:
//! - FIELDGATE_REJECTED (REJECT): the write carried one or more error entries
//! - FIELDGATE_SCENARIO_NOT_FOUND (REJECT, short-circuit)
//! - FIELDGATE_BAD_DECLARATION (FATAL): model declarations cannot be evaluated
//! - FIELDGATE_DUPLICATE_MODEL (FATAL): a model name was registered twice
//!
//! A rejected write always carries an ordered list of [`ErrorEntry`] values.
//! Entries are appended in the order they were detected and are never
//! deduplicated or reordered.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Kind of a single error entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field spec had no value
    Required,
    /// A kept field failed rule evaluation
    Invalid,
    /// The requested scenario is not declared on the model
    ScenarioNotFound,
    /// Nothing was left to persist after filtering
    Empty,
}

impl ErrorKind {
    /// Returns the canonical type string
    ///
    /// `Empty` has a configurable wire label, see
    /// [`EmptyErrorStyle`](super::config::EmptyErrorStyle).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::Invalid => "invalid",
            ErrorKind::ScenarioNotFound => "scenario.notfound",
            ErrorKind::Empty => "empty",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a structured validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    kind: ErrorKind,
    /// Wire label for `type`; equals `kind.as_str()` except for `Empty`
    code: String,
    attribute: Option<String>,
    messages: Vec<String>,
}

impl ErrorEntry {
    /// Missing required attribute
    pub fn required(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            kind: ErrorKind::Required,
            code: ErrorKind::Required.as_str().into(),
            messages: vec![format!("Attribute {} is required", attribute)],
            attribute: Some(attribute),
        }
    }

    /// Attribute failed one or more rules
    pub fn invalid(attribute: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            kind: ErrorKind::Invalid,
            code: ErrorKind::Invalid.as_str().into(),
            attribute: Some(attribute.into()),
            messages,
        }
    }

    /// Requested scenario is not declared
    pub fn scenario_not_found(scenario: &str) -> Self {
        Self {
            kind: ErrorKind::ScenarioNotFound,
            code: ErrorKind::ScenarioNotFound.as_str().into(),
            attribute: None,
            messages: vec![format!("Scenario with name {} does not exist", scenario)],
        }
    }

    /// Nothing left after filtering, with a profile-specific label and message
    pub fn empty(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Empty,
            code: code.into(),
            attribute: None,
            messages: vec![message.into()],
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the wire label written as `type`
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl Serialize for ErrorEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.attribute.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("type", &self.code)?;
        if let Some(attribute) = &self.attribute {
            map.serialize_entry("attribute", attribute)?;
        }
        map.serialize_entry("messages", &self.messages)?;
        map.end()
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => {
                write!(f, "{} '{}': {}", self.code, attribute, self.messages.join("; "))
            }
            None => write!(f, "{}: {}", self.code, self.messages.join("; ")),
        }
    }
}

/// Structured failure raised when a write is rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    errors: Vec<ErrorEntry>,
}

impl ValidationFailure {
    pub fn new(errors: Vec<ErrorEntry>) -> Self {
        Self { errors }
    }

    /// Single-entry failure
    pub fn single(entry: ErrorEntry) -> Self {
        Self { errors: vec![entry] }
    }

    /// Returns the ordered error entries
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ErrorEntry> {
        self.errors
    }

    /// True when the failure came from an unknown scenario
    pub fn is_scenario_not_found(&self) -> bool {
        matches!(self.errors.as_slice(), [e] if e.kind == ErrorKind::ScenarioNotFound)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for entry in &self.errors {
            write!(f, "\n  - {}", entry)?;
        }
        Ok(())
    }
}

/// Stable error codes for policy errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyErrorCode {
    /// Write rejected with accumulated entries
    FieldgateRejected,
    /// Write rejected because the scenario does not exist
    FieldgateScenarioNotFound,
    /// Model declaration cannot be evaluated
    FieldgateBadDeclaration,
    /// Model registered twice
    FieldgateDuplicateModel,
}

impl PolicyErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            PolicyErrorCode::FieldgateRejected => "FIELDGATE_REJECTED",
            PolicyErrorCode::FieldgateScenarioNotFound => "FIELDGATE_SCENARIO_NOT_FOUND",
            PolicyErrorCode::FieldgateBadDeclaration => "FIELDGATE_BAD_DECLARATION",
            PolicyErrorCode::FieldgateDuplicateModel => "FIELDGATE_DUPLICATE_MODEL",
        }
    }
}

impl fmt::Display for PolicyErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Top-level policy error
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// The write must be aborted
    #[error("write rejected: {0}")]
    Rejected(ValidationFailure),

    /// A model declaration is malformed (unknown rule, bad options)
    #[error("bad declaration: {0}")]
    Declaration(String),

    /// Model declarations are immutable once registered
    #[error("model '{0}' is already registered")]
    DuplicateModel(String),
}

impl PolicyError {
    pub fn declaration(message: impl Into<String>) -> Self {
        PolicyError::Declaration(message.into())
    }

    pub fn code(&self) -> PolicyErrorCode {
        match self {
            PolicyError::Rejected(failure) if failure.is_scenario_not_found() => {
                PolicyErrorCode::FieldgateScenarioNotFound
            }
            PolicyError::Rejected(_) => PolicyErrorCode::FieldgateRejected,
            PolicyError::Declaration(_) => PolicyErrorCode::FieldgateBadDeclaration,
            PolicyError::DuplicateModel(_) => PolicyErrorCode::FieldgateDuplicateModel,
        }
    }

    /// Returns the structured failure if the write was rejected
    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            PolicyError::Rejected(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the ordered error entries, empty for declaration errors
    pub fn errors(&self) -> &[ErrorEntry] {
        self.failure().map(ValidationFailure::errors).unwrap_or(&[])
    }

    /// Declaration errors are not caused by the written data
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PolicyError::Rejected(_))
    }
}

impl From<ValidationFailure> for PolicyError {
    fn from(failure: ValidationFailure) -> Self {
        PolicyError::Rejected(failure)
    }
}

/// Result type for policy operations
pub type PolicyResult<T> = Result<T, PolicyError>;
