//! Policy configuration
//!
//! Set once at startup and read-only afterwards. A [`Guard`](super::Guard)
//! owns its own copy, so runs for different records never share mutable state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::ErrorEntry;
use super::types::Method;

/// Label and message profile for the "nothing left after filtering" error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptyErrorStyle {
    /// `empty`
    #[serde(rename = "empty")]
    Empty,
    /// `filter.empty`
    #[default]
    #[serde(rename = "filter.empty")]
    FilterEmpty,
    /// `nothingToSave`
    #[serde(rename = "nothingToSave")]
    NothingToSave,
    /// `<method>.filter.empty`
    #[serde(rename = "method")]
    MethodScoped,
}

impl EmptyErrorStyle {
    /// Builds the error entry for the given write method
    pub fn entry(&self, method: Method) -> ErrorEntry {
        const MESSAGE: &str = "No attributes remaining after filtering";
        match self {
            EmptyErrorStyle::Empty => ErrorEntry::empty("empty", MESSAGE),
            EmptyErrorStyle::FilterEmpty => ErrorEntry::empty("filter.empty", MESSAGE),
            EmptyErrorStyle::NothingToSave => ErrorEntry::empty("nothingToSave", MESSAGE),
            EmptyErrorStyle::MethodScoped => ErrorEntry::empty(
                format!("{}.filter.empty", method),
                format!("No attributes to {} after filtering", method),
            ),
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Process-wide policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Legacy name for the method-filter flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_default_filters: Option<bool>,

    /// Legacy name for the method-filter flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_method_filter: Option<bool>,

    /// Required specs treat `null` as missing
    #[serde(default)]
    pub required_rejects_null: bool,

    /// Patch writes also strip disallowed supplied keys from the record
    #[serde(default = "default_prune_record_on_patch")]
    pub prune_record_on_patch: bool,

    #[serde(default)]
    pub empty_error: EmptyErrorStyle,
}

fn default_prune_record_on_patch() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            use_default_filters: None,
            use_method_filter: None,
            required_rejects_null: false,
            prune_record_on_patch: true,
            empty_error: EmptyErrorStyle::default(),
        }
    }
}

impl PolicyConfig {
    /// Sets the method-filter flag
    pub fn with_method_filter(mut self, enabled: bool) -> Self {
        self.use_default_filters = None;
        self.use_method_filter = Some(enabled);
        self
    }

    pub fn with_required_rejects_null(mut self, enabled: bool) -> Self {
        self.required_rejects_null = enabled;
        self
    }

    pub fn with_prune_record_on_patch(mut self, enabled: bool) -> Self {
        self.prune_record_on_patch = enabled;
        self
    }

    pub fn with_empty_error(mut self, style: EmptyErrorStyle) -> Self {
        self.empty_error = style;
        self
    }

    /// Whether the filter named after the method applies without a scenario
    ///
    /// Both legacy names map to this one flag; defaults to on.
    pub fn method_filter(&self) -> bool {
        self.use_method_filter
            .or(self.use_default_filters)
            .unwrap_or(true)
    }

    /// Rejects contradictory use of the legacy aliases
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(a), Some(b)) = (self.use_default_filters, self.use_method_filter) {
            if a != b {
                return Err(ConfigError::new(format!(
                    "useDefaultFilters ({}) and useMethodFilter ({}) disagree; set only one",
                    a, b
                )));
            }
        }
        Ok(())
    }
}
