//! Attribute projection
//!
//! Splits the pending attribute set into kept and dropped keys according to
//! the resolved filter and collects required-field errors in filter order.
//! Projection itself never mutates anything; deletions are deferred to
//! [`Projection::commit`], which the guard calls only after validation passed.

use serde_json::Value;

use super::errors::ErrorEntry;
use super::types::{Attributes, FieldSpec};

/// Result of projecting a pending attribute set through a filter
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    kept: Attributes,
    dropped: Vec<String>,
    required_errors: Vec<ErrorEntry>,
    filtered: bool,
}

impl Projection {
    /// Attributes that survive the filter, in filter order
    pub fn kept(&self) -> &Attributes {
        &self.kept
    }

    /// Pending keys not covered by the filter, in pending order
    pub fn dropped_keys(&self) -> &[String] {
        &self.dropped
    }

    /// Required-field errors, in filter declaration order
    pub fn required_errors(&self) -> &[ErrorEntry] {
        &self.required_errors
    }

    /// Whether a filter was applied at all
    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// Applies the deferred deletions.
    ///
    /// Every dropped key is removed from `pending`; when `record` is given
    /// (patch writes) it is removed from the record store too. Keys that exist
    /// only on the record are left alone.
    pub fn commit(&self, pending: &mut Attributes, mut record: Option<&mut Attributes>) {
        for key in &self.dropped {
            pending.remove(key);
            if let Some(record) = record.as_deref_mut() {
                record.remove(key);
            }
        }
    }
}

/// Projects `pending` through `filter`.
///
/// `required_rejects_null` makes required specs treat `null` as missing.
/// Bare names keep `null` values since they are defined.
pub fn project(
    pending: &Attributes,
    filter: Option<&[FieldSpec]>,
    required_rejects_null: bool,
) -> Projection {
    let Some(specs) = filter else {
        return Projection {
            kept: pending.clone(),
            dropped: Vec::new(),
            required_errors: Vec::new(),
            filtered: false,
        };
    };

    let mut kept = Attributes::new();
    let mut required_errors = Vec::new();

    for spec in specs {
        match spec {
            FieldSpec::Name(name) => {
                if let Some(value) = pending.get(name) {
                    kept.insert(name.clone(), value.clone());
                }
            }
            FieldSpec::Descriptor { name, required } => {
                let value = pending.get(name);
                if is_present(value, required_rejects_null) {
                    if let Some(value) = value {
                        kept.insert(name.clone(), value.clone());
                    }
                } else if *required {
                    required_errors.push(ErrorEntry::required(name));
                }
            }
        }
    }

    let dropped = pending
        .keys()
        .filter(|key| !kept.contains_key(key.as_str()))
        .cloned()
        .collect();

    Projection {
        kept,
        dropped,
        required_errors,
        filtered: true,
    }
}

/// Returns true for values a required spec accepts under the strict policy
pub fn is_present(value: Option<&Value>, required_rejects_null: bool) -> bool {
    match value {
        None => false,
        Some(Value::Null) => !required_rejects_null,
        Some(_) => true,
    }
}
