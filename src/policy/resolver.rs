//! Filter resolution
//!
//! Picks the field specs that govern a write:
//! 1. No filter table declared: no filtering
//! 2. Explicit scenario: must exist, otherwise the write fails immediately
//! 3. Method filter enabled: the entry named after the method, if any
//! 4. Otherwise: no filtering
//!
//! Resolution is a pure function of its inputs.

use tracing::debug;

use super::config::PolicyConfig;
use super::errors::{ErrorEntry, ValidationFailure};
use super::types::{FieldSpec, ModelDecl, OperationContext};

/// Resolves the filter for a write, or `None` when no filtering applies.
///
/// # Errors
///
/// Returns a single `scenario.notfound` entry when `context.scenario` names a
/// scenario the model does not declare.
pub fn resolve<'m>(
    model: &'m ModelDecl,
    context: &OperationContext,
    config: &PolicyConfig,
) -> Result<Option<&'m [FieldSpec]>, ValidationFailure> {
    let Some(filters) = model.filters.as_ref() else {
        return Ok(None);
    };

    if let Some(scenario) = context.scenario.as_deref() {
        return match filters.get(scenario) {
            Some(specs) => {
                debug!(model = %model.name, scenario, "resolved scenario filter");
                Ok(Some(specs.as_slice()))
            }
            None => Err(ValidationFailure::single(ErrorEntry::scenario_not_found(scenario))),
        };
    }

    if config.method_filter() {
        if let Some(specs) = filters.get(context.method.as_str()) {
            debug!(model = %model.name, method = %context.method, "resolved method filter");
            return Ok(Some(specs.as_slice()));
        }
    }

    Ok(None)
}
