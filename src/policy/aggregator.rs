//! Validation aggregation
//!
//! Runs the rule evaluator over the attributes that survived projection and
//! turns each failing field into one `invalid` entry, in rule-table order.

use tracing::debug;

use super::errors::{ErrorEntry, PolicyError, PolicyResult};
use super::projector::Projection;
use super::types::RuleTable;
use crate::rules::RuleEvaluator;

/// Validates a projection.
///
/// Filtered projections only check fields that were kept; fields without a
/// value cannot fail. Unfiltered projections check the whole table, so absent
/// fields still reach `presence`.
pub fn validate(
    projection: &Projection,
    rules: &RuleTable,
    evaluator: &RuleEvaluator,
) -> PolicyResult<Vec<ErrorEntry>> {
    let kept = projection.kept();
    let table = if projection.is_filtered() {
        rules.restricted_to(kept)
    } else {
        rules.clone()
    };

    let failures = evaluator
        .evaluate_set(kept, &table)
        .map_err(|e| PolicyError::declaration(e.to_string()))?;

    Ok(failures
        .into_iter()
        .map(|(field, messages)| {
            debug!(field = %field, count = messages.len(), "field failed validation");
            ErrorEntry::invalid(field, messages)
        })
        .collect())
}
