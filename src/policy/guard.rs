//! Before-write guard
//!
//! Drives one write through the policy:
//!
//! ```text
//! START -> RESOLVING_FILTER -> PROJECTING -> VALIDATING -> COMMITTING -> SUCCESS
//!               |                                |             |
//!               +------------> FAILED <----------+-------------+
//! ```
//!
//! - An unknown scenario fails during resolution with a single entry
//! - Required and invalid entries accumulate and are raised together,
//!   required entries first
//! - Nothing is mutated unless validation passed
//! - A filtered write that leaves nothing to persist fails with `empty`
//!
//! Every call is a fresh run. The guard holds only read-only configuration and
//! can be shared across threads.

use tracing::{debug, info, info_span, warn};

use super::aggregator;
use super::config::{ConfigError, PolicyConfig};
use super::errors::{PolicyError, PolicyResult, ValidationFailure};
use super::projector;
use super::resolver;
use super::types::{Attributes, ModelDecl, OperationContext};
use crate::rules::RuleEvaluator;

/// Successful run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Whether a filter governed the write
    pub filtered: bool,
    /// Keys stripped from the pending set
    pub dropped: Vec<String>,
}

/// Attribute maps handed to the guard for one write
#[derive(Debug)]
pub enum Pending<'a> {
    /// Insert or full update: the record is the pending set
    Full(&'a mut Attributes),
    /// Patch update: only the supplied attributes are pending
    Patch {
        record: &'a mut Attributes,
        supplied: &'a mut Attributes,
    },
}

impl<'a> Pending<'a> {
    /// Picks the variant matching `context`; `supplied` is only used under patch
    pub fn for_context(
        context: &OperationContext,
        record: &'a mut Attributes,
        supplied: &'a mut Attributes,
    ) -> Self {
        if context.is_patch() {
            Pending::Patch { record, supplied }
        } else {
            Pending::Full(record)
        }
    }

    pub fn is_patch(&self) -> bool {
        matches!(self, Pending::Patch { .. })
    }
}

/// Attribute filtering and validation guard
#[derive(Debug, Clone)]
pub struct Guard {
    config: PolicyConfig,
    evaluator: RuleEvaluator,
}

impl Default for Guard {
    fn default() -> Self {
        Self {
            config: PolicyConfig::default(),
            evaluator: RuleEvaluator::with_builtin_rules(),
        }
    }
}

impl Guard {
    /// Creates a guard.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is inconsistent.
    pub fn new(config: PolicyConfig, evaluator: RuleEvaluator) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, evaluator })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    /// Before-write extension point.
    ///
    /// The pending set is the record itself for [`Pending::Full`] and the
    /// supplied attributes for [`Pending::Patch`]. Under patch, disallowed
    /// supplied keys are stripped from `supplied` and, if configured, from
    /// `record`.
    ///
    /// # Errors
    ///
    /// - `PolicyError::Rejected` with the ordered error entries; neither map
    ///   has been modified unless the failure is `empty`
    /// - `PolicyError::Declaration` if the model's rule table cannot be
    ///   evaluated
    pub fn before_write(
        &self,
        model: &ModelDecl,
        context: &OperationContext,
        pending: Pending<'_>,
    ) -> PolicyResult<Committed> {
        let span = info_span!(
            "before_write",
            model = %model.name,
            method = %context.method,
            patch = pending.is_patch(),
            scenario = context.scenario.as_deref().unwrap_or("")
        );
        let _enter = span.enter();

        let result = match pending {
            Pending::Full(record) => self.run(model, context, record, None),
            Pending::Patch { record, supplied } => {
                let record = self.config.prune_record_on_patch.then_some(record);
                self.run(model, context, supplied, record)
            }
        };

        match &result {
            Ok(committed) => info!(dropped = committed.dropped.len(), "write accepted"),
            Err(err) => warn!(code = %err.code(), errors = err.errors().len(), "write rejected"),
        }
        result
    }

    fn run(
        &self,
        model: &ModelDecl,
        context: &OperationContext,
        pending: &mut Attributes,
        record: Option<&mut Attributes>,
    ) -> PolicyResult<Committed> {
        // RESOLVING_FILTER
        let filter = resolver::resolve(model, context, &self.config)?;
        if filter.is_none() && model.validations.is_none() {
            debug!("no filter and no validations; passing through");
            return Ok(Committed {
                filtered: false,
                dropped: Vec::new(),
            });
        }

        // PROJECTING
        let projection = projector::project(pending, filter, self.config.required_rejects_null);
        let mut errors = projection.required_errors().to_vec();

        // VALIDATING
        if let Some(rules) = &model.validations {
            errors.extend(aggregator::validate(&projection, rules, &self.evaluator)?);
        }
        if !errors.is_empty() {
            return Err(ValidationFailure::new(errors).into());
        }

        // COMMITTING
        if !projection.is_filtered() {
            return Ok(Committed {
                filtered: false,
                dropped: Vec::new(),
            });
        }
        projection.commit(pending, record);
        debug!(dropped = ?projection.dropped_keys(), "pruned pending attributes");

        if pending.is_empty() {
            let entry = self.config.empty_error.entry(context.method);
            return Err(PolicyError::Rejected(ValidationFailure::single(entry)));
        }

        Ok(Committed {
            filtered: true,
            dropped: projection.dropped_keys().to_vec(),
        })
    }
}
