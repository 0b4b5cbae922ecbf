//! Attribute policy subsystem
//!
//! Intercepts a record's attributes right before persistence, decides which
//! of them may be written, and validates what survives.
//!
//! # Design Principles
//!
//! - Filters are resolved per operation or per named scenario
//! - Every problem is reported in one ordered failure
//! - No mutation unless validation passed
//! - A filtered write never persists an empty attribute set
//! - Configuration is explicit and read-only during a run

mod aggregator;
mod config;
mod errors;
mod guard;
mod loader;
mod projector;
mod resolver;
mod types;

pub use aggregator::validate;
pub use config::{ConfigError, EmptyErrorStyle, PolicyConfig};
pub use errors::{
    ErrorEntry, ErrorKind, PolicyError, PolicyErrorCode, PolicyResult, ValidationFailure,
};
pub use guard::{Committed, Guard, Pending};
pub use loader::ModelRegistry;
pub use projector::{project, Projection};
pub use resolver::resolve;
pub use types::{Attributes, FieldSpec, FilterTable, Method, ModelDecl, OperationContext, RuleTable};
