//! CLI command implementations
//!
//! `check` is the host harness: it plays the persistence framework, feeding
//! each write request through the guard exactly as a before-write hook would.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;

use crate::policy::{Attributes, Guard, ModelRegistry, OperationContext, Pending, PolicyConfig};
use crate::rules::RuleEvaluator;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_rejection, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of model declaration files (required)
    pub models_dir: String,

    /// Log level (optional, default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Policy settings
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.models_dir.trim().is_empty() {
            return Err(CliError::config_error("models_dir must not be empty"));
        }
        self.level()?;
        self.policy.validate()?;
        Ok(())
    }

    /// Parsed log level
    pub fn level(&self) -> CliResult<Level> {
        self.log_level.parse().map_err(|_| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Use trace, debug, info, warn or error.",
                self.log_level
            ))
        })
    }

    pub fn models_path(&self) -> &Path {
        Path::new(&self.models_dir)
    }
}

/// Installs the stderr log subscriber; a second call is a no-op
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Builds the guard and loads every model declaration
pub fn boot(config: &Config) -> CliResult<(Guard, ModelRegistry)> {
    let guard = Guard::new(config.policy.clone(), RuleEvaluator::with_builtin_rules())?;
    let mut registry = ModelRegistry::new(config.models_path());
    registry.load_all(guard.evaluator())?;
    Ok((guard, registry))
}

/// One write request line
#[derive(Debug, Deserialize)]
struct WriteRequest {
    model: String,
    #[serde(flatten)]
    context: OperationContext,
    /// Current record state
    #[serde(default)]
    record: Attributes,
    /// Attributes supplied with the write
    #[serde(default)]
    attributes: Attributes,
}

/// Counts of processed requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub accepted: usize,
    pub rejected: usize,
}

/// Runs every request from `input` through the guard, one response per line.
///
/// Malformed lines and rejected writes are reported on `output` and do not
/// stop processing; only I/O failures do.
pub fn check<R: BufRead, W: Write>(
    guard: &Guard,
    registry: &ModelRegistry,
    input: R,
    output: &mut W,
) -> CliResult<CheckSummary> {
    let mut summary = CheckSummary::default();

    for request in read_requests(input) {
        let parsed = request
            .and_then(|v| serde_json::from_value::<WriteRequest>(v).map_err(CliError::from));
        let request = match parsed {
            Ok(request) => request,
            Err(e) => {
                summary.rejected += 1;
                write_error(output, e.code().code(), e.message())?;
                continue;
            }
        };

        let Some(model) = registry.get(&request.model) else {
            summary.rejected += 1;
            write_error(
                output,
                "FIELDGATE_UNKNOWN_MODEL",
                &format!("Model '{}' is not registered", request.model),
            )?;
            continue;
        };

        let WriteRequest {
            context,
            mut record,
            mut attributes,
            ..
        } = request;
        if !context.is_patch() {
            // full writes persist the record with the supplied attributes applied
            record.append(&mut attributes);
        }

        let pending = Pending::for_context(&context, &mut record, &mut attributes);
        match guard.before_write(model, &context, pending) {
            Ok(committed) => {
                summary.accepted += 1;
                let written = if context.is_patch() { &attributes } else { &record };
                write_response(
                    output,
                    json!({
                        "attributes": written,
                        "record": record,
                        "dropped": committed.dropped,
                    }),
                )?;
            }
            Err(err) => {
                summary.rejected += 1;
                match err.failure() {
                    Some(failure) => write_rejection(output, err.code().code(), failure.errors())?,
                    None => write_error(output, err.code().code(), &err.to_string())?,
                }
            }
        }
    }

    Ok(summary)
}

/// Writes one line per model: name plus sorted scenario names
pub fn list_models<W: Write>(registry: &ModelRegistry, output: &mut W) -> CliResult<()> {
    let models: Vec<Value> = registry
        .all_models()
        .into_iter()
        .map(|m| {
            json!({
                "name": m.name,
                "scenarios": m.scenario_names(),
                "validated_fields": m.validations.as_ref().map_or(0, |v| v.len()),
            })
        })
        .collect();
    write_response(output, Value::from(models))
}

/// Dispatch a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    let config_path = match &command {
        Command::Check { config } | Command::Models { config } => config.clone(),
    };
    let config = Config::load(&config_path)?;
    init_logging(config.level()?);
    let (guard, registry) = boot(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Check { .. } => {
            let stdin = io::stdin();
            let summary = check(&guard, &registry, stdin.lock(), &mut out)?;
            tracing::info!(
                accepted = summary.accepted,
                rejected = summary.rejected,
                "check finished"
            );
            Ok(())
        }
        Command::Models { .. } => list_models(&registry, &mut out),
    }
}

/// Parse arguments and run
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}
