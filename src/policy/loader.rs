//! Model registry
//!
//! Model declarations live one per file at `<models_dir>/<name>.json`.
//! Every declaration is checked against the rule evaluator when it is
//! registered, so unknown rule kinds fail at startup rather than mid-write.
//! Registered models are immutable.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::errors::{PolicyError, PolicyResult};
use super::types::ModelDecl;
use crate::rules::RuleEvaluator;

/// In-memory registry of model declarations
#[derive(Debug)]
pub struct ModelRegistry {
    models_dir: PathBuf,
    models: HashMap<String, ModelDecl>,
}

impl ModelRegistry {
    /// Creates an empty registry reading from `models_dir`.
    pub fn new(models_dir: &Path) -> Self {
        Self {
            models_dir: models_dir.to_path_buf(),
            models: HashMap::new(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Loads every `*.json` file in the models directory.
    ///
    /// A missing directory means no models. Files are loaded in name order.
    pub fn load_all(&mut self, evaluator: &RuleEvaluator) -> PolicyResult<()> {
        if !self.models_dir.exists() {
            debug!(dir = %self.models_dir.display(), "models directory missing; nothing to load");
            return Ok(());
        }

        let entries = fs::read_dir(&self.models_dir).map_err(|e| {
            PolicyError::declaration(format!(
                "failed to read models directory '{}': {}",
                self.models_dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                PolicyError::declaration(format!("failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            self.load_model_file(&path, evaluator)?;
        }

        info!(
            count = self.models.len(),
            dir = %self.models_dir.display(),
            "loaded model declarations"
        );
        Ok(())
    }

    fn load_model_file(&mut self, path: &Path, evaluator: &RuleEvaluator) -> PolicyResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            PolicyError::declaration(format!("failed to read '{}': {}", path.display(), e))
        })?;

        let model: ModelDecl = serde_json::from_str(&content).map_err(|e| {
            PolicyError::declaration(format!("invalid model file '{}': {}", path.display(), e))
        })?;

        self.register(model, evaluator)
    }

    /// Registers a model after checking its rule table.
    pub fn register(&mut self, model: ModelDecl, evaluator: &RuleEvaluator) -> PolicyResult<()> {
        if model.name.is_empty() {
            return Err(PolicyError::declaration("model name must not be empty"));
        }
        if let Some(rules) = &model.validations {
            evaluator
                .check_table(rules)
                .map_err(|e| PolicyError::declaration(format!("model '{}': {}", model.name, e)))?;
        }
        if self.models.contains_key(&model.name) {
            return Err(PolicyError::DuplicateModel(model.name));
        }

        debug!(model = %model.name, scenarios = ?model.scenario_names(), "registered model");
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ModelDecl> {
        self.models.get(name)
    }

    /// Returns all models sorted by name
    pub fn all_models(&self) -> Vec<&ModelDecl> {
        let mut models: Vec<&ModelDecl> = self.models.values().collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::types::RuleTable;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_register_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = ModelRegistry::new(temp_dir.path());
        let evaluator = RuleEvaluator::default();

        registry.register(ModelDecl::new("user"), &evaluator).unwrap();
        assert!(registry.get("user").is_some());
        assert!(registry.get("post").is_none());
        assert_eq!(registry.model_count(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = ModelRegistry::new(temp_dir.path());
        let evaluator = RuleEvaluator::default();

        registry.register(ModelDecl::new("user"), &evaluator).unwrap();
        let err = registry.register(ModelDecl::new("user"), &evaluator).unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateModel(name) if name == "user"));
    }

    #[test]
    fn test_unknown_rule_rejected_at_registration() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = ModelRegistry::new(temp_dir.path());
        let model = ModelDecl::new("user")
            .with_validations(RuleTable::new().with("email", json!({"uniqueness": true})));

        let err = registry.register(model, &RuleEvaluator::default()).unwrap_err();
        assert!(err.to_string().contains("uniqueness"));
        assert_eq!(registry.model_count(), 0);
    }

    #[test]
    fn test_missing_dir_loads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = ModelRegistry::new(&temp_dir.path().join("absent"));
        registry.load_all(&RuleEvaluator::default()).unwrap();
        assert_eq!(registry.model_count(), 0);
    }

    #[test]
    fn test_load_all_skips_non_json() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("user.json"),
            json!({"name": "user", "filters": {"insert": ["first_name"]}}).to_string(),
        )
        .unwrap();
        fs::write(temp_dir.path().join("README.md"), "not a model").unwrap();

        let mut registry = ModelRegistry::new(temp_dir.path());
        registry.load_all(&RuleEvaluator::default()).unwrap();
        assert_eq!(registry.model_count(), 1);
        assert_eq!(registry.all_models()[0].scenario_names(), ["insert"]);
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        let mut registry = ModelRegistry::new(temp_dir.path());
        let err = registry.load_all(&RuleEvaluator::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("broken.json"));
    }
}
