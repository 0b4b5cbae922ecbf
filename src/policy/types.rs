//! Declaration and write-context types
//!
//! - Field spec: bare name or `{name, required}`
//! - Filter table: scenario/operation name -> ordered field specs
//! - Rule table: field name -> rule set (opaque here, owned by the evaluator)
//! - Operation context: method, patch flag, optional scenario

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Attribute set of a record or of a pending write
pub type Attributes = Map<String, Value>;

/// A single permitted field in a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    /// Bare field name, always optional
    Name(String),
    /// Structured descriptor
    Descriptor {
        name: String,
        #[serde(default)]
        required: bool,
    },
}

impl FieldSpec {
    /// Create a required field spec
    pub fn required(name: impl Into<String>) -> Self {
        FieldSpec::Descriptor {
            name: name.into(),
            required: true,
        }
    }

    /// Create an optional field spec
    pub fn optional(name: impl Into<String>) -> Self {
        FieldSpec::Name(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            FieldSpec::Name(name) => name,
            FieldSpec::Descriptor { name, .. } => name,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, FieldSpec::Descriptor { required: true, .. })
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        FieldSpec::Name(name.to_string())
    }
}

/// Scenario table: scenario or method name -> ordered field specs
pub type FilterTable = HashMap<String, Vec<FieldSpec>>;

/// Ordered mapping from field name to rule set
///
/// Rule sets are JSON objects keyed by rule kind, e.g.
/// `{"presence": true, "length": {"minimum": 3}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable(Map<String, Value>);

impl RuleTable {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, rules: Value) -> Self {
        self.0.insert(field.into(), rules);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, rules: Value) {
        self.0.insert(field.into(), rules);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Iterates in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps only fields present in `attributes`, preserving declaration order
    pub fn restricted_to(&self, attributes: &Attributes) -> RuleTable {
        RuleTable(
            self.0
                .iter()
                .filter(|(field, _)| attributes.contains_key(field.as_str()))
                .map(|(field, rules)| (field.clone(), rules.clone()))
                .collect(),
        )
    }
}

/// Write operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Insert,
    Update,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Insert => "insert",
            Method::Update => "update",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context of a single write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    pub method: Method,
    #[serde(default)]
    pub patch: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

impl OperationContext {
    pub fn insert() -> Self {
        Self {
            method: Method::Insert,
            patch: false,
            scenario: None,
        }
    }

    pub fn update() -> Self {
        Self {
            method: Method::Update,
            patch: false,
            scenario: None,
        }
    }

    /// Partial update: only supplied attributes are candidates
    pub fn patch() -> Self {
        Self {
            method: Method::Update,
            patch: true,
            scenario: None,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Patch only applies to updates
    pub fn is_patch(&self) -> bool {
        self.method == Method::Update && self.patch
    }
}

/// Declarations of one model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelDecl {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validations: Option<RuleTable>,
}

impl ModelDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: None,
            validations: None,
        }
    }

    /// Adds a filter scenario
    pub fn with_filter(mut self, scenario: impl Into<String>, specs: Vec<FieldSpec>) -> Self {
        self.filters
            .get_or_insert_with(HashMap::new)
            .insert(scenario.into(), specs);
        self
    }

    pub fn with_validations(mut self, rules: RuleTable) -> Self {
        self.validations = Some(rules);
        self
    }

    /// Returns declared scenario names, sorted
    pub fn scenario_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .filters
            .iter()
            .flat_map(|filters| filters.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names
    }
}

/// On-disk declaration layout; both plugin generations are accepted
#[derive(Deserialize)]
struct RawModelDecl {
    name: String,
    #[serde(default)]
    filters: Option<FilterTable>,
    #[serde(default)]
    validations: Option<Map<String, Value>>,
}

/// `{"fields": {...}, "filters": {...}}` under `validations` is the nested
/// layout only when `fields` maps names to rule-set objects and `filters`, if
/// present, maps scenario names to lists. Anything else is a flat rule table,
/// so an attribute literally named `fields` still works.
fn is_nested_layout(validations: &Map<String, Value>) -> bool {
    let Some(Value::Object(fields)) = validations.get("fields") else {
        return false;
    };
    let filters_ok = match validations.get("filters") {
        None => true,
        Some(Value::Object(filters)) => filters.values().all(Value::is_array),
        Some(_) => false,
    };
    validations.keys().all(|k| k == "fields" || k == "filters")
        && filters_ok
        && fields.values().all(Value::is_object)
}

fn split_validations(
    mut validations: Map<String, Value>,
) -> Result<(RuleTable, Option<FilterTable>), serde_json::Error> {
    if !is_nested_layout(&validations) {
        return Ok((RuleTable(validations), None));
    }
    let fields = match validations.remove("fields") {
        Some(Value::Object(fields)) => RuleTable(fields),
        _ => RuleTable::new(),
    };
    let filters = validations
        .remove("filters")
        .map(serde_json::from_value::<FilterTable>)
        .transpose()?;
    Ok((fields, filters))
}

impl<'de> Deserialize<'de> for ModelDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawModelDecl::deserialize(deserializer)?;
        let (validations, nested_filters) = match raw.validations {
            Some(validations) => {
                let (rules, filters) =
                    split_validations(validations).map_err(serde::de::Error::custom)?;
                (Some(rules), filters)
            }
            None => (None, None),
        };
        if raw.filters.is_some() && nested_filters.is_some() {
            return Err(serde::de::Error::custom(
                "filters declared both at top level and under validations",
            ));
        }
        Ok(ModelDecl {
            name: raw.name,
            filters: raw.filters.or(nested_filters),
            validations,
        })
    }
}
