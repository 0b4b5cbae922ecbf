//! Policy Invariant Tests
//!
//! Tests for the before-write guard through the public API:
//! - Pass-through when nothing is declared
//! - Required errors, one per omitted field, in declaration order
//! - Unlisted fields never survive a successful filtered write
//! - Repeated runs over the same input commit the same set
//! - Unknown scenarios always fail with a single entry

use fieldgate::policy::{
    Attributes, EmptyErrorStyle, ErrorKind, FieldSpec, Guard, ModelDecl, OperationContext, Pending,
    PolicyConfig, PolicyResult, RuleTable,
};
use fieldgate::rules::RuleEvaluator;
use proptest::prelude::*;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn attrs(value: Value) -> Attributes {
    value.as_object().cloned().unwrap()
}

fn user_filters() -> ModelDecl {
    ModelDecl::new("user")
        .with_filter(
            "insert",
            vec![
                FieldSpec::required("first_name"),
                FieldSpec::required("password"),
                "last_name".into(),
                "email".into(),
                "phone".into(),
            ],
        )
        .with_filter(
            "update",
            vec!["first_name".into(), "last_name".into(), "email".into(), "phone".into()],
        )
        .with_filter("changeAvatar", vec!["avatar".into()])
}

fn user_rules() -> RuleTable {
    RuleTable::new()
        .with("first_name", json!({"presence": true, "length": {"minimum": 3}}))
        .with("last_name", json!({"length": {"minimum": 3}}))
        .with("email", json!({"email": true}))
        .with("phone", json!({"format": "\\+\\d{8,16}"}))
        .with("password", json!({"presence": true, "length": {"minimum": 3}}))
}

fn insert(guard: &Guard, model: &ModelDecl, record: &mut Attributes) -> PolicyResult<()> {
    guard
        .before_write(model, &OperationContext::insert(), Pending::Full(record))
        .map(|_| ())
}

fn patch(
    guard: &Guard,
    model: &ModelDecl,
    context: OperationContext,
    record: &mut Attributes,
    supplied: &mut Attributes,
) -> PolicyResult<()> {
    guard
        .before_write(model, &context, Pending::Patch { record, supplied })
        .map(|_| ())
}

// =============================================================================
// Concrete Scenarios
// =============================================================================

/// Empty insert reports both required fields, in filter order.
#[test]
fn test_empty_insert_reports_required_fields() {
    let guard = Guard::default();
    let model = user_filters();
    let mut record = Attributes::new();

    let err = insert(&guard, &model, &mut record).unwrap_err();
    let errors = err.errors();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind(), ErrorKind::Required);
    assert_eq!(errors[0].attribute(), Some("first_name"));
    assert_eq!(errors[0].messages(), ["Attribute first_name is required"]);
    assert_eq!(errors[1].attribute(), Some("password"));
    assert_eq!(errors[1].messages(), ["Attribute password is required"]);
}

/// A too-short password yields exactly one invalid entry.
#[test]
fn test_short_password_is_invalid() {
    let guard = Guard::default();
    let model = ModelDecl::new("account")
        .with_filter("insert", vec!["password".into()])
        .with_validations(
            RuleTable::new().with("password", json!({"presence": true, "length": {"minimum": 3}})),
        );
    let mut record = attrs(json!({"password": "12"}));

    let err = insert(&guard, &model, &mut record).unwrap_err();
    let errors = err.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::Invalid);
    assert_eq!(errors[0].attribute(), Some("password"));
    assert_eq!(errors[0].messages(), ["Password is too short (minimum is 3 characters)"]);
    assert_eq!(
        serde_json::to_value(&errors[0]).unwrap(),
        json!({
            "type": "invalid",
            "attribute": "password",
            "messages": ["Password is too short (minimum is 3 characters)"]
        })
    );
}

/// Patch update strips supplied-but-disallowed keys from the pending set and
/// the record store; unrelated record state survives.
#[test]
fn test_patch_update_strips_disallowed_supplied_keys() {
    let guard = Guard::default();
    let model = ModelDecl::new("user").with_filter("update", vec!["first_name".into()]);
    let mut record =
        attrs(json!({"id": 3, "first_name": "Old", "extra": "stored", "verified": true}));
    let mut supplied = attrs(json!({"first_name": "X", "extra": "Y"}));

    patch(&guard, &model, OperationContext::patch(), &mut record, &mut supplied).unwrap();

    assert_eq!(supplied, attrs(json!({"first_name": "X"})));
    assert!(!record.contains_key("extra"));
    assert_eq!(record.get("verified"), Some(&json!(true)));
    assert_eq!(record.get("id"), Some(&json!(3)));
}

/// With record pruning disabled only the pending set is stripped.
#[test]
fn test_patch_update_leaves_record_when_pruning_disabled() {
    let config = PolicyConfig::default().with_prune_record_on_patch(false);
    let guard = Guard::new(config, RuleEvaluator::default()).unwrap();
    let model = ModelDecl::new("user").with_filter("update", vec!["first_name".into()]);
    let mut record = attrs(json!({"id": 3, "extra": "stored"}));
    let mut supplied = attrs(json!({"first_name": "X", "extra": "Y"}));

    patch(&guard, &model, OperationContext::patch(), &mut record, &mut supplied).unwrap();

    assert_eq!(supplied, attrs(json!({"first_name": "X"})));
    assert_eq!(record.get("extra"), Some(&json!("stored")));
}

/// Insert filters out unlisted attributes.
#[test]
fn test_insert_filters_attributes() {
    let guard = Guard::default();
    let model = user_filters().with_validations(user_rules());
    let mut record = attrs(json!({
        "first_name": "Sandro",
        "email": "sandro.csimas@gmail.com",
        "password": "123456",
        "verified": true
    }));

    insert(&guard, &model, &mut record).unwrap();
    assert_eq!(record.get("first_name"), Some(&json!("Sandro")));
    assert_eq!(record.get("password"), Some(&json!("123456")));
    assert!(record.get("verified").is_none());
}

/// Update leaving nothing after filtering fails with the empty entry.
#[test]
fn test_update_with_only_disallowed_fields_fails() {
    let config = PolicyConfig::default().with_empty_error(EmptyErrorStyle::MethodScoped);
    let guard = Guard::new(config, RuleEvaluator::default()).unwrap();
    let model = user_filters().with_validations(user_rules());
    let mut record = attrs(json!({"id": 1}));
    let mut supplied = attrs(json!({"registration_date": "2010-05-04"}));

    let err = patch(&guard, &model, OperationContext::patch(), &mut record, &mut supplied)
        .unwrap_err();
    assert_eq!(err.errors().len(), 1);
    assert_eq!(
        serde_json::to_value(&err.errors()[0]).unwrap(),
        json!({
            "type": "update.filter.empty",
            "messages": ["No attributes to update after filtering"]
        })
    );
}

/// Clearing a formatted field through a patch is allowed.
#[test]
fn test_patch_can_clear_formatted_field() {
    let guard = Guard::default();
    let model = user_filters().with_validations(user_rules());
    let mut record = attrs(json!({"id": 1, "phone": "+5571999999999"}));
    let mut supplied = attrs(json!({"phone": null}));

    patch(&guard, &model, OperationContext::patch(), &mut record, &mut supplied).unwrap();
    assert_eq!(supplied.get("phone"), Some(&Value::Null));
}

/// Malformed non-null input is still caught on patch.
#[test]
fn test_patch_rejects_malformed_value() {
    let guard = Guard::default();
    let model = user_filters().with_validations(user_rules());
    let mut record = attrs(json!({"id": 1}));
    let mut supplied = attrs(json!({"email": "nope", "phone": "12"}));
    let before = supplied.clone();

    let err = patch(&guard, &model, OperationContext::patch(), &mut record, &mut supplied)
        .unwrap_err();
    let fields: Vec<_> = err.errors().iter().map(|e| e.attribute().unwrap()).collect();
    assert_eq!(fields, ["email", "phone"]);
    assert_eq!(supplied, before);
}

/// Whitespace-only values fail notBlank even though they are present.
#[test]
fn test_not_blank_rejects_whitespace() {
    let guard = Guard::default();
    let model = ModelDecl::new("post")
        .with_filter("insert", vec![FieldSpec::required("title")])
        .with_validations(RuleTable::new().with("title", json!({"notBlank": true})));
    let mut record = attrs(json!({"title": "   "}));

    let err = insert(&guard, &model, &mut record).unwrap_err();
    assert_eq!(err.errors()[0].messages(), ["Title can't be blank"]);
}

/// Named scenario replaces the method filter.
#[test]
fn test_named_scenario() {
    let guard = Guard::default();
    let model = user_filters().with_validations(user_rules());
    let mut record = attrs(json!({"id": 1, "first_name": "Sandro"}));
    let mut supplied = attrs(json!({"avatar": "me.png", "first_name": "Changed"}));
    let ctx = OperationContext::patch().with_scenario("changeAvatar");

    patch(&guard, &model, ctx, &mut record, &mut supplied).unwrap();
    assert_eq!(supplied, attrs(json!({"avatar": "me.png"})));
}

/// Strict null policy turns null required values into required errors.
#[test]
fn test_required_rejects_null_when_configured() {
    let model = user_filters();
    let mut record = attrs(json!({"first_name": null, "password": "secret"}));

    let lenient = Guard::default();
    assert!(insert(&lenient, &model, &mut record.clone()).is_ok());

    let strict = Guard::new(
        PolicyConfig::default().with_required_rejects_null(true),
        RuleEvaluator::default(),
    )
    .unwrap();
    let err = insert(&strict, &model, &mut record).unwrap_err();
    assert_eq!(err.errors().len(), 1);
    assert_eq!(err.errors()[0].attribute(), Some("first_name"));
}

// =============================================================================
// Properties
// =============================================================================

fn attribute_map() -> impl Strategy<Value = Attributes> {
    prop::collection::btree_map("[a-z_]{1,8}", "[ -~]{0,12}", 0..8).prop_map(|m| {
        m.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect()
    })
}

proptest! {
    /// No filters and no validations: any attribute set passes unchanged.
    #[test]
    fn prop_undeclared_model_passes_through(record in attribute_map()) {
        let guard = Guard::default();
        let mut written = record.clone();
        let model = ModelDecl::new("plain");
        guard
            .before_write(&model, &OperationContext::insert(), Pending::Full(&mut written))
            .unwrap();
        prop_assert_eq!(written, record);
    }

    /// An undeclared scenario always yields exactly one scenario.notfound entry.
    #[test]
    fn prop_unknown_scenario_single_error(record in attribute_map()) {
        let guard = Guard::default();
        let model = user_filters().with_validations(user_rules());
        let mut written = record.clone();
        let ctx = OperationContext::update().with_scenario("doesNotExist");

        let err = guard.before_write(&model, &ctx, Pending::Full(&mut written)).unwrap_err();
        prop_assert_eq!(err.errors().len(), 1);
        prop_assert_eq!(err.errors()[0].kind(), ErrorKind::ScenarioNotFound);
        prop_assert_eq!(written, record);
    }

    /// Omitting required fields yields one required entry per omitted field.
    #[test]
    fn prop_required_errors_match_omissions(
        first in proptest::option::of("[a-z]{3,8}"),
        password in proptest::option::of("[a-z]{3,8}"),
    ) {
        let guard = Guard::default();
        let model = user_filters();
        let mut record = Attributes::new();
        let mut expected = Vec::new();
        match first {
            Some(v) => { record.insert("first_name".into(), json!(v)); }
            None => expected.push("first_name"),
        }
        match password {
            Some(v) => { record.insert("password".into(), json!(v)); }
            None => expected.push("password"),
        }

        let result = insert(&guard, &model, &mut record);
        if expected.is_empty() {
            prop_assert!(result.is_ok());
        } else {
            let err = result.unwrap_err();
            let missing: Vec<&str> = err.errors().iter().map(|e| e.attribute().unwrap()).collect();
            prop_assert_eq!(missing, expected);
        }
    }

    /// Successful filtered runs are idempotent and never keep unlisted keys.
    #[test]
    fn prop_filtered_commit_idempotent(extra in attribute_map()) {
        let guard = Guard::default();
        let model = user_filters();
        let mut record = extra.clone();
        record.insert("first_name".into(), json!("Sandro"));
        record.insert("password".into(), json!("secret"));

        insert(&guard, &model, &mut record).unwrap();
        let first = record.clone();
        insert(&guard, &model, &mut record).unwrap();
        prop_assert_eq!(&record, &first);

        let allowed = ["first_name", "password", "last_name", "email", "phone"];
        prop_assert!(record.keys().all(|k| allowed.contains(&k.as_str())));
    }
}
