// tests/cli_tests.rs

use safe_expression::cli::{
    execute_check, inspect, json_to_value, value_to_json, CheckOptions, CheckResult, CliError,
};
use safe_expression::Value;
use serde_json::json;

fn check(expression: &str, input: &str) -> serde_json::Value {
    let options = CheckOptions {
        expression: expression.to_string(),
        input: Some(input.to_string()),
        ..Default::default()
    };
    match execute_check(&options) {
        Ok(CheckResult::Success(output)) => output,
        other => panic!("Unexpected result for {:?}: {:?}", expression, other),
    }
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_evaluates_against_input() {
    let input = r#"{"user": {"name": "Ada", "age": 36}, "items": [1, 2, 3]}"#;

    assert_eq!(check("user.name", input), json!("Ada"));
    assert_eq!(check("user.age + 1", input), json!(37));
    assert_eq!(check("items[1] * 1.5", input), json!(3));
    assert_eq!(check("items[0] / 4", input), json!(0.25));
    assert_eq!(check("items.length > 2 ? 'many' : 'few'", input), json!("many"));
    assert_eq!(check("user?.address?.street", input), json!(null));
    assert_eq!(check("{n: user.name, tags: [1, missing]}", input), json!({"n": "Ada", "tags": [1, null]}));
}

#[test]
fn test_check_returns_assigned_scope() {
    assert_eq!(check("a.b.c = 1; a", "{}"), json!({"b": {"c": 1}}));
}

#[test]
fn test_check_with_locals() {
    let options = CheckOptions {
        expression: "a + b".to_string(),
        input: Some(r#"{"a": 1, "b": 2}"#.to_string()),
        locals: Some(r#"{"a": 10}"#.to_string()),
        ..Default::default()
    };
    let result = execute_check(&options).unwrap();
    assert!(matches!(result, CheckResult::Success(ref v) if *v == json!(12)));
}

#[test]
fn test_check_syntax_only() {
    let options = CheckOptions {
        expression: "a.b(c) ? d : e".to_string(),
        syntax_only: true,
        ..Default::default()
    };
    assert!(matches!(execute_check(&options), Ok(CheckResult::SyntaxValid)));
}

#[test]
fn test_check_errors() {
    let no_input = CheckOptions {
        expression: "a".to_string(),
        ..Default::default()
    };
    assert!(matches!(execute_check(&no_input), Err(CliError::NoInput)));

    let bad_json = CheckOptions {
        expression: "a".to_string(),
        input: Some("{not json".to_string()),
        ..Default::default()
    };
    assert!(matches!(execute_check(&bad_json), Err(CliError::Json(_))));

    let bad_syntax = CheckOptions {
        expression: "a +".to_string(),
        input: Some("{}".to_string()),
        ..Default::default()
    };
    let err = execute_check(&bad_syntax).unwrap_err();
    assert!(matches!(err, CliError::Compile(_)));
    assert!(err.to_string().starts_with("Parse error: "));

    let not_callable = CheckOptions {
        expression: "a()".to_string(),
        input: Some(r#"{"a": 1}"#.to_string()),
        ..Default::default()
    };
    let err = execute_check(&not_callable).unwrap_err();
    assert_eq!(err.to_string(), "Evaluation error: a is not a function");
}

#[test]
fn test_check_rejects_circular_result() {
    let options = CheckOptions {
        expression: "a[0] = a; a".to_string(),
        input: Some(r#"{"a": []}"#.to_string()),
        ..Default::default()
    };
    let err = execute_check(&options).unwrap_err();
    assert!(matches!(err, CliError::CircularStructure));
    assert_eq!(err.to_string(), "Converting circular structure to JSON");

    // Shared but acyclic structure is fine
    assert_eq!(check("b = [1]; [b, b]", "{}"), json!([[1], [1]]));
}

// ============================================================================
// inspect
// ============================================================================

#[test]
fn test_inspect() {
    let inspection = inspect("  ::user.name ").unwrap();
    assert!(inspection.one_time);
    assert!(inspection.assignable);
    assert!(!inspection.literal);
    assert!(!inspection.constant);
    assert_eq!(inspection.inputs, None);
    assert_eq!(inspection.tokens, vec!["user", ".", "name"]);

    let inspection = inspect("a * b").unwrap();
    assert_eq!(inspection.inputs, Some(2));
    assert!(!inspection.assignable);

    let inspection = inspect("[1, 'x']").unwrap();
    assert!(inspection.literal);
    assert!(inspection.constant);
}

#[test]
fn test_inspect_display() {
    let output = inspect("a + 1").unwrap().to_string();
    assert_eq!(
        output,
        "literal:    false\n\
         constant:   false\n\
         one-time:   false\n\
         assignable: false\n\
         inputs:     1\n\
         tokens:     a + 1"
    );
}

#[test]
fn test_inspect_reports_errors() {
    assert!(matches!(inspect("a ="), Err(CliError::Compile(_))));
    assert!(matches!(inspect("a # b"), Err(CliError::Compile(_))));
}

// ============================================================================
// JSON conversion
// ============================================================================

#[test]
fn test_json_conversion() {
    let json = json!({"a": [1, "two", null, true], "b": {"c": 2.5}});
    let value = json_to_value(json.clone());

    assert_eq!(value.get_property("a").get_property("1"), Value::from("two"));
    assert_eq!(value.get_property("b").get_property("c"), Value::from(2.5));
    assert_eq!(value_to_json(&value).unwrap(), json);
}

#[test]
fn test_functions_are_dropped_from_json() {
    let value = Value::object([
        ("f", Value::function(|_, _| Ok(Value::Undefined))),
        ("list", Value::array([Value::function(|_, _| Ok(Value::Null))])),
    ]);
    assert_eq!(value_to_json(&value).unwrap(), json!({"list": [null]}));
}
