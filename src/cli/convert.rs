//! JSON <-> Value conversion utilities

use std::rc::Rc;

use serde_json::Map;

use super::CliError;
use crate::Value;

/// Convert serde_json::Value to Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::array(arr.into_iter().map(json_to_value)),
        serde_json::Value::Object(obj) => {
            Value::object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))))
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        json_to_value(v)
    }
}

/// Convert Value to serde_json::Value
///
/// Follows JSON.stringify: `undefined` and functions are dropped from
/// objects and become `null` inside arrays, non-finite numbers become `null`,
/// and a container that contains itself is an error.
pub fn value_to_json(v: &Value) -> Result<serde_json::Value, CliError> {
    to_json(v, &mut Vec::new())
}

fn to_json(v: &Value, ancestors: &mut Vec<*const ()>) -> Result<serde_json::Value, CliError> {
    match v {
        Value::Undefined | Value::Null | Value::Function(_) => Ok(serde_json::Value::Null),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => Ok(number_to_json(*n)),
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Array(items) => {
            enter(ancestors, Rc::as_ptr(items).cast())?;
            let array = items
                .borrow()
                .iter()
                .map(|item| to_json(item, ancestors))
                .collect::<Result<_, _>>()?;
            ancestors.pop();
            Ok(serde_json::Value::Array(array))
        }
        Value::Object(map) => {
            enter(ancestors, Rc::as_ptr(map).cast())?;
            let map = map.borrow();
            let mut keys: Vec<&String> = map
                .iter()
                .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_)))
                .map(|(k, _)| k)
                .collect();
            keys.sort();
            let mut object = Map::new();
            for key in keys {
                object.insert(key.clone(), to_json(&map[key], ancestors)?);
            }
            ancestors.pop();
            Ok(serde_json::Value::Object(object))
        }
    }
}

fn enter(ancestors: &mut Vec<*const ()>, ptr: *const ()) -> Result<(), CliError> {
    if ancestors.contains(&ptr) {
        return Err(CliError::CircularStructure);
    }
    ancestors.push(ptr);
    Ok(())
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::Number((n as i64).into());
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

#[test]
fn test_value_to_json_follows_stringify() {
    let value = Value::object([
        ("a", Value::Undefined),
        ("b", Value::array([Value::Undefined, Value::from(1.5), Value::from(f64::INFINITY)])),
        ("c", Value::from(3)),
    ]);
    assert_eq!(
        value_to_json(&value).unwrap(),
        serde_json::json!({"b": [null, 1.5, null], "c": 3})
    );
}

#[test]
fn test_value_to_json_rejects_cycles() {
    let shared = Value::array([Value::from(1)]);
    let value = Value::array([shared.clone(), shared.clone()]);
    assert_eq!(value_to_json(&value).unwrap(), serde_json::json!([[1], [1]]));

    let object = Value::empty_object();
    object.set_property("self", object.clone()).unwrap();
    assert!(matches!(value_to_json(&object), Err(CliError::CircularStructure)));
}
