//! Operator semantics and value coercions.
//!
//! Arithmetic, equality and comparison follow the host language's native
//! rules (`1 == true`, `"2" * "3" == 6`, `[] + {} == "[object Object]"`),
//! with two forgiving twists applied by the compiler: `+` treats an
//! undefined operand as its identity element and `-` treats it as zero.

use std::{cell::RefCell, cmp::Ordering, rc::Rc};

use crate::{
    ast::{BinaryOp, UnaryOp},
    value::{ArrayRef, EvalError, Value},
};

/// Conversion preference for [`to_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// Try `valueOf` before `toString` (arithmetic, comparison, `+`, `==`)
    Number,
    /// Try `toString` before `valueOf` (property keys, string conversion)
    String,
}

/// Converts objects to primitives, honouring own `valueOf`/`toString` functions.
///
/// Objects without either method fall back to `"[object Object]"`, arrays to
/// their comma-joined elements. Primitives are returned unchanged.
pub fn to_primitive(value: &Value, hint: Hint) -> Result<Value, EvalError> {
    let Value::Object(map) = value else {
        return Ok(match value {
            Value::Array(items) => Value::String(join(items, &mut Vec::new())?),
            Value::Function(_) => Value::String(value.to_string()),
            primitive => primitive.clone(),
        });
    };

    let method = |name: &str| match map.borrow().get(name) {
        Some(Value::Function(f)) => Some(f.clone()),
        _ => None,
    };
    let order = match hint {
        Hint::Number => ["valueOf", "toString"],
        Hint::String => ["toString", "valueOf"],
    };

    let mut called = false;
    for name in order {
        if let Some(f) = method(name) {
            called = true;
            let result = f.call(value, &[])?;
            if result.is_primitive() {
                return Ok(result);
            }
        } else if name == "toString" {
            return Ok(Value::String(value.to_string()));
        }
    }

    if called {
        Err(EvalError::CannotConvertToPrimitive)
    } else {
        Ok(Value::String(value.to_string()))
    }
}

/// Numeric conversion.
pub fn to_number(value: &Value) -> Result<f64, EvalError> {
    Ok(match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Array(_) | Value::Object(_) | Value::Function(_) => {
            return to_number(&to_primitive(value, Hint::Number)?);
        }
    })
}

/// String conversion, honouring user-defined `toString`.
pub fn to_string(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Object(_) => Ok(to_primitive(value, Hint::String)?.to_string()),
        Value::Array(items) => join(items, &mut Vec::new()),
        other => Ok(other.to_string()),
    }
}

/// `Array.prototype.join(",")`: elements converted with [`to_string`],
/// nullish elements and arrays already being joined print as empty.
fn join(
    items: &ArrayRef,
    visiting: &mut Vec<*const RefCell<Vec<Value>>>,
) -> Result<String, EvalError> {
    let ptr = Rc::as_ptr(items);
    if visiting.contains(&ptr) {
        return Ok(String::new());
    }
    // A `toString` may write into the array being joined
    let elements = items.borrow().clone();

    visiting.push(ptr);
    let mut parts = Vec::with_capacity(elements.len());
    for element in &elements {
        parts.push(match element {
            Value::Undefined | Value::Null => String::new(),
            Value::Array(inner) => join(inner, visiting)?,
            other => to_string(other)?,
        });
    }
    visiting.pop();
    Ok(parts.join(","))
}

/// Coerces a computed member key to a property name.
pub fn to_property_key(value: &Value) -> Result<String, EvalError> {
    to_string(value)
}

/// Parses a string the way numeric conversion does: surrounding whitespace
/// ignored, empty is zero, `Infinity` and `0x`/`0o`/`0b` prefixes accepted,
/// anything else malformed is `NaN`.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &s[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    }

    // Keeps `inf`, `nan` and friends, which Rust would accept, out.
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Formats a number with the shortest round-trip digits, switching to
/// exponent notation at `1e21` and below `1e-6`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let sign = if n < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest round-trip mantissa, e.g. "1.75e0"
    let formatted = format!("{:e}", n.abs());
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let exp_sign = if point - 1 >= 0 { "+" } else { "-" };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{exp_sign}{}", (point - 1).abs())
        } else {
            format!("{first}.{rest}e{exp_sign}{}", (point - 1).abs())
        }
    };
    format!("{sign}{body}")
}

/// `===`
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

/// `==`
pub fn loose_equals(left: &Value, right: &Value) -> Result<bool, EvalError> {
    if std::mem::discriminant(left) == std::mem::discriminant(right) {
        return Ok(strict_equals(left, right));
    }
    match (left, right) {
        (a, b) if a.is_nullish() && b.is_nullish() => Ok(true),
        (a, b) if a.is_nullish() || b.is_nullish() => Ok(false),
        (Value::Number(a), Value::String(b)) => Ok(*a == string_to_number(b)),
        (Value::String(a), Value::Number(b)) => Ok(string_to_number(a) == *b),
        (Value::Bool(_), other) => loose_equals(&Value::Number(to_number(left)?), other),
        (other, Value::Bool(_)) => loose_equals(other, &Value::Number(to_number(right)?)),
        (a, b) if !a.is_primitive() && b.is_primitive() => {
            loose_equals(&to_primitive(a, Hint::Number)?, b)
        }
        (a, b) if a.is_primitive() && !b.is_primitive() => {
            loose_equals(a, &to_primitive(b, Hint::Number)?)
        }
        _ => Ok(false),
    }
}

/// Relational ordering; `None` when either side converts to `NaN`.
pub fn compare(left: &Value, right: &Value) -> Result<Option<Ordering>, EvalError> {
    let left = to_primitive(left, Hint::Number)?;
    let right = to_primitive(right, Hint::Number)?;
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Ok(Some(a.encode_utf16().cmp(b.encode_utf16())));
    }
    Ok(to_number(&left)?.partial_cmp(&to_number(&right)?))
}

/// `+` after the undefined-identity rule has been applied.
pub fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let left = to_primitive(left, Hint::Number)?;
    let right = to_primitive(right, Hint::Number)?;
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Ok(Value::String(format!("{left}{right}")));
    }
    Ok(Value::Number(to_number(&left)? + to_number(&right)?))
}

/// Forgiving `+`: an undefined operand is the identity element.
pub fn plus(left: Value, right: Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Undefined, other) | (other, Value::Undefined) => Ok(other),
        (left, right) => add(&left, &right),
    }
}

/// Forgiving `-`: an undefined operand counts as zero.
pub fn minus(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let operand = |v: &Value| match v {
        Value::Undefined => Ok(0.0),
        other => to_number(other),
    };
    Ok(Value::Number(operand(left)? - operand(right)?))
}

/// Evaluates a binary operator on already-evaluated operands.
pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;

    let ordering = |accept: fn(Ordering) -> bool| -> Result<Value, EvalError> {
        Ok(Value::Bool(compare(&left, &right)?.is_some_and(accept)))
    };

    match op {
        Add => plus(left.clone(), right.clone()),
        Subtract => minus(&left, &right),
        Multiply => Ok(Value::Number(to_number(&left)? * to_number(&right)?)),
        Divide => Ok(Value::Number(to_number(&left)? / to_number(&right)?)),
        Modulo => Ok(Value::Number(to_number(&left)? % to_number(&right)?)),
        Equal => Ok(Value::Bool(loose_equals(&left, &right)?)),
        NotEqual => Ok(Value::Bool(!loose_equals(&left, &right)?)),
        StrictEqual => Ok(Value::Bool(strict_equals(&left, &right))),
        StrictNotEqual => Ok(Value::Bool(!strict_equals(&left, &right))),
        LessThan => ordering(|o| o == Ordering::Less),
        GreaterThan => ordering(|o| o == Ordering::Greater),
        LessEqual => ordering(|o| o != Ordering::Greater),
        GreaterEqual => ordering(|o| o != Ordering::Less),
    }
}

/// Evaluates a prefix operator. `+`/`-` map undefined to `0`/`-0` instead of `NaN`.
pub fn unary(op: UnaryOp, argument: &Value) -> Result<Value, EvalError> {
    Ok(match (op, argument) {
        (UnaryOp::Plus, Value::Undefined) => Value::Number(0.0),
        (UnaryOp::Minus, Value::Undefined) => Value::Number(-0.0),
        (UnaryOp::Plus, other) => Value::Number(to_number(other)?),
        (UnaryOp::Minus, other) => Value::Number(-to_number(other)?),
        (UnaryOp::Not, other) => Value::Bool(!other.is_truthy()),
    })
}
