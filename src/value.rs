use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
};

use thiserror::Error;

use crate::ops;

/// Object storage: string keys to values, shared and mutable.
pub type ObjectRef = Rc<RefCell<HashMap<String, Value>>>;

/// Array storage, shared and mutable.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Native callable: `(receiver, arguments) -> result`.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value, EvalError>;

/// A dynamically typed value of the data context.
///
/// Arrays and objects have reference semantics: cloning a `Value` clones the
/// handle, not the contents, so writes made by an assignment expression are
/// visible through every handle to the same container.
///
/// # Examples
///
/// ```
/// use safe_expression::Value;
///
/// let user = Value::object([("name", Value::from("Alice"))]);
/// let scope = Value::object([("user", user.clone())]);
///
/// scope.get_property("user").set_property("age", Value::from(30)).unwrap();
/// assert_eq!(user.get_property("age"), Value::Number(30.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing value; what absent properties and unresolved names evaluate to
    #[default]
    Undefined,

    Null,

    Bool(bool),

    /// All numbers are double precision floats
    Number(f64),

    String(String),

    Array(ArrayRef),

    Object(ObjectRef),

    /// Caller-supplied function, invoked by call expressions
    Function(Function),
}

/// Handle to a native function. Equality is identity.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    pub fn new(f: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Function(Rc::new(f))
    }

    /// Calls the function with `this` bound to `receiver`.
    pub fn call(&self, receiver: &Value, args: &[Value]) -> Result<Value, EvalError> {
        (self.0)(receiver, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", Rc::as_ptr(&self.0))
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Errors that can occur while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A call whose callee is neither a function nor null/undefined
    #[error("{callee} is not a function")]
    NotCallable { callee: String },

    /// An assignment into something that cannot hold properties
    #[error("Cannot set properties of {target} (setting '{name}')")]
    InvalidAssignmentTarget { name: String, target: String },

    /// `valueOf` and `toString` both produced non-primitive values
    #[error("Cannot convert object to primitive value")]
    CannotConvertToPrimitive,

    /// An array write that would open too large a run of holes
    #[error("Cannot grow array of length {length} to length {requested}")]
    ArrayTooLarge { length: usize, requested: usize },

    /// Raised by a caller-supplied function
    #[error("{0}")]
    Host(String),
}

impl EvalError {
    /// Convenience constructor for errors raised from native functions.
    pub fn host(message: impl Into<String>) -> Self {
        EvalError::Host(message.into())
    }
}

impl Value {
    /// Builds an object from key/value pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn empty_object() -> Self {
        Value::Object(Rc::default())
    }

    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(values.into_iter().collect())))
    }

    pub fn function(f: impl Fn(&Value, &[Value]) -> Result<Value, EvalError> + 'static) -> Self {
        Value::Function(Function::new(f))
    }

    /// `null` or `undefined`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Value::Array(_) | Value::Object(_) | Value::Function(_)
        )
    }

    /// Truthiness as used by `!`, `&&`, `||` and `?:`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// The `typeof` name of the value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// True if `key` is an own property, used for the locals-over-scope rule.
    pub fn has_own_property(&self, key: &str) -> bool {
        match self {
            Value::Object(map) => map.borrow().contains_key(key),
            Value::Array(items) => {
                key == "length" || array_index(key).is_some_and(|i| i < items.borrow().len())
            }
            _ => false,
        }
    }

    /// Reads a property. Anything without the property yields `Undefined`.
    ///
    /// Arrays and strings expose `length` and integer indices.
    pub fn get_property(&self, key: &str) -> Value {
        match self {
            Value::Object(map) => map.borrow().get(key).cloned().unwrap_or_default(),
            Value::Array(items) => {
                let items = items.borrow();
                if key == "length" {
                    return Value::Number(items.len() as f64);
                }
                array_index(key)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default()
            }
            Value::String(s) => {
                if key == "length" {
                    return Value::Number(s.encode_utf16().count() as f64);
                }
                array_index(key)
                    .and_then(|i| s.encode_utf16().nth(i))
                    .map(|unit| Value::String(String::from_utf16_lossy(&[unit])))
                    .unwrap_or_default()
            }
            _ => Value::Undefined,
        }
    }

    /// Writes a property on an object or array.
    pub fn set_property(&self, key: &str, value: Value) -> Result<(), EvalError> {
        match self {
            Value::Object(map) => {
                map.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                if let Some(index) = array_index(key) {
                    let mut items = items.borrow_mut();
                    if index >= items.len() {
                        resize_array(&mut items, index + 1)?;
                    }
                    items[index] = value;
                    return Ok(());
                }
                if key == "length"
                    && let Value::Number(n) = value
                    && n >= 0.0
                    && n.fract() == 0.0
                    && n < f64::from(u32::MAX)
                {
                    resize_array(&mut items.borrow_mut(), n as usize)?;
                    return Ok(());
                }
                Err(self.assignment_error(key))
            }
            _ => Err(self.assignment_error(key)),
        }
    }

    /// The error raised when writing `key` into this value fails.
    pub(crate) fn assignment_error(&self, key: &str) -> EvalError {
        EvalError::InvalidAssignmentTarget {
            name: key.to_string(),
            target: match self {
                Value::Undefined => "undefined".to_string(),
                Value::Null => "null".to_string(),
                Value::Array(_) => "array".to_string(),
                Value::Object(_) | Value::Function(_) => self.type_name().to_string(),
                other => format!("{} {}", other.type_name(), other),
            },
        }
    }
}

/// Most `Undefined` holes a single write may append to an array.
pub const MAX_ARRAY_GROWTH: usize = 1 << 16;

/// Truncates or extends `items` to `length`, refusing to open a gap wider
/// than [`MAX_ARRAY_GROWTH`].
fn resize_array(items: &mut Vec<Value>, length: usize) -> Result<(), EvalError> {
    if length > items.len() + MAX_ARRAY_GROWTH {
        return Err(EvalError::ArrayTooLarge {
            length: items.len(),
            requested: length,
        });
    }
    items.resize(length, Value::Undefined);
    Ok(())
}

/// Canonical array index: digits without leading zeros, within `u32` range.
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<u32>().ok()?;
    (index.to_string() == key && index != u32::MAX).then_some(index as usize)
}

/// Default string conversion, without calling any `toString` property.
///
/// Use [`ops::to_string`] where user-defined conversions must be honoured.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&ops::number_to_string(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => write_joined(f, items, &mut Vec::new()),
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(_) => f.write_str("function () { [native code] }"),
        }
    }
}

/// Comma-joins `items`; an array already being joined prints as empty.
fn write_joined(
    f: &mut fmt::Formatter<'_>,
    items: &ArrayRef,
    visiting: &mut Vec<*const RefCell<Vec<Value>>>,
) -> fmt::Result {
    let ptr = Rc::as_ptr(items);
    if visiting.contains(&ptr) {
        return Ok(());
    }
    visiting.push(ptr);
    for (i, item) in items.borrow().iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        match item {
            Value::Array(inner) => write_joined(f, inner, visiting)?,
            other if other.is_nullish() => {}
            other => write!(f, "{other}")?,
        }
    }
    visiting.pop();
    Ok(())
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::array(values)
    }
}
