//! Compiles annotated expression trees into closures.
//!
//! Every node compiles in one of two modes, chosen when the closure is built:
//! value mode ([`ValueFn`]) produces the node's value, reference mode
//! ([`RefFn`]) also reports the owner and property name the value was read
//! from, which calls need for the receiver and assignments need for the write.
//!
//! Closures capture only literal data and other closures, so compiled
//! evaluators are `Send + Sync` even though the values they produce are not.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use crate::{
    ast::{
        Expr, ExprKind, Literal, LogicalOp, MemberProperty, NodeId, Program, PropertyKey,
    },
    ops,
    value::{EvalError, Value},
};

/// Evaluator producing a value.
pub type ValueFn = Arc<dyn Fn(&Frame<'_>) -> Result<Value, EvalError> + Send + Sync>;

/// Evaluator producing a [`Reference`].
pub type RefFn = Arc<dyn Fn(&Frame<'_>) -> Result<Reference, EvalError> + Send + Sync>;

/// Everything one evaluation can see.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// What `this` and unqualified names resolve against
    pub scope: &'a Value,

    /// Names found here shadow the scope
    pub locals: Option<&'a Value>,

    /// Value written by an assign evaluator
    pub assign: Option<&'a Value>,

    /// Precomputed input values, by input position
    pub inputs: Option<&'a [Value]>,
}

impl<'a> Frame<'a> {
    pub fn new(scope: &'a Value, locals: Option<&'a Value>) -> Self {
        Frame {
            scope,
            locals,
            assign: None,
            inputs: None,
        }
    }

    pub fn with_assign(self, value: &'a Value) -> Self {
        Frame {
            assign: Some(value),
            ..self
        }
    }

    pub fn with_inputs(self, inputs: &'a [Value]) -> Self {
        Frame {
            inputs: Some(inputs),
            ..self
        }
    }

    /// Locals when they have `name` as an own property, the scope otherwise.
    fn base(&self, name: &str) -> &'a Value {
        match self.locals {
            Some(locals) if locals.has_own_property(name) => locals,
            _ => self.scope,
        }
    }
}

/// A value together with the place it was read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    /// Object the property was read from, `Undefined` for computed values
    pub owner: Value,
    /// Property name on `owner`, if the value was read through one
    pub name: Option<String>,
    pub value: Value,
}

impl Reference {
    /// A bare value with no owner.
    pub fn detached(value: Value) -> Self {
        Reference {
            owner: Value::Undefined,
            name: None,
            value,
        }
    }
}

/// Auto-vivification state threaded down an assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vivify {
    /// Plain reads
    No,
    /// A path segment below an assignment target: replace a nullish value with `{}`
    Intermediate,
    /// The assignment target itself, written rather than vivified
    FinalTarget,
}

impl Vivify {
    /// State for the object a member access reads from.
    fn for_object(self) -> Vivify {
        match self {
            Vivify::No => Vivify::No,
            Vivify::Intermediate | Vivify::FinalTarget => Vivify::Intermediate,
        }
    }
}

fn value_fn(f: impl Fn(&Frame<'_>) -> Result<Value, EvalError> + Send + Sync + 'static) -> ValueFn {
    Arc::new(f)
}

fn ref_fn(f: impl Fn(&Frame<'_>) -> Result<Reference, EvalError> + Send + Sync + 'static) -> RefFn {
    Arc::new(f)
}

/// Member key, resolved per evaluation when computed.
enum Key {
    Named(String),
    Computed(ValueFn),
}

impl Key {
    fn resolve(&self, frame: &Frame<'_>) -> Result<Cow<'_, str>, EvalError> {
        match self {
            Key::Named(name) => Ok(Cow::Borrowed(name)),
            Key::Computed(key) => Ok(Cow::Owned(ops::to_property_key(&key(frame)?)?)),
        }
    }
}

struct MemberAccess {
    object: ValueFn,
    key: Key,
    optional: bool,
    vivify: Vivify,
}

impl MemberAccess {
    fn read(&self, frame: &Frame<'_>) -> Result<Value, EvalError> {
        let owner = (self.object)(frame)?;
        if owner.is_nullish() {
            return Ok(Value::Undefined);
        }
        let name = self.key.resolve(frame)?;
        if self.vivify == Vivify::Intermediate {
            vivify_property(&owner, &name)?;
        }
        Ok(owner.get_property(&name))
    }

    fn locate(&self, frame: &Frame<'_>) -> Result<Reference, EvalError> {
        let owner = (self.object)(frame)?;
        if owner.is_nullish() {
            // Computed keys are not evaluated past a nullish owner
            let name = match (&self.key, self.optional) {
                (Key::Named(name), false) => Some(name.clone()),
                _ => None,
            };
            return Ok(Reference {
                owner,
                name,
                value: Value::Undefined,
            });
        }
        let name = self.key.resolve(frame)?.into_owned();
        if self.vivify == Vivify::Intermediate {
            vivify_property(&owner, &name)?;
        }
        let value = owner.get_property(&name);
        Ok(Reference {
            owner,
            name: Some(name),
            value,
        })
    }
}

/// Replaces a nullish `owner[key]` with an empty object.
fn vivify_property(owner: &Value, key: &str) -> Result<(), EvalError> {
    if matches!(owner, Value::Object(_) | Value::Array(_)) && owner.get_property(key).is_nullish() {
        owner.set_property(key, Value::empty_object())?;
    }
    Ok(())
}

pub fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Source-like name of a callee for "is not a function" errors.
fn describe(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::This => "this".to_string(),
        ExprKind::Locals => "$locals".to_string(),
        ExprKind::Member {
            object,
            property: MemberProperty::Named(name),
            optional,
        } => {
            let separator = if *optional { "?." } else { "." };
            format!("{}{separator}{name}", describe(object))
        }
        ExprKind::Member { object, .. } => format!("{}[...]", describe(object)),
        ExprKind::Call { callee, .. } => format!("{}(...)", describe(callee)),
        ExprKind::Literal(literal) => literal_value(literal).to_string(),
        _ => "expression".to_string(),
    }
}

/// Builds evaluators from annotated nodes.
///
/// A compiler may carry a set of watched nodes. Those compile to a lookup into
/// the frame's precomputed inputs, falling back to evaluating the node itself
/// when the caller supplied none.
#[derive(Default)]
pub struct Compiler {
    watched: HashMap<NodeId, (usize, ValueFn)>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler that substitutes input `i` for the node with the `i`-th id.
    pub fn with_inputs(inputs: impl IntoIterator<Item = (NodeId, ValueFn)>) -> Self {
        let watched = inputs
            .into_iter()
            .enumerate()
            .map(|(index, (id, input))| (id, (index, input)))
            .collect();
        Compiler { watched }
    }

    /// Evaluator for a whole program: the last statement's value, `Undefined` when empty.
    pub fn program(&self, program: &Program) -> ValueFn {
        let mut statements: Vec<ValueFn> = program
            .body
            .iter()
            .map(|statement| self.value(&statement.expression))
            .collect();

        if statements.len() <= 1 {
            return statements
                .pop()
                .unwrap_or_else(|| value_fn(|_| Ok(Value::Undefined)));
        }
        value_fn(move |frame| {
            let mut last = Value::Undefined;
            for statement in &statements {
                last = statement(frame)?;
            }
            Ok(last)
        })
    }

    /// Value-mode evaluator for `expr`.
    pub fn value(&self, expr: &Expr) -> ValueFn {
        self.value_with(expr, Vivify::No)
    }

    fn value_with(&self, expr: &Expr, vivify: Vivify) -> ValueFn {
        if let Some(lookup) = self.input_lookup(expr) {
            return lookup;
        }

        match &expr.kind {
            ExprKind::Literal(literal) => {
                let literal = literal.clone();
                value_fn(move |_| Ok(literal_value(&literal)))
            }
            ExprKind::Identifier(name) => {
                let name = name.clone();
                value_fn(move |frame| {
                    let base = frame.base(&name);
                    if vivify == Vivify::Intermediate {
                        vivify_property(base, &name)?;
                    }
                    Ok(base.get_property(&name))
                })
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let access = self.member(object, property, *optional, vivify);
                value_fn(move |frame| access.read(frame))
            }
            ExprKind::Call { callee, arguments } => self.call(callee, arguments),
            ExprKind::Assignment { left, right } => self.assignment(left, right),
            ExprKind::Unary { op, argument } => {
                let op = *op;
                let argument = self.value(argument);
                value_fn(move |frame| ops::unary(op, &argument(frame)?))
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                let left = self.value(left);
                let right = self.value(right);
                value_fn(move |frame| {
                    let lhs = left(frame)?;
                    let rhs = right(frame)?;
                    ops::binary(op, lhs, rhs)
                })
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.value(left);
                let right = self.value(right);
                match op {
                    LogicalOp::And => value_fn(move |frame| {
                        let lhs = left(frame)?;
                        if lhs.is_truthy() { right(frame) } else { Ok(lhs) }
                    }),
                    LogicalOp::Or => value_fn(move |frame| {
                        let lhs = left(frame)?;
                        if lhs.is_truthy() { Ok(lhs) } else { right(frame) }
                    }),
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.value(test);
                let consequent = self.value(consequent);
                let alternate = self.value(alternate);
                value_fn(move |frame| {
                    if test(frame)?.is_truthy() {
                        consequent(frame)
                    } else {
                        alternate(frame)
                    }
                })
            }
            ExprKind::Array(elements) => {
                let elements: Vec<ValueFn> = elements.iter().map(|e| self.value(e)).collect();
                value_fn(move |frame| {
                    let values = elements
                        .iter()
                        .map(|element| element(frame))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::array(values))
                })
            }
            ExprKind::Object(properties) => {
                let entries: Vec<(Key, ValueFn)> = properties
                    .iter()
                    .map(|property| {
                        let key = match &property.key {
                            PropertyKey::Identifier(name) => Key::Named(name.clone()),
                            PropertyKey::Literal(literal) => {
                                Key::Named(literal_value(literal).to_string())
                            }
                            PropertyKey::Computed(key) => Key::Computed(self.value(key)),
                        };
                        (key, self.value(&property.value))
                    })
                    .collect();
                value_fn(move |frame| {
                    let object = Value::empty_object();
                    for (key, value) in &entries {
                        let key = key.resolve(frame)?;
                        object.set_property(&key, value(frame)?)?;
                    }
                    Ok(object)
                })
            }
            ExprKind::This => value_fn(|frame| Ok(frame.scope.clone())),
            ExprKind::Locals => value_fn(|frame| Ok(frame.locals.cloned().unwrap_or_default())),
            ExprKind::ValueParameter => {
                value_fn(|frame| Ok(frame.assign.cloned().unwrap_or_default()))
            }
        }
    }

    /// Reference-mode evaluator for `expr`.
    ///
    /// Only identifiers and member accesses have an owner; everything else
    /// yields a detached reference around its value.
    pub fn reference(&self, expr: &Expr, vivify: Vivify) -> RefFn {
        if let Some(lookup) = self.input_lookup(expr) {
            return ref_fn(move |frame| Ok(Reference::detached(lookup(frame)?)));
        }

        match &expr.kind {
            ExprKind::Identifier(name) => {
                let name = name.clone();
                ref_fn(move |frame| {
                    let base = frame.base(&name);
                    if vivify == Vivify::Intermediate {
                        vivify_property(base, &name)?;
                    }
                    Ok(Reference {
                        owner: base.clone(),
                        name: Some(name.clone()),
                        value: base.get_property(&name),
                    })
                })
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let access = self.member(object, property, *optional, vivify);
                ref_fn(move |frame| access.locate(frame))
            }
            _ => {
                let value = self.value_with(expr, vivify);
                ref_fn(move |frame| Ok(Reference::detached(value(frame)?)))
            }
        }
    }

    fn member(
        &self,
        object: &Expr,
        property: &MemberProperty,
        optional: bool,
        vivify: Vivify,
    ) -> MemberAccess {
        MemberAccess {
            object: self.value_with(object, vivify.for_object()),
            key: match property {
                MemberProperty::Named(name) => Key::Named(name.clone()),
                MemberProperty::Computed(key) => Key::Computed(self.value(key)),
            },
            optional,
            vivify,
        }
    }

    /// Calls through a nullish callee yield `Undefined` without evaluating arguments.
    fn call(&self, callee: &Expr, arguments: &[Expr]) -> ValueFn {
        let description = describe(callee);
        let callee = self.reference(callee, Vivify::No);
        let arguments: Vec<ValueFn> = arguments.iter().map(|a| self.value(a)).collect();

        value_fn(move |frame| {
            let target = callee(frame)?;
            if target.value.is_nullish() {
                return Ok(Value::Undefined);
            }
            let args = arguments
                .iter()
                .map(|argument| argument(frame))
                .collect::<Result<Vec<_>, _>>()?;
            match &target.value {
                Value::Function(function) => function.call(&target.owner, &args),
                _ => Err(EvalError::NotCallable {
                    callee: description.clone(),
                }),
            }
        })
    }

    fn assignment(&self, left: &Expr, right: &Expr) -> ValueFn {
        let target = self.reference(left, Vivify::FinalTarget);
        let value = self.value(right);

        value_fn(move |frame| {
            let target = target(frame)?;
            let value = value(frame)?;
            match &target.name {
                Some(name) => target.owner.set_property(name, value.clone())?,
                None => return Err(target.owner.assignment_error("undefined")),
            }
            Ok(value)
        })
    }

    fn input_lookup(&self, expr: &Expr) -> Option<ValueFn> {
        let (index, input) = self.watched.get(&expr.id)?.clone();
        Some(value_fn(move |frame| match frame.inputs {
            Some(values) => Ok(values.get(index).cloned().unwrap_or_default()),
            None => input(frame),
        }))
    }
}
