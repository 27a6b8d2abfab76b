use crate::ast::{BinaryOp, LogicalOp, UnaryOp};

/// Identity of a node within one parsed program.
///
/// Ids are handed out by the parser in creation order and are only
/// meaningful inside the [`Program`](crate::ast::Program) that produced them.
/// Watch sets refer to nodes by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// How much an expression's value can depend on mutable object state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Purity {
    /// Always a primitive computed from its operands (unary and non-`+` binary)
    Absolute,
    /// Depends only on the objects reached through plain property reads
    #[default]
    Relative,
    /// Reaches a computed key or a call, either of which may run user code
    Impure,
}

/// Results of static analysis, filled in by [`annotate`](crate::analysis::annotate).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotation {
    /// The whole subtree folds to a single value
    pub constant: bool,

    /// Minimal sub-expressions whose values determine this one
    pub to_watch: Vec<NodeId>,

    pub purity: Purity,
}

/// Literal values that can appear in source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub annotation: Annotation,
}

/// Expression node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `target = value`
    ///
    /// The target is always an Identifier or a non-optional member access.
    Assignment { left: Box<Expr>, right: Box<Expr> },

    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// `a && b`, `a || b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Arithmetic, equality and relational operators
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `+a`, `-a`, `!a`
    Unary { op: UnaryOp, argument: Box<Expr> },

    /// `callee(arg, ...)`
    ///
    /// # Examples
    /// ```text
    /// user.getName()
    /// format(price, "EUR")
    /// ```
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },

    /// Property access
    ///
    /// # Examples
    /// ```text
    /// user.name          // Named, optional = false
    /// items[0]           // Computed, optional = false
    /// user?.address      // Named, optional = true
    /// user?.["name"]     // Computed, optional = true
    /// ```
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
    },

    /// Name resolved against locals, then scope
    Identifier(String),

    Literal(Literal),

    /// `[a, b, c]`
    Array(Vec<Expr>),

    /// `{a: 1, "b": 2, [key]: 3, shorthand}`
    Object(Vec<Property>),

    /// `this`, the scope the expression is evaluated against
    This,

    /// `$locals`, the locals object passed to the evaluation
    Locals,

    /// Stand-in for the value written by an `assign` call. Never produced by the parser.
    ValueParameter,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// `object.name`
    Named(String),
    /// `object[expression]`
    Computed(Box<Expr>),
}

/// One `key: value` entry of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    /// Bare identifier key (`{name: 1}` or shorthand `{name}`)
    Identifier(String),
    /// String or number literal key (`{"a b": 1}`, `{1: 2}`)
    Literal(Literal),
    /// Bracketed key (`{[expr]: 1}`)
    Computed(Box<Expr>),
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind) -> Self {
        Expr {
            id,
            kind,
            annotation: Annotation::default(),
        }
    }

    /// Whether the node names a storable location.
    pub fn is_assignable(&self) -> bool {
        match &self.kind {
            ExprKind::Identifier(_) => true,
            ExprKind::Member { optional, .. } => !optional,
            _ => false,
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Assignment { left, right }
            | ExprKind::Logical { left, right, .. }
            | ExprKind::Binary { left, right, .. } => vec![&**left, &**right],
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => vec![&**test, &**consequent, &**alternate],
            ExprKind::Unary { argument, .. } => vec![&**argument],
            ExprKind::Call { callee, arguments } => {
                let mut children = vec![&**callee];
                children.extend(arguments);
                children
            }
            ExprKind::Member {
                object, property, ..
            } => match property {
                MemberProperty::Named(_) => vec![&**object],
                MemberProperty::Computed(key) => vec![&**object, &**key],
            },
            ExprKind::Array(elements) => elements.iter().collect(),
            ExprKind::Object(properties) => properties
                .iter()
                .flat_map(|property| match &property.key {
                    PropertyKey::Computed(key) => vec![&**key, &property.value],
                    _ => vec![&property.value],
                })
                .collect(),
            ExprKind::Identifier(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::Locals
            | ExprKind::ValueParameter => vec![],
        }
    }

    /// Finds the node with the given id in this subtree.
    pub fn find(&self, id: NodeId) -> Option<&Expr> {
        if self.id == id {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(id))
    }
}
