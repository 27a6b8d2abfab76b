//! Static analysis over a parsed [`Program`].
//!
//! A single depth-first pass fills in every node's [`Annotation`]: its
//! purity, whether it folds to a constant, and its watch set. The compiler
//! reads these to pick inputs and to set the `literal`/`constant` flags.

use crate::ast::{BinaryOp, Expr, ExprKind, MemberProperty, NodeId, Program, PropertyKey, Purity};

/// Ids for nodes the analyzer synthesises; never produced by the parser.
const ASSIGN_ROOT_ID: NodeId = NodeId(u32::MAX);
const VALUE_PARAMETER_ID: NodeId = NodeId(u32::MAX - 1);

/// Annotates every node of `program` in place.
pub fn annotate(program: &mut Program) {
    let mut constant = true;
    for statement in &mut program.body {
        visit(&mut statement.expression, Purity::Relative);
        constant &= statement.expression.annotation.constant;
    }
    program.constant = constant;
}

/// Purity of `expr` given the purity of its parent.
pub fn purity(expr: &Expr, parent: Purity) -> Purity {
    match &expr.kind {
        // Converting a computed key may call a stateful toString()
        ExprKind::Member {
            property: MemberProperty::Computed(_),
            ..
        } => Purity::Impure,
        ExprKind::Unary { .. } => Purity::Absolute,
        // `+` may concatenate through a stateful toString()
        ExprKind::Binary {
            op: BinaryOp::Add, ..
        } => Purity::Impure,
        ExprKind::Binary { .. } => Purity::Absolute,
        ExprKind::Call { .. } => Purity::Impure,
        _ => parent,
    }
}

fn visit(expr: &mut Expr, parent: Purity) {
    let purity = purity(expr, parent);
    let id = expr.id;

    let (constant, to_watch) = match &mut expr.kind {
        ExprKind::Literal(_) => (true, vec![]),
        ExprKind::Identifier(_) => (false, vec![id]),
        ExprKind::This | ExprKind::Locals | ExprKind::ValueParameter => (false, vec![]),
        ExprKind::Unary { argument, .. } => {
            visit(argument, purity);
            let a = &argument.annotation;
            (a.constant, a.to_watch.clone())
        }
        ExprKind::Binary { left, right, .. } => {
            visit(left, purity);
            visit(right, purity);
            let constant = left.annotation.constant && right.annotation.constant;
            let mut to_watch = left.annotation.to_watch.clone();
            to_watch.extend(&right.annotation.to_watch);
            (constant, to_watch)
        }
        ExprKind::Logical { left, right, .. } => {
            visit(left, purity);
            visit(right, purity);
            irreducible(id, left.annotation.constant && right.annotation.constant)
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            visit(test, purity);
            visit(consequent, purity);
            visit(alternate, purity);
            let constant = [test, consequent, alternate]
                .iter()
                .all(|e| e.annotation.constant);
            irreducible(id, constant)
        }
        ExprKind::Member {
            object, property, ..
        } => {
            visit(object, purity);
            let mut constant = object.annotation.constant;
            if let MemberProperty::Computed(key) = property {
                visit(key, purity);
                constant &= key.annotation.constant;
            }
            irreducible(id, constant)
        }
        ExprKind::Call { callee, arguments } => {
            visit(callee, purity);
            for argument in arguments {
                visit(argument, purity);
            }
            (false, vec![id])
        }
        ExprKind::Assignment { left, right } => {
            visit(left, purity);
            visit(right, purity);
            (false, vec![id])
        }
        ExprKind::Array(elements) => {
            let mut constant = true;
            let mut to_watch = Vec::new();
            for element in elements {
                visit(element, purity);
                constant &= element.annotation.constant;
                to_watch.extend(&element.annotation.to_watch);
            }
            (constant, to_watch)
        }
        ExprKind::Object(properties) => {
            let mut constant = true;
            let mut to_watch = Vec::new();
            for property in properties {
                visit(&mut property.value, purity);
                constant &= property.value.annotation.constant;
                to_watch.extend(&property.value.annotation.to_watch);
                if let PropertyKey::Computed(key) = &mut property.key {
                    visit(key, Purity::Impure);
                    constant &= key.annotation.constant;
                    to_watch.extend(&key.annotation.to_watch);
                }
            }
            (constant, to_watch)
        }
    };

    expr.annotation.purity = purity;
    expr.annotation.constant = constant;
    expr.annotation.to_watch = to_watch;
}

/// Nodes watched as a whole unless they fold to a constant.
fn irreducible(id: NodeId, constant: bool) -> (bool, Vec<NodeId>) {
    if constant { (true, vec![]) } else { (false, vec![id]) }
}

/// The minimal set of sub-expressions worth evaluating separately.
///
/// `None` unless the program is a single statement whose watch set says
/// something beyond "watch the whole expression".
pub fn get_inputs(program: &Program) -> Option<Vec<NodeId>> {
    let expr = program.single_expression()?;
    match expr.annotation.to_watch.as_slice() {
        [] => None,
        [only] if *only == expr.id => None,
        watched => Some(watched.to_vec()),
    }
}

/// Empty programs and single literal, array or object expressions.
pub fn is_literal(program: &Program) -> bool {
    match program.body.as_slice() {
        [] => true,
        [statement] => matches!(
            statement.expression.kind,
            ExprKind::Literal(_) | ExprKind::Array(_) | ExprKind::Object(_)
        ),
        _ => false,
    }
}

/// `<body> = <value parameter>` when the program is a single assignable expression.
pub fn assignable_ast(program: &Program) -> Option<Expr> {
    let target = program.single_expression()?;
    if !target.is_assignable() {
        return None;
    }
    Some(Expr::new(
        ASSIGN_ROOT_ID,
        ExprKind::Assignment {
            left: Box::new(target.clone()),
            right: Box::new(Expr::new(VALUE_PARAMETER_ID, ExprKind::ValueParameter)),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyzed(text: &str) -> Program {
        let mut program = Parser::new(text).unwrap().parse().unwrap();
        annotate(&mut program);
        program
    }

    #[test]
    fn test_unary_children_inherit_absolute_purity() {
        let program = analyzed("-a.b");
        let expr = program.single_expression().unwrap();
        assert_eq!(expr.annotation.purity, Purity::Absolute);
        assert_eq!(expr.children()[0].annotation.purity, Purity::Absolute);
    }

    #[test]
    fn test_assignable_ast_wraps_target() {
        let program = analyzed("a.b");
        let assign = assignable_ast(&program).unwrap();
        let ExprKind::Assignment { left, right } = &assign.kind else {
            panic!("expected assignment, got {:?}", assign.kind);
        };
        assert_eq!(**left, *program.single_expression().unwrap());
        assert_eq!(right.kind, ExprKind::ValueParameter);

        assert!(assignable_ast(&analyzed("a?.b")).is_none());
        assert!(assignable_ast(&analyzed("a; b")).is_none());
    }
}
