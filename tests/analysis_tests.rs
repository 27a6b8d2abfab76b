// tests/analysis_tests.rs

use safe_expression::analysis::{get_inputs, is_literal};
use safe_expression::ast::{Expr, ExprKind, MemberProperty, Program, Purity};
use safe_expression::ExpressionParser;

fn analyze(input: &str) -> Program {
    ExpressionParser::new()
        .ast(input)
        .unwrap_or_else(|e| panic!("Failed to parse {:?}: {}", input, e))
        .program
}

fn root(program: &Program) -> &Expr {
    program.single_expression().expect("single statement")
}

/// Short label for a watched node.
fn label(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member {
            object,
            property: MemberProperty::Named(name),
            ..
        } => format!("{}.{}", label(object), name),
        ExprKind::Member { object, .. } => format!("{}[]", label(object)),
        ExprKind::Call { callee, .. } => format!("{}()", label(callee)),
        ExprKind::Logical { op, .. } => op.to_string(),
        ExprKind::Conditional { .. } => "?:".to_string(),
        ExprKind::Assignment { .. } => "=".to_string(),
        other => format!("{:?}", other),
    }
}

fn watched(input: &str) -> Vec<String> {
    let program = analyze(input);
    root(&program)
        .annotation
        .to_watch
        .iter()
        .map(|id| label(program.find(*id).expect("watched node exists")))
        .collect()
}

fn inputs(input: &str) -> Option<Vec<String>> {
    let program = analyze(input);
    get_inputs(&program).map(|ids| {
        ids.iter()
            .map(|id| label(program.find(*id).expect("input node exists")))
            .collect()
    })
}

// ============================================================================
// Constants
// ============================================================================

#[test]
fn test_constant_expressions() {
    let constant = vec![
        "1",
        "'a'",
        "true",
        "undefined",
        "-1",
        "1 + 2 * 3",
        "1 ? 2 : 3",
        "1 && 2",
        "[1, 'a']",
        "{a: 1, 'b': 2}",
        "{[1]: 2}",
        "[1][0]",
        "'abc'.length",
    ];
    for input in constant {
        let program = analyze(input);
        assert!(root(&program).annotation.constant, "Expected constant: {}", input);
        assert!(root(&program).annotation.to_watch.is_empty(), "Expected no watches: {}", input);
        assert!(program.constant, "Expected constant program: {}", input);
    }
}

#[test]
fn test_non_constant_expressions() {
    let non_constant = vec![
        "a",
        "a.b",
        "1 + a",
        "[1, a]",
        "{a: b}",
        "{[k]: 1}",
        "a ? 1 : 2",
        "f()",
        "f(1)",
        "a = 1",
        "[1][0] = 1",
        "this",
        "$locals",
    ];
    for input in non_constant {
        assert!(
            !root(&analyze(input)).annotation.constant,
            "Expected non-constant: {}",
            input
        );
    }
}

#[test]
fn test_program_constant_requires_every_statement() {
    assert!(analyze("").constant);
    assert!(analyze("1; 2").constant);
    assert!(!analyze("1; a").constant);
}

// ============================================================================
// Watch Sets
// ============================================================================

#[test]
fn test_watch_sets() {
    let test_cases: Vec<(&str, Vec<&str>)> = vec![
        ("a", vec!["a"]),
        ("a.b.c", vec!["a.b.c"]),
        ("a[b]", vec!["a[]"]),
        ("a + b.c", vec!["a", "b.c"]),
        ("-a", vec!["a"]),
        ("a * (b - c)", vec!["a", "b", "c"]),
        ("[a, 1, b]", vec!["a", "b"]),
        ("{x: a, [k]: b}", vec!["a", "b", "k"]),
        ("a && b", vec!["&&"]),
        ("a ? b : c", vec!["?:"]),
        ("f(a)", vec!["f()"]),
        ("a = b", vec!["="]),
        ("a.b() + c", vec!["a.b()", "c"]),
        ("this", vec![]),
        ("$locals.a + 1", vec!["Locals.a"]),
    ];

    for (input, expected) in test_cases {
        assert_eq!(watched(input), expected, "Failed for input: {}", input);
    }
}

// ============================================================================
// Purity
// ============================================================================

#[test]
fn test_purity() {
    let test_cases = vec![
        ("a", Purity::Relative),
        ("a.b", Purity::Relative),
        ("a[b]", Purity::Impure),
        ("f()", Purity::Impure),
        ("-a", Purity::Absolute),
        ("!a", Purity::Absolute),
        ("a * b", Purity::Absolute),
        ("a < b", Purity::Absolute),
        ("a + b", Purity::Impure),
        ("a ? b : c", Purity::Relative),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            root(&analyze(input)).annotation.purity,
            expected,
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_purity_is_inherited() {
    let program = analyze("a.b * c[d]");
    let ExprKind::Binary { left, right, .. } = &root(&program).kind else {
        panic!("expected binary expression");
    };
    assert_eq!(left.annotation.purity, Purity::Absolute);
    assert_eq!(right.annotation.purity, Purity::Impure);

    let program = analyze("{[k]: v}");
    let ExprKind::Object(properties) = &root(&program).kind else {
        panic!("expected object expression");
    };
    let safe_expression::ast::PropertyKey::Computed(key) = &properties[0].key else {
        panic!("expected computed key");
    };
    assert_eq!(key.annotation.purity, Purity::Impure);
    assert_eq!(properties[0].value.annotation.purity, Purity::Relative);
}

// ============================================================================
// Inputs and Literals
// ============================================================================

#[test]
fn test_inputs() {
    assert_eq!(inputs("a + b"), Some(vec!["a".to_string(), "b".to_string()]));
    assert_eq!(inputs("-a.b"), Some(vec!["a.b".to_string()]));
    assert_eq!(inputs("[f(), x]"), Some(vec!["f()".to_string(), "x".to_string()]));

    // The expression is its own single watch
    assert_eq!(inputs("a"), None);
    assert_eq!(inputs("a.b.c"), None);
    assert_eq!(inputs("f(x)"), None);
    assert_eq!(inputs("a ? b : c"), None);

    // Nothing to watch, or more than one statement
    assert_eq!(inputs("1 + 2"), None);
    assert_eq!(inputs("this"), None);
    assert_eq!(inputs(""), None);
    assert_eq!(inputs("a; b"), None);
}

#[test]
fn test_is_literal() {
    for input in ["", "1", "'a'", "null", "[a, b]", "{a: b}"] {
        assert!(is_literal(&analyze(input)), "Expected literal: {}", input);
    }
    for input in ["a", "-1", "1 + 2", "1; 2", "f()", "this"] {
        assert!(!is_literal(&analyze(input)), "Expected non-literal: {}", input);
    }
}
