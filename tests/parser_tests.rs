// tests/parser_tests.rs

use safe_expression::ast::{
    Expr, ExprKind, Literal, MemberProperty, Program, PropertyKey,
};
use safe_expression::parser::{Parser, SyntaxError};

fn parse(input: &str) -> Program {
    Parser::new(input)
        .unwrap()
        .parse()
        .unwrap_or_else(|e| panic!("Failed to parse {:?}: {}", input, e))
}

fn parse_err(input: &str) -> SyntaxError {
    match Parser::new(input).unwrap().parse() {
        Ok(program) => panic!("Expected error for {:?}, got {:?}", input, program),
        Err(e) => e,
    }
}

/// Renders a node as a compact s-expression, e.g. `(+ 1 (* 2 3))`.
fn sexp(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Assignment { left, right } => format!("(= {} {})", sexp(left), sexp(right)),
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => format!("(? {} {} {})", sexp(test), sexp(consequent), sexp(alternate)),
        ExprKind::Logical { op, left, right } => {
            format!("({} {} {})", op, sexp(left), sexp(right))
        }
        ExprKind::Binary { op, left, right } => format!("({} {} {})", op, sexp(left), sexp(right)),
        ExprKind::Unary { op, argument } => format!("({} {})", op, sexp(argument)),
        ExprKind::Call { callee, arguments } => {
            let mut parts = vec![sexp(callee)];
            parts.extend(arguments.iter().map(sexp));
            format!("(call {})", parts.join(" "))
        }
        ExprKind::Member {
            object,
            property,
            optional,
        } => {
            let dot = if *optional { "?." } else { "." };
            match property {
                MemberProperty::Named(name) => format!("({} {} {})", dot, sexp(object), name),
                MemberProperty::Computed(key) => {
                    format!("({}[] {} {})", dot, sexp(object), sexp(key))
                }
            }
        }
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Literal(Literal::Undefined) => "undefined".to_string(),
        ExprKind::Literal(Literal::Null) => "null".to_string(),
        ExprKind::Literal(Literal::Boolean(b)) => b.to_string(),
        ExprKind::Literal(Literal::Number(n)) => n.to_string(),
        ExprKind::Literal(Literal::String(s)) => format!("{:?}", s),
        ExprKind::Array(elements) => {
            let parts: Vec<String> = elements.iter().map(sexp).collect();
            format!("[{}]", parts.join(" "))
        }
        ExprKind::Object(properties) => {
            let parts: Vec<String> = properties
                .iter()
                .map(|property| {
                    let key = match &property.key {
                        PropertyKey::Identifier(name) => name.clone(),
                        PropertyKey::Literal(Literal::String(s)) => format!("{:?}", s),
                        PropertyKey::Literal(Literal::Number(n)) => n.to_string(),
                        PropertyKey::Literal(other) => format!("{:?}", other),
                        PropertyKey::Computed(key) => format!("[{}]", sexp(key)),
                    };
                    format!("{}: {}", key, sexp(&property.value))
                })
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        ExprKind::This => "this".to_string(),
        ExprKind::Locals => "$locals".to_string(),
        ExprKind::ValueParameter => "$value".to_string(),
    }
}

fn single(input: &str) -> String {
    let program = parse(input);
    let expr = program
        .single_expression()
        .unwrap_or_else(|| panic!("Expected one statement for {:?}", input));
    sexp(expr)
}

// ============================================================================
// Literals and Primaries
// ============================================================================

#[test]
fn test_literals() {
    let test_cases = vec![
        ("1", "1"),
        ("1.5", "1.5"),
        ("'a'", "\"a\""),
        ("true", "true"),
        ("false", "false"),
        ("null", "null"),
        ("undefined", "undefined"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_self_referential_keywords() {
    assert_eq!(single("this"), "this");
    assert_eq!(single("$locals"), "$locals");
    assert_eq!(single("$locals.a"), "(. $locals a)");

    let program = parse("this; this");
    let first = &program.body[0].expression;
    let second = &program.body[1].expression;
    assert_eq!(first.kind, ExprKind::This);
    assert_ne!(first.id, second.id);
}

#[test]
fn test_arrays() {
    let test_cases = vec![
        ("[]", "[]"),
        ("[1]", "[1]"),
        ("[1, a, 'b']", "[1 a \"b\"]"),
        ("[1, 2,]", "[1 2]"),
        ("[[1], [2]]", "[[1] [2]]"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_objects() {
    let test_cases = vec![
        ("{}", "{}"),
        ("{a: 1}", "{a: 1}"),
        ("{a: 1, b: 2,}", "{a: 1, b: 2}"),
        ("{'a b': 1}", "{\"a b\": 1}"),
        ("{1: 'x'}", "{1: \"x\"}"),
        ("{[k]: v}", "{[k]: v}"),
        ("{a}", "{a: a}"),
        ("{a, b: c}", "{a: a, b: c}"),
        ("{true: 1}", "{true: 1}"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_parentheses() {
    assert_eq!(single("(1)"), "1");
    assert_eq!(single("(1 + 2) * 3"), "(* (+ 1 2) 3)");
    assert_eq!(single("((a))"), "a");
}

// ============================================================================
// Operators and Precedence
// ============================================================================

#[test]
fn test_binary_precedence() {
    let test_cases = vec![
        ("1 + 2 * 3", "(+ 1 (* 2 3))"),
        ("1 * 2 + 3", "(+ (* 1 2) 3)"),
        ("1 - 2 - 3", "(- (- 1 2) 3)"),
        ("1 / 2 * 3", "(* (/ 1 2) 3)"),
        ("a % b", "(% a b)"),
        ("1 < 2 == true", "(== (< 1 2) true)"),
        ("a === b !== c", "(!== (=== a b) c)"),
        ("3 >= 3 > 2", "(> (>= 3 3) 2)"),
        ("a || b && c", "(|| a (&& b c))"),
        ("a && b || c", "(|| (&& a b) c)"),
        ("a == b && c != d", "(&& (== a b) (!= c d))"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_unary() {
    let test_cases = vec![
        ("-1", "(- 1)"),
        ("+a", "(+ a)"),
        ("!a", "(! a)"),
        ("!!a", "(! (! a))"),
        ("-a * b", "(* (- a) b)"),
        ("0--1", "(- 0 (- 1))"),
        ("-a.b", "(- (. a b))"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_ternary_is_right_associative() {
    let test_cases = vec![
        ("a ? b : c", "(? a b c)"),
        ("a ? b : c ? d : e", "(? a b (? c d e))"),
        ("a ? b ? c : d : e", "(? a (? b c d) e)"),
        ("a && b ? c : d", "(? (&& a b) c d)"),
        ("a ? b || c : d", "(? a (|| b c) d)"),
        ("a?.5:1", "(? a 0.5 1)"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_assignment() {
    let test_cases = vec![
        ("a = 1", "(= a 1)"),
        ("a.b = c", "(= (. a b) c)"),
        ("a[0] = 1", "(= (.[] a 0) 1)"),
        ("a = b = 1", "(= a (= b 1))"),
        ("a = b ? c : d", "(= a (? b c d))"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

// ============================================================================
// Member Access and Calls
// ============================================================================

#[test]
fn test_member_chains() {
    let test_cases = vec![
        ("a.b", "(. a b)"),
        ("a.b.c", "(. (. a b) c)"),
        ("a[b]", "(.[] a b)"),
        ("a['b'].c", "(. (.[] a \"b\") c)"),
        ("a . b", "(. a b)"),
        ("a.this", "(. a this)"),
        ("a?.b", "(?. a b)"),
        ("a?.['b']", "(?.[] a \"b\")"),
        ("a?.b.c", "(. (?. a b) c)"),
        ("[1][0]", "(.[] [1] 0)"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_calls() {
    let test_cases = vec![
        ("f()", "(call f)"),
        ("f(1)", "(call f 1)"),
        ("f(1, a + b)", "(call f 1 (+ a b))"),
        ("a.b(c)", "(call (. a b) c)"),
        ("f()()", "(call (call f))"),
        ("f().x", "(. (call f) x)"),
        ("a?.b()", "(call (?. a b))"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(single(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_deep_member_chain() {
    assert_eq!(
        single("a.b.c.d.e.f.g.h.i.j.k.l.m.n"),
        "(. (. (. (. (. (. (. (. (. (. (. (. (. a b) c) d) e) f) g) h) i) j) k) l) m) n)"
    );
}

// ============================================================================
// Programs
// ============================================================================

#[test]
fn test_statements() {
    let program = parse("a = 1; b = a + 1");
    let rendered: Vec<String> = program.body.iter().map(|s| sexp(&s.expression)).collect();
    assert_eq!(rendered, vec!["(= a 1)", "(= b (+ a 1))"]);

    assert_eq!(parse("a;").body.len(), 1);
    assert_eq!(parse("a;;b").body.len(), 2);
    assert!(parse("").body.is_empty());
    assert!(parse(";").body.is_empty());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_non_assignable_target() {
    for input in ["1 = 2", "a + b = c", "f() = 1", "a?.b = 1", "this = 1", "[a] = 1"] {
        assert!(
            matches!(parse_err(input), SyntaxError::NonAssignableTarget { .. }),
            "Failed for input: {}",
            input
        );
    }

    let err = parse_err("1 = 2");
    assert_eq!(err, SyntaxError::NonAssignableTarget {
        index: 2,
        expression: "1 = 2".to_string(),
    });
}

#[test]
fn test_unexpected_end_of_expression() {
    for input in ["a .", "a +", "f(", "[1,", "{a:", "a ? b", "a ? b :", "(a"] {
        assert!(
            matches!(parse_err(input), SyntaxError::UnexpectedEndOfExpression { .. }),
            "Failed for input: {}",
            input
        );
    }

    assert_eq!(parse_err("a .").to_string(), "Unexpected end of expression: a .");
}

#[test]
fn test_unexpected_token() {
    let err = parse_err("a b");
    match &err {
        SyntaxError::UnexpectedToken {
            token,
            index,
            expected,
            ..
        } => {
            assert_eq!(token, "b");
            assert_eq!(*index, 2);
            assert_eq!(expected, "end of expression");
        }
        other => panic!("Expected UnexpectedToken, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "Syntax Error: Token 'b' is unexpected, expecting end of expression at column 3 of the expression [a b] starting at [b]"
    );

    let test_cases = vec![
        ("a ? b c", "c", "[:]"),
        ("a.1", "1", "an identifier"),
        ("(a b)", "b", "[)]"),
        ("1 + )", ")", "a primary expression"),
        ("a)", ")", "end of expression"),
        ("{'a' 1}", "1", "[:]"),
    ];
    for (input, bad_token, expectation) in test_cases {
        match parse_err(input) {
            SyntaxError::UnexpectedToken {
                token, expected, ..
            } => {
                assert_eq!(token, bad_token, "Failed for input: {}", input);
                assert_eq!(expected, expectation, "Failed for input: {}", input);
            }
            other => panic!("Expected UnexpectedToken for {}, got {:?}", input, other),
        }
    }
}

#[test]
fn test_invalid_object_key() {
    for input in ["{+: 1}", "{(a): 1}", "{,}"] {
        assert!(
            matches!(parse_err(input), SyntaxError::InvalidObjectKey { .. }),
            "Failed for input: {}",
            input
        );
    }
}
