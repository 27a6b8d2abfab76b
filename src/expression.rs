use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::debug;

use crate::{
    analysis,
    ast::{NodeId, Program, Purity},
    compiler::{Compiler, Frame, ValueFn},
    lexer::{LexError, Lexer},
    parser::{Parser, SyntaxError},
    value::{EvalError, Value},
};

/// Post-processing hook applied to every top-level evaluation result.
pub type Interceptor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Errors from compiling expression text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

#[derive(Clone, Default)]
pub struct ParseOptions {
    pub interceptor: Option<Interceptor>,
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("interceptor", &self.interceptor.is_some())
            .finish()
    }
}

/// An annotated program and whether its source carried the `::` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    pub program: Program,
    pub one_time: bool,
}

/// Compiles expression text.
///
/// # Examples
///
/// ```
/// use safe_expression::{ExpressionParser, Value};
///
/// let parser = ExpressionParser::new();
/// let expr = parser.parse("user?.address?.street").unwrap();
///
/// let scope = Value::object([("user", Value::Null)]);
/// assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::Undefined);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExpressionParser {
    options: ParseOptions,
}

impl ExpressionParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParseOptions) -> Self {
        ExpressionParser { options }
    }

    /// Parses and analyses `text` without compiling it.
    ///
    /// Surrounding whitespace is ignored and a leading `::` marks the
    /// expression as one-time; the rest parses as usual.
    pub fn ast(&self, text: &str) -> Result<ParsedExpression, CompileError> {
        let trimmed = text.trim();
        let (source, one_time) = match trimmed.strip_prefix("::") {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };

        let tokens = Lexer::new(source).tokenize()?;
        let mut program = Parser::from_tokens(source, tokens).parse()?;
        analysis::annotate(&mut program);
        Ok(ParsedExpression { program, one_time })
    }

    /// Compiles `text` into an evaluator.
    pub fn parse(&self, text: &str) -> Result<CompiledExpression, CompileError> {
        let ParsedExpression { program, one_time } = self.ast(text)?;

        let assign = analysis::assignable_ast(&program).map(|ast| Compiler::new().value(&ast));

        let plain = Compiler::new();
        let (inputs, compiler) = match analysis::get_inputs(&program) {
            Some(watched) => {
                let watched: Vec<(NodeId, Input)> = watched
                    .into_iter()
                    .filter_map(|id| program.find(id).map(|node| (id, node)))
                    .map(|(id, node)| {
                        let input = Input {
                            purity: node.annotation.purity,
                            evaluator: plain.value(node),
                        };
                        (id, input)
                    })
                    .collect();
                let compiler = Compiler::with_inputs(
                    watched
                        .iter()
                        .map(|(id, input)| (*id, input.evaluator.clone())),
                );
                let inputs: Vec<Input> = watched.into_iter().map(|(_, input)| input).collect();
                (Some(inputs), compiler)
            }
            None => (None, plain),
        };

        let compiled = CompiledExpression {
            source: text.trim().to_string(),
            evaluator: compiler.program(&program),
            assign,
            inputs,
            literal: analysis::is_literal(&program),
            constant: program.constant,
            one_time,
            interceptor: self.options.interceptor.clone(),
        };
        debug!(
            source = %compiled.source,
            literal = compiled.literal,
            constant = compiled.constant,
            one_time = compiled.one_time,
            assignable = compiled.assign.is_some(),
            inputs = compiled.inputs.as_ref().map_or(0, Vec::len),
            "compiled expression"
        );
        Ok(compiled)
    }
}

/// Compiles `text` with default options.
pub fn compile(text: &str) -> Result<CompiledExpression, CompileError> {
    ExpressionParser::new().parse(text)
}

pub fn compile_with(text: &str, options: &ParseOptions) -> Result<CompiledExpression, CompileError> {
    ExpressionParser::with_options(options.clone()).parse(text)
}

/// A compiled expression, ready to evaluate against any scope.
///
/// # Examples
///
/// ```
/// use safe_expression::{compile, Value};
///
/// let expr = compile("x.y.z = 123").unwrap();
/// let scope = Value::empty_object();
///
/// assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::from(123));
/// let x = scope.get_property("x");
/// assert_eq!(x.get_property("y").get_property("z"), Value::from(123));
/// ```
#[derive(Clone)]
pub struct CompiledExpression {
    source: String,
    evaluator: ValueFn,
    assign: Option<ValueFn>,
    inputs: Option<Vec<Input>>,
    literal: bool,
    constant: bool,
    one_time: bool,
    interceptor: Option<Interceptor>,
}

impl CompiledExpression {
    /// Evaluates against `scope`, with `locals` shadowing it.
    pub fn evaluate(&self, scope: &Value, locals: Option<&Value>) -> Result<Value, EvalError> {
        self.run(Frame::new(scope, locals))
    }

    /// Evaluates with `precomputed` standing in for the [`inputs`](Self::inputs),
    /// by position.
    pub fn evaluate_with_inputs(
        &self,
        scope: &Value,
        locals: Option<&Value>,
        precomputed: &[Value],
    ) -> Result<Value, EvalError> {
        self.run(Frame::new(scope, locals).with_inputs(precomputed))
    }

    fn run(&self, frame: Frame<'_>) -> Result<Value, EvalError> {
        let value = (self.evaluator)(&frame)?;
        Ok(match &self.interceptor {
            Some(intercept) => intercept(value),
            None => value,
        })
    }

    /// Writer for expressions that name a storable location.
    pub fn assign(&self) -> Option<Assigner<'_>> {
        self.assign.as_ref().map(|evaluator| Assigner { evaluator })
    }

    /// Sub-expressions whose values determine the result, if any were found.
    pub fn inputs(&self) -> Option<&[Input]> {
        self.inputs.as_deref()
    }

    /// Empty, or a single literal, array or object expression.
    pub fn literal(&self) -> bool {
        self.literal
    }

    /// Every part of the expression folds to a constant.
    pub fn constant(&self) -> bool {
        self.constant
    }

    /// The source started with `::`.
    pub fn one_time(&self) -> bool {
        self.one_time
    }

    /// Trimmed source text, including any `::` prefix.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .field("literal", &self.literal)
            .field("constant", &self.constant)
            .field("one_time", &self.one_time)
            .field("assignable", &self.assign.is_some())
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// Writes a value into the location an expression names.
pub struct Assigner<'a> {
    evaluator: &'a ValueFn,
}

impl Assigner<'_> {
    /// Stores `value`, creating missing intermediate objects, and returns it.
    pub fn assign(
        &self,
        scope: &Value,
        value: Value,
        locals: Option<&Value>,
    ) -> Result<Value, EvalError> {
        (self.evaluator)(&Frame::new(scope, locals).with_assign(&value))
    }
}

/// One watched sub-expression.
#[derive(Clone)]
pub struct Input {
    purity: Purity,
    evaluator: ValueFn,
}

impl Input {
    pub fn purity(&self) -> Purity {
        self.purity
    }

    pub fn evaluate(&self, scope: &Value, locals: Option<&Value>) -> Result<Value, EvalError> {
        (self.evaluator)(&Frame::new(scope, locals))
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input").field("purity", &self.purity).finish()
    }
}
