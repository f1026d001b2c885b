//! Tree-walking evaluation of parsed operations.
//!
//! Every operation evaluates against a context value. Variable paths push
//! the value they read from onto a chain of [`Frame`]s held by the
//! [`EvalContext`], which is what `..`, a leading `/` and the parent and
//! root lookup fallbacks walk. The chain lives on the call stack of one
//! evaluation, so concurrent evaluations of the same tree never see each
//! other's contexts.

use thiserror::Error;

use crate::{
    ast::{Operation, PartContent, QueryPart, TokenKind},
    convert::ConversionError,
    runtime::Runtime,
    value::Value,
};

mod classic;
mod method;
mod variable;

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    /// A failure inside an operation, carrying the operation's rendered text
    #[error("Could not perform operation: {expression}")]
    Operation {
        expression: String,
        #[source]
        source: Option<Box<EvaluationError>>,
    },

    #[error("The method '{name}' can not be resolved for {arity} arguments")]
    UnresolvedMethod { name: String, arity: usize },

    #[error("Invocation of '{name}' failed: {message}")]
    Invocation { name: String, message: String },

    #[error("Referencing an invalid context")]
    InvalidContext,

    #[error("The path can't end with '{0}'")]
    DanglingPathSegment(String),

    #[error("The index can not be null: {0}")]
    NullIndex(String),

    #[error("Invalid index '{value}' in: {expression}")]
    InvalidIndex { expression: String, value: String },

    #[error("Could not resolve key: {0}")]
    UnresolvedKey(String),

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid regular expression '{pattern}': {message}")]
    Regex { pattern: String, message: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// A failure reported by host code
    #[error("{0}")]
    Host(String),
}

impl EvaluationError {
    /// The innermost error, below every operation wrapper.
    pub fn root_cause(&self) -> &EvaluationError {
        match self {
            EvaluationError::Operation {
                source: Some(source),
                ..
            } => source.root_cause(),
            other => other,
        }
    }

    /// Attaches the failing operation's text, unless an inner operation already did.
    fn within(self, operation: &Operation) -> EvaluationError {
        match self {
            wrapped @ EvaluationError::Operation { .. } => wrapped,
            cause => EvaluationError::Operation {
                expression: operation.to_string(),
                source: Some(Box::new(cause)),
            },
        }
    }
}

/// Host-supplied operator semantics, consulted before the built-in ones.
pub trait OperatorExecutor: Send + Sync {
    fn supports(&self, left: &Value, operator: TokenKind, right: &Value) -> bool;

    fn calculate(
        &self,
        left: &Value,
        operator: TokenKind,
        right: &Value,
    ) -> Result<Value, EvaluationError>;
}

/// One level of the context chain.
#[derive(Debug)]
pub struct Frame<'a> {
    value: &'a Value,
    parent: Option<&'a Frame<'a>>,
    root: bool,
}

impl<'a> Frame<'a> {
    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn parent(&self) -> Option<&'a Frame<'a>> {
        self.parent
    }
}

/// Evaluation state: the runtime in use and the chain of enclosing contexts.
///
/// # Examples
///
/// Marking a root makes a leading `/` resolve against the next context
/// entered instead of the outermost one:
///
/// ```
/// use pathexpr::{EvalContext, Runtime, Value};
///
/// let outer = Value::object([("name", Value::from("outer"))]);
/// let inner = Value::object([("name", Value::from("inner"))]);
/// let absolute = pathexpr::parse("/name").unwrap();
/// let parent = pathexpr::parse("../name").unwrap();
///
/// let ctx = EvalContext::new(Runtime::global());
/// ctx.enter(&outer, |ctx| {
///     let mut module = *ctx;
///     module.register_root();
///     assert_eq!(absolute.evaluate_with(&inner, &module).unwrap(), Value::from("inner"));
///     assert_eq!(parent.evaluate_with(&inner, &module).unwrap(), Value::from("outer"));
/// });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    runtime: &'a Runtime,
    frame: Option<&'a Frame<'a>>,
    pending_root: bool,
}

impl<'a> EvalContext<'a> {
    pub fn new(runtime: &'a Runtime) -> Self {
        EvalContext {
            runtime,
            frame: None,
            pending_root: false,
        }
    }

    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// The innermost context, if any was entered.
    pub fn current(&self) -> Option<&'a Value> {
        self.frame.map(|frame| frame.value)
    }

    /// Number of entered contexts.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut frame = self.frame;
        while let Some(current) = frame {
            depth += 1;
            frame = current.parent;
        }
        depth
    }

    /// Runs `f` with `value` entered as the innermost context.
    pub fn enter<R>(&self, value: &Value, f: impl FnOnce(&EvalContext<'_>) -> R) -> R {
        let frame = Frame {
            value,
            parent: self.frame,
            root: self.pending_root,
        };
        let inner = EvalContext {
            runtime: self.runtime,
            frame: Some(&frame),
            pending_root: false,
        };
        f(&inner)
    }

    /// Makes the next entered context the root for absolute paths evaluated inside it.
    pub fn register_root(&mut self) {
        self.pending_root = true;
    }

    /// Withdraws a root registration that no context has been entered for yet.
    pub fn unregister_root(&mut self) {
        self.pending_root = false;
    }

    pub(crate) fn frame(&self) -> Option<&'a Frame<'a>> {
        self.frame
    }

    /// The nearest registered root, or the outermost context when none is registered.
    pub(crate) fn root_frame(&self) -> Option<&'a Frame<'a>> {
        let mut frame = self.frame?;
        loop {
            if frame.root {
                return Some(frame);
            }
            match frame.parent {
                Some(parent) => frame = parent,
                None => return Some(frame),
            }
        }
    }
}

impl Operation {
    /// Evaluates against `context` with the process-wide [`Runtime`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pathexpr::Value;
    ///
    /// let order = Value::object([
    ///     ("quantity", Value::Integer(3)),
    ///     ("price", Value::Float(2.5)),
    /// ]);
    /// let total = pathexpr::parse("price * quantity").unwrap();
    /// assert_eq!(total.evaluate(&order).unwrap(), Value::Float(7.5));
    /// ```
    pub fn evaluate(&self, context: &Value) -> Result<Value, EvaluationError> {
        self.evaluate_with(context, &EvalContext::new(Runtime::global()))
    }

    /// Evaluates against `context` inside an existing evaluation.
    pub fn evaluate_with(
        &self,
        context: &Value,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let result = match self {
            Operation::Native(native) => return Ok(native.value().clone()),
            Operation::Variable(variable) => variable.evaluate(context, ctx),
            Operation::Method(method) => method.evaluate(context, ctx),
            Operation::Classic(classic) => classic.evaluate(context, ctx),
        };
        result.map_err(|e| e.within(self))
    }
}

/// Value of an operand part: a literal, or the result of its operation.
pub(crate) fn evaluate_part(
    part: &QueryPart,
    context: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Value, EvaluationError> {
    match &part.content {
        PartContent::Literal(value) => Ok(value.clone()),
        PartContent::Operation(operation) => operation.evaluate_with(context, ctx)?.resolved(),
        PartContent::Empty => Ok(Value::Null),
        PartContent::Text(text) => Err(EvaluationError::Unsupported(format!(
            "unresolved {} token '{}'",
            part.kind, text
        ))),
    }
}
