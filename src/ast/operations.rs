use std::{fmt, sync::Arc};

use super::{
    PartContent, QueryPart, TokenKind,
    operators::is_reversed_tier,
    parts::literal_eq,
};
use crate::{output, value::Value};

/// A node of the expression tree.
///
/// Trees are immutable once the analyzer has built them and are shared
/// behind [`Arc`], so one parsed expression can be evaluated concurrently
/// against any number of contexts.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// "text"
    /// [1, 2, 3]
    /// ```
    Native(NativeOperation),

    /// A path through the context, with optional index and filter steps
    ///
    /// # Examples
    /// ```text
    /// order/lines
    /// ../name
    /// items[0]/price
    /// items[k == 'x']
    /// ```
    Variable(VariableOperation),

    /// A call to a registered method
    ///
    /// # Examples
    /// ```text
    /// substring(name, 1)
    /// date.now()
    /// ```
    Method(MethodOperation),

    /// An operator applied to one or two operands
    ///
    /// # Examples
    /// ```text
    /// a + b
    /// !done
    /// count ++
    /// ```
    Classic(ClassicOperation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Native,
    Variable,
    Method,
    Classic,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Native(_) => OperationKind::Native,
            Operation::Variable(_) => OperationKind::Variable,
            Operation::Method(_) => OperationKind::Method,
            Operation::Classic(_) => OperationKind::Classic,
        }
    }

    pub fn as_classic(&self) -> Option<&ClassicOperation> {
        match self {
            Operation::Classic(classic) => Some(classic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NativeOperation {
    value: Value,
}

impl NativeOperation {
    pub fn new(value: Value) -> Self {
        NativeOperation { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialEq for NativeOperation {
    fn eq(&self, other: &Self) -> bool {
        literal_eq(&self.value, &other.value)
    }
}

/// One step of a [`VariableOperation`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// A named member, `..`, `.`, `$this` or `$N`; a leading `/` marks a root-relative path
    Name(String),
    /// An index or filter, or the receiver when it is the first segment
    Operation(Arc<Operation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableOperation {
    segments: Vec<PathSegment>,
}

impl VariableOperation {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        VariableOperation { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

/// What a [`MethodOperation`] calls.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodTarget {
    /// A method name, possibly namespaced as `namespace.method`
    Name(String),
    /// An expression evaluating to a method name or a function value
    Operation(Arc<Operation>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodOperation {
    target: MethodTarget,
    arguments: Vec<Arc<Operation>>,
}

impl MethodOperation {
    pub fn new(target: MethodTarget, arguments: Vec<Arc<Operation>>) -> Self {
        MethodOperation { target, arguments }
    }

    pub fn target(&self) -> &MethodTarget {
        &self.target
    }

    pub fn arguments(&self) -> &[Arc<Operation>] {
        &self.arguments
    }
}

/// An operator with its operands.
///
/// Operands are literal parts or resolved operations. Which operands are
/// present follows the operator: `++` and `--` only take a left operand,
/// `!` only a right one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicOperation {
    left: Option<QueryPart>,
    operator: QueryPart,
    right: Option<QueryPart>,
}

impl ClassicOperation {
    pub fn new(left: Option<QueryPart>, operator: QueryPart, right: Option<QueryPart>) -> Self {
        ClassicOperation {
            left,
            operator,
            right,
        }
    }

    pub fn operator(&self) -> TokenKind {
        self.operator.kind
    }

    /// Spelling of the operator as parsed, e.g. `and` or `&&`.
    pub fn operator_text(&self) -> String {
        self.operator.render()
    }

    pub fn left(&self) -> Option<&QueryPart> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&QueryPart> {
        self.right.as_ref()
    }

    pub fn precedence(&self) -> u8 {
        self.operator.kind.precedence().unwrap_or(0)
    }

    fn render_operand(&self, f: &mut fmt::Formatter<'_>, part: &QueryPart, leading: bool) -> fmt::Result {
        let PartContent::Operation(op) = &part.content else {
            return f.write_str(&part.render());
        };
        let Operation::Classic(inner) = op.as_ref() else {
            return write!(f, "{}", op);
        };

        let own = self.precedence();
        let other = inner.precedence();
        let named =
            self.operator.kind == TokenKind::Naming || inner.operator.kind == TokenKind::Naming;

        let parenthesize = if !named && own != other {
            true
        } else {
            !leading && !is_reversed_tier(other)
        };
        if parenthesize {
            write!(f, "({})", inner)
        } else {
            write!(f, "{}", inner)
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Native(native) => f.write_str(&output::to_literal(&native.value)),
            Operation::Variable(variable) => write!(f, "{}", variable),
            Operation::Method(method) => write!(f, "{}", method),
            Operation::Classic(classic) => write!(f, "{}", classic),
        }
    }
}

impl fmt::Display for VariableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Name(name) if i > 0 && !name.starts_with('/') => {
                    write!(f, "/{}", name)?
                }
                PathSegment::Name(name) => f.write_str(name)?,
                PathSegment::Operation(op) if i == 0 => write!(f, "{}", op)?,
                PathSegment::Operation(op) => write!(f, "[{}]", op)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for MethodOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            MethodTarget::Name(name) => f.write_str(name)?,
            MethodTarget::Operation(op) => write!(f, "{}", op)?,
        }
        f.write_str("(")?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", argument)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for ClassicOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(left) = &self.left {
            self.render_operand(f, left, true)?;
            f.write_str(" ")?;
        }
        f.write_str(&self.operator.render())?;
        if let Some(right) = &self.right {
            f.write_str(" ")?;
            self.render_operand(f, right, false)?;
        }
        Ok(())
    }
}
