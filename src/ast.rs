//! # Expression tree
//!
//! This module defines the parts and nodes the parser produces.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Token kinds shared by the lexer, the analyzer and the tree
//! - **[operators]** - Precedence tiers and the scan direction of each tier
//! - **[parts]** - Query parts: typed, value-carrying units of an expression
//! - **[operations]** - The four node variants and their rendering
//!
//! ## Core Concepts
//!
//! ### Operations
//!
//! Every expression parses to a single [`Operation`]:
//!
//! - **Native** - a literal: `42`, `"text"`, `1.5b`, `[1, 2]`
//! - **Variable** - a path through the context: `order/lines[0]/price`
//! - **Method** - a call: `substring(name, 1)`, `date.now()`
//! - **Classic** - an operator with its operands: `a + b`, `!done`
//!
//! ### Precedence
//!
//! From loosest to tightest binding:
//!
//! ```text
//! 0   :  or ||
//! 1   and &&
//! 2   |
//! 3   ^  !^
//! 4   &
//! 5   == = != ~ !~ in # not in !# >= > <= <
//! 6   +  -
//! 7   *  /  ÷  %
//! 8   **
//! 9   ++ -- !
//! 10  °
//! ```
//!
//! ### Rendering
//!
//! Operations render back to source text. Parentheses are derived from
//! precedence, not preserved from the input:
//!
//! ```text
//! 1*2+3*4        renders as   (1 * 2) + (3 * 4)
//! 0+1+-2+3*-1    renders as   0 + 1 + -2 + (3 * -1)
//! 5-(2+3)        renders as   5 - (2 + 3)
//! ```
pub mod operations;
pub mod operators;
pub mod parts;
pub mod tokens;

pub use operations::{
    ClassicOperation, MethodOperation, MethodTarget, NativeOperation, Operation, OperationKind,
    PathSegment, VariableOperation,
};
pub use operators::{MAX_PRECEDENCE, ScanDirection, scan_direction};
pub use parts::{PartContent, QueryPart};
pub use tokens::TokenKind;
