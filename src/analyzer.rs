//! Path analyzer: turns the flat part sequence into one operation tree.
//!
//! Analysis works on a [`TokenList`] in two passes per range:
//!
//! 1. A structural pass, left to right, folds nested scopes, method calls,
//!    list literals and variable paths (with their index and filter steps)
//!    into single `Operation` parts. Nested ranges are analyzed recursively
//!    and stop at the `)`, `,` or `]` that closes them.
//! 2. An operator pass per precedence tier, from the tightest tier down to
//!    0, folds each operator with its neighbours into a classic operation.
//!    Most tiers scan left to right so `a - b + c` nests as `(a - b) + c`;
//!    the logical and xor tiers scan right to left so chained `and`/`or`
//!    short-circuit from the left.

use std::sync::Arc;

use tracing::trace;

use crate::{
    ast::{
        ClassicOperation, MethodOperation, MethodTarget, NativeOperation, Operation, PartContent,
        PathSegment, QueryPart, ScanDirection, TokenKind, VariableOperation, MAX_PRECEDENCE,
        scan_direction,
    },
    parser::ParseError,
    token_list::{NodeId, TokenList},
    value::Value,
};

/// Name of the core method that builds a list from evaluated elements.
pub const LIST_METHOD: &str = "list";

pub struct PathAnalyzer {
    list: TokenList,
}

impl PathAnalyzer {
    pub fn new(parts: Vec<QueryPart>) -> Self {
        PathAnalyzer {
            list: TokenList::from_parts(parts),
        }
    }

    /// Analyzes the whole sequence into its root operation.
    ///
    /// Separators outside any scope only get here when the parser allows
    /// them; the separated expressions then form a list.
    pub fn analyze(mut self) -> Result<Arc<Operation>, ParseError> {
        let mut elements = Vec::new();
        let mut start = self.list.head();
        loop {
            let element = self
                .analyze_range(start)?
                .ok_or(ParseError::EmptyExpression)?;
            elements.push(element);
            match self.first_separator() {
                Some(separator) => start = self.list.remove(separator),
                None => break,
            }
        }

        let remaining = self.list.parts();
        if remaining.len() > elements.len() {
            return Err(ParseError::DanglingToken(remaining[elements.len()].render()));
        }
        if elements.len() == 1 {
            Ok(elements.remove(0))
        } else {
            Ok(Arc::new(list_literal(elements)))
        }
    }

    fn first_separator(&self) -> Option<NodeId> {
        let mut cursor = self.list.head();
        while let Some(id) = cursor {
            if self.list.part(id).kind == TokenKind::Separator {
                return Some(id);
            }
            cursor = self.list.next(id);
        }
        None
    }

    /// Analyzes the range starting at `start` up to the token that closes it.
    fn analyze_range(&mut self, start: Option<NodeId>) -> Result<Option<Arc<Operation>>, ParseError> {
        let Some(mut start) = start else {
            return Ok(None);
        };
        let mut last: Option<Arc<Operation>> = None;
        let mut stop: Option<NodeId> = None;
        let mut cursor = Some(start);

        while let Some(token) = cursor {
            let is_start = token == start;
            let mut inserted_before = None;
            let part = self.list.part(token);

            match part.kind {
                kind if kind.is_range_end() => {
                    stop = Some(token);
                    break;
                }
                TokenKind::ScopeStart => {
                    let child = self.analyze_range(self.list.next(token))?;
                    inserted_before = Some(self.list.insert_before(
                        token,
                        QueryPart::operation(TokenKind::Operation, child.clone()),
                    ));
                    // the scope start, the child and the scope stop
                    let mut at = self.list.remove(token);
                    if child.is_some() {
                        at = at.and_then(|id| self.list.remove(id));
                    }
                    cursor = at.and_then(|id| self.list.remove(id));
                    last = child;
                }
                TokenKind::Method => {
                    let target = match &part.content {
                        PartContent::Operation(op) => MethodTarget::Operation(op.clone()),
                        _ => MethodTarget::Name(part.render()),
                    };
                    let opener = self.list.remove(token);
                    let (arguments, after) = self.collect_arguments(opener, &target)?;
                    let method = Arc::new(Operation::Method(MethodOperation::new(target, arguments)));
                    let (next_cursor, inserted) = self.splice(after, method.clone(), true);
                    cursor = next_cursor;
                    inserted_before = inserted;
                    last = Some(method);
                }
                TokenKind::IndexStart => {
                    let (elements, after) = self.collect_elements(token)?;
                    let literal = Arc::new(list_literal(elements));
                    let (next_cursor, inserted) = self.splice(after, literal.clone(), false);
                    cursor = next_cursor;
                    inserted_before = inserted;
                    last = Some(literal);
                }
                TokenKind::Variable => {
                    let mut segments = Vec::new();

                    // a path right after a call reads from the call result
                    if let Some(Operation::Method(_)) = last.as_deref()
                        && let Some(prev) = self.list.prev(token)
                        && let Some(op) = self.list.part(prev).as_operation()
                        && last.as_ref().is_some_and(|l| Arc::ptr_eq(l, op))
                    {
                        segments.push(PathSegment::Operation(op.clone()));
                        self.list.remove(prev);
                    }

                    let mut at = Some(token);
                    while let Some(id) = at {
                        let part = self.list.part(id);
                        match part.kind {
                            TokenKind::Variable => {
                                segments.extend(split_path(&part.render()));
                                at = self.list.remove(id);
                            }
                            TokenKind::IndexStart => {
                                let (index, after) = self.collect_index(id, &segments)?;
                                segments.push(PathSegment::Operation(index));
                                at = after;
                            }
                            _ => break,
                        }
                    }

                    let variable = Arc::new(Operation::Variable(VariableOperation::new(segments)));
                    let (next_cursor, inserted) = self.splice(at, variable.clone(), true);
                    cursor = next_cursor;
                    inserted_before = inserted;
                    if inserted_before.is_some() || next_cursor.is_none() {
                        last = Some(variable);
                    }
                }
                _ => cursor = self.list.next(token),
            }

            if is_start && let Some(inserted) = inserted_before {
                start = inserted;
            }
        }

        for tier in (0..=MAX_PRECEDENCE).rev() {
            let from = self.list.normalize(start);
            let resolved = match scan_direction(tier) {
                ScanDirection::Reverse => self.resolve_reverse(tier, from, stop)?,
                ScanDirection::Forward => self.resolve_forward(tier, from, stop)?,
            };
            if resolved.is_some() {
                trace!(tier, "resolved operator tier");
                last = resolved;
            }
        }
        Ok(last)
    }

    /// Puts a folded operation back into the list in front of `at`.
    ///
    /// When `at` opens another scope and `callable` is set, the operation is
    /// re-emitted as a method token so the scope becomes its call. Returns
    /// the cursor to continue from and the node inserted before `at`, if any.
    /// Without `at` the scan reached the end of the list and the operation
    /// is appended.
    fn splice(
        &mut self,
        at: Option<NodeId>,
        operation: Arc<Operation>,
        callable: bool,
    ) -> (Option<NodeId>, Option<NodeId>) {
        match at {
            Some(id) if callable && self.list.part(id).kind == TokenKind::ScopeStart => {
                let method = QueryPart::operation(TokenKind::Method, Some(operation));
                (Some(self.list.insert_before(id, method)), None)
            }
            Some(id) => {
                let part = QueryPart::operation(TokenKind::Operation, Some(operation));
                let inserted = self.list.insert_before(id, part);
                (Some(id), Some(inserted))
            }
            None => {
                self.list
                    .push_back(QueryPart::operation(TokenKind::Operation, Some(operation)));
                (None, None)
            }
        }
    }

    /// Collects the arguments of a call whose `(` is at `opener`.
    ///
    /// Returns the arguments and the node after the closing `)`.
    fn collect_arguments(
        &mut self,
        opener: Option<NodeId>,
        target: &MethodTarget,
    ) -> Result<(Vec<Arc<Operation>>, Option<NodeId>), ParseError> {
        let name = || match target {
            MethodTarget::Name(name) => name.clone(),
            MethodTarget::Operation(op) => op.to_string(),
        };
        let mut token = opener.ok_or_else(|| ParseError::MissingMethodEnd(name()))?;
        let mut arguments = Vec::new();

        let empty_call = self
            .list
            .next(token)
            .is_some_and(|next| self.list.part(next).kind == TokenKind::ScopeStop);
        if empty_call {
            token = self
                .list
                .remove(token)
                .ok_or_else(|| ParseError::MissingMethodEnd(name()))?;
        } else {
            while self.list.part(token).kind != TokenKind::ScopeStop {
                let argument = self.analyze_range(self.list.next(token))?;
                // the `(` or `,` in front of the argument, then the argument itself
                let after = self.list.remove(token);
                let argument = argument.ok_or_else(|| ParseError::EmptyArgument(name()))?;
                token = after
                    .and_then(|id| self.list.remove(id))
                    .ok_or_else(|| ParseError::MissingMethodEnd(name()))?;
                arguments.push(argument);
                self.expect_closer(token, TokenKind::ScopeStop)?;
            }
        }
        Ok((arguments, self.list.remove(token)))
    }

    /// Collects the comma separated elements of a list literal at `opener`.
    fn collect_elements(
        &mut self,
        opener: NodeId,
    ) -> Result<(Vec<Arc<Operation>>, Option<NodeId>), ParseError> {
        let mut token = opener;
        let mut elements = Vec::new();

        let empty = self
            .list
            .next(token)
            .is_some_and(|next| self.list.part(next).kind == TokenKind::IndexStop);
        if empty {
            token = self.list.remove(token).ok_or(ParseError::UnclosedIndexes(1))?;
        } else {
            while self.list.part(token).kind != TokenKind::IndexStop {
                let element = self.analyze_range(self.list.next(token))?;
                let after = self.list.remove(token);
                let element = element.ok_or(ParseError::EmptyElement)?;
                token = after
                    .and_then(|id| self.list.remove(id))
                    .ok_or(ParseError::UnclosedIndexes(1))?;
                elements.push(element);
                self.expect_closer(token, TokenKind::IndexStop)?;
            }
        }
        Ok((elements, self.list.remove(token)))
    }

    /// Analyzes the index or filter opened at `opener`.
    ///
    /// Returns the index operation and the node after the closing `]`.
    fn collect_index(
        &mut self,
        opener: NodeId,
        segments: &[PathSegment],
    ) -> Result<(Arc<Operation>, Option<NodeId>), ParseError> {
        let path = || VariableOperation::new(segments.to_vec()).to_string();
        let index = self.analyze_range(self.list.next(opener))?;
        let after = self.list.remove(opener);
        let index = index.ok_or_else(|| ParseError::EmptyIndex(path()))?;
        let closer = after
            .and_then(|id| self.list.remove(id))
            .ok_or_else(|| ParseError::MissingIndexEnd(path()))?;
        if self.list.part(closer).kind != TokenKind::IndexStop {
            return Err(ParseError::DanglingToken(self.list.part(closer).render()));
        }
        Ok((index, self.list.remove(closer)))
    }

    /// After a folded argument or element only `,` or the closer may follow.
    fn expect_closer(&self, token: NodeId, closer: TokenKind) -> Result<(), ParseError> {
        let kind = self.list.part(token).kind;
        if kind == closer || kind == TokenKind::Separator {
            Ok(())
        } else {
            Err(ParseError::DanglingToken(self.list.part(token).render()))
        }
    }

    /// Walks from `from` to the last node reachable through next links.
    fn last_from(&self, from: NodeId) -> Option<NodeId> {
        let mut current = from;
        while let Some(next) = self.list.next(current) {
            current = next;
        }
        Some(current)
    }

    /// An operand may be a literal or an already folded operation.
    fn operand(&self, id: Option<NodeId>) -> Option<QueryPart> {
        let part = self.list.part(id?);
        (part.kind.is_native() || part.kind == TokenKind::Operation).then(|| part.clone())
    }

    fn fold(&mut self, tier: u8, token: NodeId) -> Result<(ClassicOperation, Option<NodeId>, Option<NodeId>), ParseError> {
        let operator = self.list.part(token).clone();
        let kind = operator.kind;

        let left = if kind.has_left_operand() {
            let prev = self.list.prev(token);
            let part = self
                .operand(prev)
                .ok_or_else(|| ParseError::MissingLeftOperand(operator.render()))?;
            Some((part, prev))
        } else {
            None
        };
        let right = if kind.has_right_operand() {
            let next = self.list.next(token);
            let part = self
                .operand(next)
                .ok_or_else(|| ParseError::MissingRightOperand(operator.render()))?;
            Some((part, next))
        } else {
            None
        };
        trace!(tier, operator = %operator.render(), "folding operator");

        let left_id = left.as_ref().and_then(|(_, id)| *id);
        let right_id = right.as_ref().and_then(|(_, id)| *id);
        let classic = ClassicOperation::new(
            left.map(|(part, _)| part),
            operator,
            right.map(|(part, _)| part),
        );
        Ok((classic, left_id, right_id))
    }

    fn check_tier(&self, tier: u8, token: NodeId) -> Result<Option<u8>, ParseError> {
        let part = self.list.part(token);
        match part.kind.precedence() {
            Some(found) if found > tier => Err(ParseError::PrecedenceViolation {
                operator: part.render(),
                found,
                expected: tier,
            }),
            other => Ok(other),
        }
    }

    fn resolve_forward(
        &mut self,
        tier: u8,
        start: Option<NodeId>,
        stop: Option<NodeId>,
    ) -> Result<Option<Arc<Operation>>, ParseError> {
        let mut cursor = start;
        let mut last: Option<Arc<Operation>> = None;

        while let Some(token) = cursor {
            let kind = self.list.part(token).kind;
            if kind.is_range_end() || Some(token) == stop {
                break;
            }

            if let Some(precedence) = self.check_tier(tier, token)? {
                if precedence < tier {
                    cursor = self.list.next(token);
                    last = None;
                    continue;
                }
                let (classic, left, right) = self.fold(tier, token)?;
                for id in [left, right].into_iter().flatten() {
                    self.list.remove(id);
                }
                let operation = Arc::new(Operation::Classic(classic));
                self.list.insert_before(
                    token,
                    QueryPart::operation(TokenKind::Operation, Some(operation.clone())),
                );
                cursor = self.list.remove(token);
                last = Some(operation);
            } else {
                last = self.visit_operand(token, last, self.list.prev(token))?;
                cursor = self.list.next(token);
            }
        }
        Ok(last)
    }

    fn resolve_reverse(
        &mut self,
        tier: u8,
        start: Option<NodeId>,
        stop: Option<NodeId>,
    ) -> Result<Option<Arc<Operation>>, ParseError> {
        let mut cursor = match (stop, start) {
            (Some(stop), _) => self.list.prev(stop),
            (None, Some(start)) => self.last_from(start),
            (None, None) => None,
        };
        let mut last: Option<Arc<Operation>> = None;

        while let Some(token) = cursor {
            let kind = self.list.part(token).kind;
            if kind.is_range_start() {
                break;
            }
            // no further back than the start
            if let Some(start) = start
                && self.list.prev(start) == Some(token)
            {
                break;
            }

            if let Some(precedence) = self.check_tier(tier, token)? {
                if precedence < tier {
                    cursor = self.list.prev(token);
                    last = None;
                    continue;
                }
                let (classic, left, right) = self.fold(tier, token)?;
                for id in [left, right].into_iter().flatten() {
                    self.list.remove(id);
                }
                let operation = Arc::new(Operation::Classic(classic));
                self.list.insert_after(
                    token,
                    QueryPart::operation(TokenKind::Operation, Some(operation.clone())),
                );
                cursor = self.list.remove_in_reverse(token);
                last = Some(operation);
            } else {
                last = self.visit_operand(token, last, self.list.next(token))?;
                cursor = self.list.prev(token);
            }
        }
        Ok(last)
    }

    /// Handles a non-operator token during an operator pass.
    ///
    /// `neighbour` is the token visited just before this one, used to spot
    /// two operations with no operator between them.
    fn visit_operand(
        &self,
        token: NodeId,
        last: Option<Arc<Operation>>,
        neighbour: Option<NodeId>,
    ) -> Result<Option<Arc<Operation>>, ParseError> {
        let part = self.list.part(token);
        match &part.content {
            PartContent::Operation(op) if part.kind == TokenKind::Operation => {
                if let Some(last) = &last
                    && let Some(neighbour) = neighbour
                    && let Some(adjacent) = self.list.part(neighbour).as_operation()
                    && Arc::ptr_eq(last, adjacent)
                {
                    return Err(ParseError::DanglingToken(part.render()));
                }
                Ok(Some(op.clone()))
            }
            PartContent::Empty if part.kind == TokenKind::Operation => Ok(None),
            _ if !part.kind.is_native() => Err(ParseError::UnresolvedToken {
                kind: part.kind,
                text: part.render(),
            }),
            _ => {
                if let Some(previous) = &last
                    && previous.as_classic().is_some()
                {
                    return Err(ParseError::UnexpectedOperand {
                        operation: previous.to_string(),
                        operand: part.render(),
                    });
                }
                let value = part.as_literal().cloned().unwrap_or(Value::Null);
                Ok(Some(Arc::new(Operation::Native(NativeOperation::new(value)))))
            }
        }
    }
}

/// Splits a path lexeme on `/`, keeping a leading `/` on the first segment.
fn split_path(path: &str) -> Vec<PathSegment> {
    let (lead, rest) = match path.strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", path),
    };
    rest.split('/')
        .enumerate()
        .map(|(i, segment)| {
            if i == 0 {
                PathSegment::Name(format!("{}{}", lead, segment))
            } else {
                PathSegment::Name(segment.to_string())
            }
        })
        .collect()
}

/// A list of literals is itself a literal; anything else builds the list at evaluation.
fn list_literal(elements: Vec<Arc<Operation>>) -> Operation {
    let literals: Option<Vec<Value>> = elements
        .iter()
        .map(|element| match element.as_ref() {
            Operation::Native(native) => Some(native.value().clone()),
            _ => None,
        })
        .collect();
    match literals {
        Some(values) => Operation::Native(NativeOperation::new(Value::Array(values))),
        None => Operation::Method(MethodOperation::new(
            MethodTarget::Name(LIST_METHOD.to_string()),
            elements,
        )),
    }
}
