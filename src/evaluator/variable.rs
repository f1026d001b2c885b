use tracing::trace;

use super::{EvalContext, EvaluationError, Frame};
use crate::{
    accessor::dollar_index,
    ast::{Operation, PathSegment, VariableOperation},
    value::{Value, ValueType},
};

impl VariableOperation {
    pub(crate) fn evaluate(
        &self,
        context: &Value,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        self.evaluate_from(context, 0, ctx)
    }

    fn evaluate_from(
        &self,
        context: &Value,
        offset: usize,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        ctx.enter(context, |ctx| self.step(offset, ctx))
    }

    /// Resolves the segment at `offset` against the innermost context, then descends.
    fn step(&self, offset: usize, ctx: &EvalContext<'_>) -> Result<Value, EvaluationError> {
        let segments = self.segments();
        if offset >= segments.len() {
            return Ok(Value::Null);
        }
        let last = segments.len() - 1;
        let frame = ctx.frame().ok_or(EvaluationError::InvalidContext)?;

        let name = match &segments[offset] {
            PathSegment::Operation(receiver) => {
                let object = receiver.evaluate_with(frame.value(), ctx)?.resolved()?;
                return self.descend(object, offset, frame, ctx);
            }
            PathSegment::Name(name) => name.as_str(),
        };

        if name == "." {
            if offset == last {
                return Err(EvaluationError::DanglingPathSegment(".".to_string()));
            }
            return self.step(offset + 1, ctx);
        }

        let mut offset = offset;
        let mut name = name;
        let mut frame = frame;
        while name == ".." {
            if offset == last {
                return Err(EvaluationError::DanglingPathSegment("..".to_string()));
            }
            frame = frame.parent().ok_or(EvaluationError::InvalidContext)?;
            offset += 1;
            name = match &segments[offset] {
                PathSegment::Name(next) => next.as_str(),
                PathSegment::Operation(_) => {
                    return Err(EvaluationError::DanglingPathSegment("..".to_string()));
                }
            };
        }

        if let Some(absolute) = name.strip_prefix('/') {
            if offset == 0 {
                frame = ctx.root_frame().ok_or(EvaluationError::InvalidContext)?;
            }
            name = absolute;
        }

        let runtime = ctx.runtime();
        let read = |frame: &Frame<'_>| -> Result<Value, EvaluationError> {
            if name == "$this" {
                return Ok(frame.value().clone());
            }
            runtime.accessors().get(frame.value(), name)?.resolved()
        };

        let mut object = read(frame)?;
        if offset == 0 && object.is_null() {
            let config = runtime.config();
            if config.parent_lookup {
                while object.is_null()
                    && let Some(parent) = frame.parent()
                {
                    frame = parent;
                    object = read(frame)?;
                }
            } else if config.root_lookup
                && let Some(root) = ctx.root_frame()
                && !std::ptr::eq(root, frame)
            {
                frame = root;
                object = read(frame)?;
            }
            if !object.is_null() {
                trace!(name, "resolved against an enclosing context");
            }
        }

        self.descend(object, offset, frame, ctx)
    }

    /// Applies the segments after `offset` to `object`.
    ///
    /// Index and filter operations are evaluated against `base`, the
    /// context the path was read from; named segments recurse with the
    /// object entered as the new context.
    fn descend(
        &self,
        object: Value,
        offset: usize,
        base: &Frame<'_>,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let segments = self.segments();
        let last = segments.len() - 1;
        let config = ctx.runtime().config();
        let mut object = object;
        let mut offset = offset;
        let mut concatenated = false;

        loop {
            if object.is_null() {
                // filtering nothing still yields a list
                return Ok(match segments.get(offset + 1) {
                    Some(PathSegment::Operation(index)) if !is_positional(index) => {
                        Value::Array(Vec::new())
                    }
                    _ => Value::Null,
                });
            }
            if offset == last {
                return Ok(object);
            }

            match &segments[offset + 1] {
                PathSegment::Operation(index) => {
                    object = self.index(object, index, base, &mut concatenated, ctx)?;
                    offset += 1;
                }
                PathSegment::Name(name) => {
                    let name = name.strip_prefix('/').unwrap_or(name);
                    if !object.is_list_like() {
                        return self.evaluate_from(&object, offset + 1, ctx);
                    }

                    let positional = (!concatenated || config.never_concatenate_dollar_index)
                        && !config.always_concatenate_dollar_index;
                    if positional && dollar_index(name).is_some() {
                        object = ctx.runtime().accessors().get(&object, name)?.resolved()?;
                        concatenated = false;
                        offset += 1;
                        continue;
                    }

                    let mut results = Vec::new();
                    for child in list_elements(&object)? {
                        if child.is_null() {
                            continue;
                        }
                        match self.evaluate_from(&child, offset + 1, ctx)? {
                            Value::Array(items) => results.extend(items),
                            other => results.push(other),
                        }
                    }
                    return Ok(Value::Array(results));
                }
            }
        }
    }

    /// Applies one bracketed operation: a key on maps, a position or filter on lists.
    fn index(
        &self,
        object: Value,
        index: &Operation,
        base: &Frame<'_>,
        concatenated: &mut bool,
        ctx: &EvalContext<'_>,
    ) -> Result<Value, EvaluationError> {
        let runtime = ctx.runtime();

        if let Value::Object(map) = &object {
            let key = index.evaluate_with(base.value(), ctx)?.resolved()?;
            if key.is_null() {
                return Ok(Value::Null);
            }
            return map.get(&key.to_text()).cloned().unwrap_or(Value::Null).resolved();
        }

        if !object.is_list_like() {
            let key = index.evaluate_with(base.value(), ctx)?.resolved()?;
            if key.is_null() {
                return Err(EvaluationError::UnresolvedKey(index.to_string()));
            }
            return runtime.accessors().get(&object, &key.to_text())?.resolved();
        }

        if is_positional(index) {
            let position = index.evaluate_with(base.value(), ctx)?.resolved()?;
            if position.is_null() {
                return Err(EvaluationError::NullIndex(index.to_string()));
            }
            let invalid = || EvaluationError::InvalidIndex {
                expression: index.to_string(),
                value: position.to_text(),
            };
            let position = runtime
                .converter()
                .convert(&position, ValueType::Long)
                .map_err(|_| invalid())?
                .as_i64()
                .ok_or_else(invalid)?;
            *concatenated = false;
            let Ok(position) = usize::try_from(position) else {
                return Ok(Value::Null);
            };
            return match &object {
                Value::Sequence(sequence) => sequence.nth(position),
                Value::Array(items) => items
                    .get(position)
                    .cloned()
                    .unwrap_or(Value::Null)
                    .resolved(),
                _ => Ok(Value::Null),
            };
        }

        let mut kept = Vec::new();
        for child in list_elements(&object)? {
            let verdict = index.evaluate_with(&child, ctx)?.resolved()?;
            let keep = !verdict.is_null()
                && runtime
                    .converter()
                    .convert(&verdict, ValueType::Boolean)
                    .ok()
                    .and_then(|v| v.as_bool())
                    == Some(true);
            if keep {
                kept.push(child);
            }
        }
        *concatenated = true;
        Ok(Value::Array(kept))
    }
}

/// Whether a list index selects a position rather than filtering.
///
/// Literals (other than booleans), paths and arithmetic select positions;
/// comparisons, method calls and everything else filter.
fn is_positional(index: &Operation) -> bool {
    match index {
        Operation::Native(native) => !matches!(native.value(), Value::Boolean(_)),
        Operation::Variable(_) => true,
        Operation::Classic(classic) => classic.operator().is_arithmetic(),
        Operation::Method(_) => false,
    }
}

fn list_elements(list: &Value) -> Result<Vec<Value>, EvaluationError> {
    list.elements()
        .map(|elements| elements.map(Value::resolved).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
}
