use std::{fmt, sync::Arc};

use once_cell::sync::OnceCell;

use crate::{evaluator::EvaluationError, value::Value};

type Producer = dyn Fn() -> Box<dyn Iterator<Item = Value> + Send> + Send + Sync;

/// A lazily produced collection.
///
/// Every call to [`Sequence::iter`] starts a fresh pass over the source, so
/// positional access walks the sequence instead of materialising it.
/// Elements may be [`Value::Deferred`].
#[derive(Clone)]
pub struct Sequence {
    producer: Arc<Producer>,
}

impl Sequence {
    pub fn new<F, I>(producer: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: Iterator<Item = Value> + Send + 'static,
    {
        Sequence {
            producer: Arc::new(move || Box::new(producer())),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Value> + Send> {
        (self.producer)()
    }

    /// The element at `index`, walking the sequence and resolving a deferred element.
    pub fn nth(&self, index: usize) -> Result<Value, EvaluationError> {
        match self.iter().nth(index) {
            Some(value) => value.resolved(),
            None => Ok(Value::Null),
        }
    }

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sequence(..)")
    }
}

type Computation = dyn Fn() -> Result<Value, EvaluationError> + Send + Sync;

/// An element computed on first use and remembered afterwards.
#[derive(Clone)]
pub struct Deferred {
    compute: Arc<Computation>,
    cell: Arc<OnceCell<Value>>,
}

impl Deferred {
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> Result<Value, EvaluationError> + Send + Sync + 'static,
    {
        Deferred {
            compute: Arc::new(compute),
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub fn resolve(&self) -> Result<Value, EvaluationError> {
        self.cell.get_or_try_init(|| (self.compute)()).cloned()
    }

    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Deferred").field(value).finish(),
            None => f.write_str("Deferred(<pending>)"),
        }
    }
}
