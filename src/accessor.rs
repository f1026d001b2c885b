//! Context accessors: how a path segment reads a member of a context value.
//!
//! Every value has a *lineage*, the list of [`ContextType`]s it belongs to
//! from most to least specific. An object is a `Map`, then `Any`; an array
//! is a `List`, then a `Collection`, then `Any`; a host object contributes
//! the names of its type chain. The [`AccessorRegistry`] picks the accessor
//! whose declared type comes earliest in the lineage and caches the choice
//! per most specific type.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::{evaluator::EvaluationError, value::Value};

mod collection;
mod host;
mod map;

pub use collection::{CollectionAccessor, dollar_index};
pub use host::HostAccessor;
pub use map::MapAccessor;

/// The kind of context an accessor declares it handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    /// Every value
    Any,
    /// String-keyed objects
    Map,
    /// Arrays and sequences
    Collection,
    List,
    Sequence,
    /// Null, booleans, numbers, strings and dates
    Scalar,
    /// A host type or one of its ancestors, by name
    Host(&'static str),
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextType::Host(name) => f.write_str(name),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Context types of `value`, most specific first, always ending in [`ContextType::Any`].
pub fn lineage(value: &Value) -> Vec<ContextType> {
    let mut types = match value {
        Value::Object(_) => vec![ContextType::Map],
        Value::Array(_) => vec![ContextType::List, ContextType::Collection],
        Value::Sequence(_) => vec![ContextType::Sequence, ContextType::Collection],
        Value::Host(host) => host.type_chain().into_iter().map(ContextType::Host).collect(),
        Value::Function(_) | Value::Deferred(_) => Vec::new(),
        _ => vec![ContextType::Scalar],
    };
    types.push(ContextType::Any);
    types
}

/// Reads, tests and writes named members of one kind of context.
///
/// Only `has` and `get` are required; the remaining capabilities default to
/// "not supported".
pub trait ContextAccessor: Send + Sync {
    fn context_type(&self) -> ContextType;

    /// Whether the member exists, even if its value is null.
    fn has(&self, context: &Value, name: &str) -> Result<bool, EvaluationError>;

    /// The member's value, or null if it does not exist.
    fn get(&self, context: &Value, name: &str) -> Result<Value, EvaluationError>;

    /// Whether the member has been given a value, as opposed to merely being declared.
    fn has_value(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        self.has(context, name)
    }

    /// Names of the members, if the context can enumerate them.
    fn list(&self, _context: &Value) -> Option<Vec<String>> {
        None
    }

    fn set(&self, context: &mut Value, name: &str, _value: Value) -> Result<(), EvaluationError> {
        Err(EvaluationError::Unsupported(format!(
            "cannot set '{}' on {}",
            name,
            context.value_type()
        )))
    }

    /// Metadata attached to a member.
    fn annotation(&self, _context: &Value, _field: &str, _annotation: &str) -> Option<Value> {
        None
    }
}

/// Registered accessors plus the per-type resolution cache.
///
/// Lookups are concurrent; the cache is filled at most once per type and is
/// dropped whenever an accessor is registered.
pub struct AccessorRegistry {
    accessors: RwLock<Vec<Arc<dyn ContextAccessor>>>,
    resolved: DashMap<ContextType, Arc<dyn ContextAccessor>>,
    fallback: Arc<dyn ContextAccessor>,
}

impl Default for AccessorRegistry {
    /// The map and collection accessors, with the host accessor as fallback.
    fn default() -> Self {
        let registry = AccessorRegistry::empty();
        registry.register(Arc::new(MapAccessor));
        registry.register(Arc::new(CollectionAccessor));
        registry
    }
}

impl AccessorRegistry {
    /// A registry with no accessors; every value resolves to the host accessor.
    pub fn empty() -> Self {
        AccessorRegistry {
            accessors: RwLock::new(Vec::new()),
            resolved: DashMap::new(),
            fallback: Arc::new(HostAccessor),
        }
    }

    /// Adds an accessor. On equal specificity the later registration wins.
    pub fn register(&self, accessor: Arc<dyn ContextAccessor>) {
        let mut accessors = self.accessors.write();
        accessors.push(accessor);
        self.resolved.clear();
    }

    /// The most specific accessor for `value`.
    pub fn resolve(&self, value: &Value) -> Arc<dyn ContextAccessor> {
        let types = lineage(value);
        let key = types[0];
        if let Some(cached) = self.resolved.get(&key) {
            return cached.value().clone();
        }

        let accessors = self.accessors.read();
        let mut best: Option<(usize, &Arc<dyn ContextAccessor>)> = None;
        for accessor in accessors.iter() {
            let Some(rank) = types.iter().position(|t| *t == accessor.context_type()) else {
                continue;
            };
            if best.is_none_or(|(current, _)| rank <= current) {
                best = Some((rank, accessor));
            }
        }
        let chosen = best.map_or_else(|| self.fallback.clone(), |(_, accessor)| accessor.clone());
        debug!(context_type = %key, accessor = %chosen.context_type(), "resolved context accessor");

        // still under the read guard: a registration can't clear the cache before this insert
        self.resolved.entry(key).or_insert(chosen).value().clone()
    }

    // ========================================
    // Facade over the resolved accessor
    // ========================================

    pub fn has(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        if context.is_null() {
            return Ok(false);
        }
        self.resolve(context).has(context, name)
    }

    pub fn has_value(&self, context: &Value, name: &str) -> Result<bool, EvaluationError> {
        if context.is_null() {
            return Ok(false);
        }
        self.resolve(context).has_value(context, name)
    }

    /// Reads a member; a null context has no members.
    pub fn get(&self, context: &Value, name: &str) -> Result<Value, EvaluationError> {
        if context.is_null() {
            return Ok(Value::Null);
        }
        self.resolve(context).get(context, name)
    }

    pub fn list(&self, context: &Value) -> Option<Vec<String>> {
        if context.is_null() {
            return Some(Vec::new());
        }
        self.resolve(context).list(context)
    }

    pub fn set(&self, context: &mut Value, name: &str, value: Value) -> Result<(), EvaluationError> {
        let accessor = self.resolve(context);
        accessor.set(context, name, value)
    }

    pub fn annotation(&self, context: &Value, field: &str, annotation: &str) -> Option<Value> {
        if context.is_null() {
            return None;
        }
        self.resolve(context).annotation(context, field, annotation)
    }

    pub fn cached_len(&self) -> usize {
        self.resolved.len()
    }
}

impl fmt::Debug for AccessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<ContextType> = self
            .accessors
            .read()
            .iter()
            .map(|a| a.context_type())
            .collect();
        f.debug_struct("AccessorRegistry")
            .field("accessors", &types)
            .field("cached", &self.resolved.len())
            .finish()
    }
}
