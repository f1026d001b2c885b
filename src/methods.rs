//! Callable methods and their registry.
//!
//! Methods are grouped: groups without a namespace are searched for bare
//! names such as `substring(...)`, while `date.now()` addresses the method
//! `now` of the group registered under the `date` namespace. A name and an
//! argument count resolve to one [`MethodDescriptor`] by rank:
//!
//! 1. a method taking exactly that many arguments,
//! 2. a method whose trailing variadic parameter absorbs the extra (or missing) arguments,
//! 3. with null completion enabled, the method with the fewest parameters
//!    above the argument count; the missing trailing arguments are null.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    config::EvaluatorConfig,
    evaluator::EvaluationError,
    value::{Value, ValueType},
};

pub mod core;
pub mod date;

pub type MethodFn = dyn Fn(&[Value]) -> Result<Value, EvaluationError> + Send + Sync;

/// A declared parameter. The type, when given, is what the argument is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Value(Option<ValueType>),
    /// Trailing parameter collecting the remaining arguments into an array
    Variadic(Option<ValueType>),
}

impl Parameter {
    pub fn any() -> Self {
        Parameter::Value(None)
    }

    pub fn of(value_type: ValueType) -> Self {
        Parameter::Value(Some(value_type))
    }

    pub fn value_type(self) -> Option<ValueType> {
        match self {
            Parameter::Value(t) | Parameter::Variadic(t) => t,
        }
    }
}

/// How well a method fits an argument count; lower ranks win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fit {
    Exact,
    Variadic,
    /// Needs this many trailing nulls
    NullCompleted(usize),
}

pub struct MethodDescriptor {
    name: String,
    parameters: Vec<Parameter>,
    function: Arc<MethodFn>,
}

impl MethodDescriptor {
    pub fn new<F>(name: impl Into<String>, parameters: Vec<Parameter>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvaluationError> + Send + Sync + 'static,
    {
        MethodDescriptor {
            name: name.into(),
            parameters,
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.parameters.last(), Some(Parameter::Variadic(_)))
    }

    /// How this method fits a call with `arity` arguments, if it fits at all.
    pub fn fit(&self, arity: usize, null_completion: bool) -> Option<Fit> {
        let count = self.parameters.len();
        if self.is_variadic() {
            return (arity + 1 >= count).then_some(Fit::Variadic);
        }
        if count == arity {
            Some(Fit::Exact)
        } else if null_completion && count > arity {
            Some(Fit::NullCompleted(count - arity))
        } else {
            None
        }
    }

    /// Calls the method with arguments already bound to its parameters.
    pub fn invoke(&self, arguments: &[Value]) -> Result<Value, EvaluationError> {
        (self.function)(arguments)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// Methods provided together, optionally under a namespace.
#[derive(Debug, Clone, Default)]
pub struct MethodGroup {
    namespace: Option<String>,
    methods: Vec<Arc<MethodDescriptor>>,
}

impl MethodGroup {
    /// A group searched for bare method names.
    pub fn new() -> Self {
        MethodGroup::default()
    }

    pub fn namespaced(namespace: impl Into<String>) -> Self {
        MethodGroup {
            namespace: Some(namespace.into()),
            methods: Vec::new(),
        }
    }

    pub fn with(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(Arc::new(method));
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn methods(&self) -> &[Arc<MethodDescriptor>] {
        &self.methods
    }
}

/// Supplies groups for namespaces nobody registered up front.
pub trait NamespaceLoader: Send + Sync {
    fn load(&self, namespace: &str) -> Option<MethodGroup>;
}

/// Name, arity, case sensitivity and null completion of a resolved call.
type ResolutionKey = (String, usize, bool, bool);

/// Registered method groups and the resolution cache.
///
/// `generation` changes with every registration; a resolution that raced
/// with one is returned but not cached.
pub struct MethodRegistry {
    groups: RwLock<Vec<MethodGroup>>,
    loader: RwLock<Option<Arc<dyn NamespaceLoader>>>,
    resolved: DashMap<ResolutionKey, Arc<MethodDescriptor>>,
    generation: AtomicU64,
}

impl Default for MethodRegistry {
    /// The core group and the `date` namespace.
    fn default() -> Self {
        let registry = MethodRegistry::empty();
        registry.register(self::core::group());
        registry.register(self::date::group());
        registry
    }
}

impl MethodRegistry {
    pub fn empty() -> Self {
        MethodRegistry {
            groups: RwLock::new(Vec::new()),
            loader: RwLock::new(None),
            resolved: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn register(&self, group: MethodGroup) {
        let mut groups = self.groups.write();
        groups.push(group);
        self.invalidate();
    }

    pub fn set_loader(&self, loader: Arc<dyn NamespaceLoader>) {
        let _groups = self.groups.write();
        *self.loader.write() = Some(loader);
        self.invalidate();
    }

    /// Callers hold the `groups` write guard.
    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.resolved.clear();
    }

    /// Resolves `name` for a call with `arity` arguments.
    pub fn resolve(
        &self,
        name: &str,
        arity: usize,
        config: &EvaluatorConfig,
    ) -> Result<Arc<MethodDescriptor>, EvaluationError> {
        let key = (
            name.to_string(),
            arity,
            config.case_sensitive_methods,
            config.null_completion,
        );
        if let Some(cached) = self.resolved.get(&key) {
            return Ok(cached.value().clone());
        }

        let generation = self.generation.load(Ordering::Acquire);
        let found = self.find(name, arity, config)?;
        debug!(method = name, arity, parameters = found.parameters().len(), "resolved method");

        // registrations take the write guard, so none can slip in before the insert
        let _groups = self.groups.read();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!(method = name, "registrations changed during resolution, not caching");
            return Ok(found);
        }
        Ok(self.resolved.entry(key).or_insert(found).value().clone())
    }

    fn find(
        &self,
        name: &str,
        arity: usize,
        config: &EvaluatorConfig,
    ) -> Result<Arc<MethodDescriptor>, EvaluationError> {
        let unresolved = || EvaluationError::UnresolvedMethod {
            name: name.to_string(),
            arity,
        };
        let same = |a: &str, b: &str| {
            if config.case_sensitive_methods {
                a == b
            } else {
                a.eq_ignore_ascii_case(b)
            }
        };
        let (namespace, method) = match name.rsplit_once('.') {
            Some((namespace, method)) => (Some(namespace), method),
            None => (None, name),
        };

        if let Some(namespace) = namespace {
            let known = self
                .groups
                .read()
                .iter()
                .any(|g| g.namespace().is_some_and(|n| same(n, namespace)));
            if !known && config.any_namespace {
                let loaded = self.loader.read().as_ref().and_then(|l| l.load(namespace));
                if let Some(group) = loaded {
                    debug!(namespace, "loaded method namespace");
                    self.groups.write().push(group);
                }
            }
        }

        let groups = self.groups.read();
        let mut best: Option<(Fit, &Arc<MethodDescriptor>)> = None;
        for group in groups.iter() {
            let matches_group = match (namespace, group.namespace()) {
                (None, None) => true,
                (Some(wanted), Some(actual)) => same(wanted, actual),
                _ => false,
            };
            if !matches_group {
                continue;
            }
            for candidate in group.methods().iter().filter(|m| same(m.name(), method)) {
                let Some(fit) = candidate.fit(arity, config.null_completion) else {
                    continue;
                };
                if best.is_none_or(|(current, _)| fit < current) {
                    best = Some((fit, candidate));
                }
            }
        }
        best.map(|(_, method)| method.clone()).ok_or_else(unresolved)
    }

    pub fn cached_len(&self) -> usize {
        self.resolved.len()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespaces: Vec<Option<String>> = self
            .groups
            .read()
            .iter()
            .map(|g| g.namespace.clone())
            .collect();
        f.debug_struct("MethodRegistry")
            .field("groups", &namespaces)
            .field("cached", &self.resolved.len())
            .finish()
    }
}
