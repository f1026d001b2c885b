//! Everything an evaluation consults besides the expression itself.

use std::{fmt, sync::Arc};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

use crate::{
    accessor::AccessorRegistry,
    ast::Operation,
    config::EvaluatorConfig,
    convert::{Converter, StandardConverter},
    evaluator::{EvalContext, EvaluationError, OperatorExecutor},
    methods::MethodRegistry,
    value::Value,
};

static GLOBAL: Lazy<Runtime> = Lazy::new(|| Runtime::new(EvaluatorConfig::from_env()));

/// Configuration, conversion, accessors, methods and operator executors.
///
/// A runtime is shared by reference between evaluations; registering an
/// accessor, method group or executor takes effect for evaluations started
/// afterwards.
///
/// # Examples
///
/// ```
/// use pathexpr::{EvaluatorConfig, MethodDescriptor, MethodGroup, Parameter, Runtime, Value, ValueType};
///
/// let runtime = Runtime::new(EvaluatorConfig::default());
/// runtime.methods().register(MethodGroup::namespaced("text").with(MethodDescriptor::new(
///     "upper",
///     vec![Parameter::of(ValueType::String)],
///     |args| Ok(Value::from(args[0].to_text().to_uppercase())),
/// )));
///
/// let shout = pathexpr::parse("text.upper(name)").unwrap();
/// let person = Value::object([("name", Value::from("ada"))]);
/// assert_eq!(runtime.evaluate(&shout, &person).unwrap(), Value::from("ADA"));
/// ```
pub struct Runtime {
    config: EvaluatorConfig,
    converter: Arc<dyn Converter>,
    accessors: AccessorRegistry,
    methods: MethodRegistry,
    executors: RwLock<Vec<Arc<dyn OperatorExecutor>>>,
    regexes: DashMap<String, Regex>,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(EvaluatorConfig::default())
    }
}

impl Runtime {
    /// A runtime with the standard converter, accessors and methods.
    pub fn new(config: EvaluatorConfig) -> Self {
        Runtime {
            config,
            converter: Arc::new(StandardConverter),
            accessors: AccessorRegistry::default(),
            methods: MethodRegistry::default(),
            executors: RwLock::new(Vec::new()),
            regexes: DashMap::new(),
        }
    }

    /// The process-wide runtime, configured from `PATHEXPR_*` environment variables.
    pub fn global() -> &'static Runtime {
        &GLOBAL
    }

    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn converter(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    pub fn accessors(&self) -> &AccessorRegistry {
        &self.accessors
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    /// Adds an executor; earlier registrations are asked first.
    pub fn register_executor(&self, executor: Arc<dyn OperatorExecutor>) {
        self.executors.write().push(executor);
    }

    pub(crate) fn executors(&self) -> Vec<Arc<dyn OperatorExecutor>> {
        self.executors.read().clone()
    }

    /// Evaluates `operation` against `context` with this runtime.
    pub fn evaluate(&self, operation: &Operation, context: &Value) -> Result<Value, EvaluationError> {
        operation.evaluate_with(context, &EvalContext::new(self))
    }

    /// The compiled form of `pattern`, anchored to match whole strings.
    pub(crate) fn regex(&self, pattern: &str) -> Result<Regex, EvaluationError> {
        if let Some(cached) = self.regexes.get(pattern) {
            return Ok(cached.value().clone());
        }
        let compiled = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| EvaluationError::Regex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        debug!(pattern, "compiled pattern");
        Ok(self
            .regexes
            .entry(pattern.to_string())
            .or_insert(compiled)
            .value()
            .clone())
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("accessors", &self.accessors)
            .field("methods", &self.methods)
            .field("executors", &self.executors.read().len())
            .field("patterns", &self.regexes.len())
            .finish()
    }
}
