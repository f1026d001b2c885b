// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::HashMap;

use pathexpr::Value;
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness; `RUST_LOG` picks the level.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn object(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = HashMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

pub fn eval_expr(expression: &str, context: &Value) -> Result<Value, String> {
    init_test_logging();
    let operation = pathexpr::parse(expression).map_err(|e| format!("{:?}", e))?;
    operation.evaluate(context).map_err(|e| format!("{:?}", e))
}
