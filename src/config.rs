//! Process-wide tuning read from the environment.
//!
//! Every setting has a default that applies when its variable is unset.
//! Boolean variables accept `1/0`, `true/false`, `yes/no` and `on/off`;
//! anything else is ignored with a warning.

use std::env;

use tracing::warn;

/// Evaluation settings, consulted while expressions run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Widen the left operand to the right operand's richer numeric type before arithmetic.
    pub always_widen_numerics: bool,
    /// Significant digits kept when dividing arbitrary-precision decimals.
    pub decimal_precision: u32,
    /// Map the remaining path over list elements for `$N`, even on unfiltered lists.
    pub always_concatenate_dollar_index: bool,
    /// Use positional `$N` access, even on filtered lists.
    pub never_concatenate_dollar_index: bool,
    /// When the first path segment is absent, search enclosing contexts outward.
    pub parent_lookup: bool,
    /// When the first path segment is absent, retry it against the current root.
    pub root_lookup: bool,
    /// Consult operator executors and host operator capabilities.
    pub operator_overloading: bool,
    /// Let methods with more parameters than arguments be called with trailing nulls.
    pub null_completion: bool,
    /// Resolve unknown dotted namespaces through the registered namespace loader.
    pub any_namespace: bool,
    pub case_sensitive_methods: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            always_widen_numerics: false,
            decimal_precision: 28,
            always_concatenate_dollar_index: false,
            never_concatenate_dollar_index: false,
            parent_lookup: false,
            root_lookup: false,
            operator_overloading: true,
            null_completion: true,
            any_namespace: false,
            case_sensitive_methods: true,
        }
    }
}

impl EvaluatorConfig {
    pub fn from_env() -> Self {
        let defaults = EvaluatorConfig::default();
        EvaluatorConfig {
            always_widen_numerics: env_flag("PATHEXPR_ALWAYS_WIDEN", defaults.always_widen_numerics),
            decimal_precision: env_number("PATHEXPR_DECIMAL_PRECISION", defaults.decimal_precision),
            always_concatenate_dollar_index: env_flag(
                "PATHEXPR_ALWAYS_CONCATENATE_DOLLAR_INDEX",
                defaults.always_concatenate_dollar_index,
            ),
            never_concatenate_dollar_index: env_flag(
                "PATHEXPR_NEVER_CONCATENATE_DOLLAR_INDEX",
                defaults.never_concatenate_dollar_index,
            ),
            parent_lookup: env_flag("PATHEXPR_PARENT_LOOKUP", defaults.parent_lookup),
            root_lookup: env_flag("PATHEXPR_ROOT_LOOKUP", defaults.root_lookup),
            operator_overloading: env_flag(
                "PATHEXPR_OPERATOR_OVERLOADING",
                defaults.operator_overloading,
            ),
            null_completion: env_flag("PATHEXPR_NULL_COMPLETION", defaults.null_completion),
            any_namespace: env_flag("PATHEXPR_ANY_NAMESPACE", defaults.any_namespace),
            case_sensitive_methods: env_flag(
                "PATHEXPR_CASE_SENSITIVE_METHODS",
                defaults.case_sensitive_methods,
            ),
        }
    }
}

/// Parser settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserOptions {
    /// Skip unmatched text and keep unidentified lexemes instead of failing.
    pub lenient: bool,
    /// Accept `,` outside any scope; the separated expressions form a list.
    pub allow_unscoped_separators: bool,
}

impl ParserOptions {
    pub fn from_env() -> Self {
        ParserOptions {
            lenient: env_flag("PATHEXPR_LENIENT", false),
            allow_unscoped_separators: env_flag("PATHEXPR_UNSCOPED_SEPARATORS", false),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    match parse_flag(&raw) {
        Some(flag) => flag,
        None => {
            warn!(variable = name, value = %raw, "ignoring malformed boolean setting");
            default
        }
    }
}

fn env_number(name: &str, default: u32) -> u32 {
    let Ok(raw) = env::var(name) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(variable = name, value = %raw, "ignoring malformed numeric setting");
        default
    })
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
