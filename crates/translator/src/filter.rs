//! Filter rules gating whether a transformed record is delivered

use std::fmt;

use contracts::{FilterOp, FilterRuleConfig};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{Result, TranslatorError};

/// Kind of a JSON value, as seen by `type_is` / `type_is_not`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Null,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// Kind of `value`
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Sequence,
            Value::Object(_) => Self::Mapping,
        }
    }

    /// Canonical kind name
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }

    /// Parse a kind name, accepting the user-facing aliases
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" | "float64" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            "sequence" | "list" | "slice" | "array" => Some(Self::Sequence),
            "mapping" | "map" | "object" => Some(Self::Mapping),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Right-hand side of a filter rule
#[derive(Debug, Clone, PartialEq)]
pub enum Comparand {
    /// Literal compared structurally by `==` / `!=`
    Value(Value),
    /// Kind compared by `type_is` / `type_is_not`
    Kind(ValueKind),
    /// Comparand that does not fit its operator; the rule never matches
    Invalid(Value),
}

/// Structural equality; numbers compare by value so `1 == 1.0`
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return a == b;
            }
            if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                return a == b;
            }
            a.as_f64() == b.as_f64()
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Per-field predicate (field, operator, comparand)
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRule {
    field: String,
    op: FilterOp,
    comparand: Comparand,
}

impl FilterRule {
    /// Build a rule, rejecting comparands that do not fit the operator
    ///
    /// # Errors
    /// [`TranslatorError::InvalidRule`] when a kind check is given anything
    /// but a known kind name
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Result<Self> {
        let field = field.into();
        let comparand = Self::comparand_for(op, value);
        if let Comparand::Invalid(value) = &comparand {
            return Err(TranslatorError::InvalidRule {
                field,
                op: op.to_string(),
                message: format!("expects a kind name, got {value}"),
            });
        }
        Ok(Self {
            field,
            op,
            comparand,
        })
    }

    /// Build a rule, keeping a mismatched comparand as a never-matching rule
    pub fn lenient(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        let field = field.into();
        let comparand = Self::comparand_for(op, value);
        if let Comparand::Invalid(value) = &comparand {
            warn!(
                field = %field,
                op = %op,
                comparand = %value,
                "filter rule comparand is not a kind name, rule will never match"
            );
        }
        Self {
            field,
            op,
            comparand,
        }
    }

    /// Build a rule from configuration (strict)
    pub fn from_config(config: &FilterRuleConfig) -> Result<Self> {
        Self::new(config.field.clone(), config.op, config.value.clone())
    }

    fn comparand_for(op: FilterOp, value: Value) -> Comparand {
        if !op.is_kind_check() {
            return Comparand::Value(value);
        }
        match value.as_str().and_then(ValueKind::from_name) {
            Some(kind) => Comparand::Kind(kind),
            None => Comparand::Invalid(value),
        }
    }

    /// Field the rule applies to
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Operator
    pub fn op(&self) -> FilterOp {
        self.op
    }

    /// Normalized comparand
    pub fn comparand(&self) -> &Comparand {
        &self.comparand
    }

    /// Whether `value` satisfies this rule
    pub fn matches(&self, value: &Value) -> bool {
        match (self.op, &self.comparand) {
            (FilterOp::Eq, Comparand::Value(expected)) => values_equal(expected, value),
            (FilterOp::Ne, Comparand::Value(expected)) => !values_equal(expected, value),
            (FilterOp::TypeIs, Comparand::Kind(kind)) => ValueKind::of(value) == *kind,
            (FilterOp::TypeIsNot, Comparand::Kind(kind)) => ValueKind::of(value) != *kind,
            _ => {
                trace!(field = %self.field, op = %self.op, "skipping misconfigured filter rule");
                false
            }
        }
    }
}

/// Ordered set of filter rules
///
/// Rules naming the same field are OR-ed; fields are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    rules: Vec<FilterRule>,
}

impl FilterEngine {
    /// Create an engine with no rules (everything passes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration, rejecting misconfigured rules
    pub fn from_config(configs: &[FilterRuleConfig]) -> Result<Self> {
        let rules = configs
            .iter()
            .map(FilterRule::from_config)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Register a rule (lenient, see [`FilterRule::lenient`])
    pub fn add_rule(&mut self, field: impl Into<String>, op: FilterOp, value: Value) -> &mut Self {
        self.rules.push(FilterRule::lenient(field, op, value));
        self
    }

    /// Registered rules in declaration order
    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a single top-level field passes
    ///
    /// Passes when no rule names `key`; otherwise passes as soon as one of
    /// the rules naming `key` matches.
    pub fn passes(&self, key: &str, value: &Value) -> bool {
        let mut result = true;
        for rule in self.rules.iter().filter(|rule| rule.field == key) {
            result = false;
            if rule.matches(value) {
                return true;
            }
        }
        result
    }

    /// Whether every top-level field of `obj` passes
    pub fn passes_all(&self, obj: &Map<String, Value>) -> bool {
        self.rules.is_empty() || obj.iter().all(|(key, value)| self.passes(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(rules: &[(&str, FilterOp, Value)]) -> FilterEngine {
        let mut engine = FilterEngine::new();
        for (field, op, value) in rules {
            engine.add_rule(*field, *op, value.clone());
        }
        engine
    }

    #[test]
    fn test_equal_string() {
        let e = engine(&[("a", FilterOp::Eq, json!("b"))]);
        assert!(e.passes("a", &json!("b")));
        assert!(!e.passes("a", &json!("c")));
    }

    #[test]
    fn test_equal_list() {
        let e = engine(&[("a", FilterOp::Eq, json!(["b", "c"]))]);
        assert!(e.passes("a", &json!(["b", "c"])));
        assert!(!e.passes("a", &json!(["c", "b"])));
    }

    #[test]
    fn test_equal_numbers_by_value() {
        let e = engine(&[("n", FilterOp::Eq, json!(1))]);
        assert!(e.passes("n", &json!(1.0)));
        assert!(!e.passes("n", &json!(1.5)));
    }

    #[test]
    fn test_not_equal() {
        let e = engine(&[("a", FilterOp::Ne, json!("b"))]);
        assert!(e.passes("a", &json!("c")));
        assert!(!e.passes("a", &json!("b")));
    }

    #[test]
    fn test_type_is() {
        let e = engine(&[("a", FilterOp::TypeIs, json!("string"))]);
        assert!(e.passes("a", &json!("c")));
        assert!(!e.passes("a", &json!(1)));
    }

    #[test]
    fn test_type_is_list_alias() {
        let e = engine(&[("a", FilterOp::TypeIs, json!("list"))]);
        assert_eq!(e.rules()[0].comparand(), &Comparand::Kind(ValueKind::Sequence));
        assert!(e.passes("a", &json!([1, 2, 3])));
        assert!(!e.passes("a", &json!({"x": 1})));
    }

    #[test]
    fn test_type_is_float64_alias() {
        let e = engine(&[("price", FilterOp::TypeIs, json!("float64"))]);
        assert_eq!(e.rules()[0].comparand(), &Comparand::Kind(ValueKind::Number));
        assert!(e.passes("price", &json!(9.5)));
        assert!(e.passes("price", &json!(3)));
        assert!(!e.passes("price", &json!("9.5")));

        let strict = FilterRule::new("price", FilterOp::TypeIsNot, json!("float64")).unwrap();
        assert_eq!(strict.comparand(), &Comparand::Kind(ValueKind::Number));
    }

    #[test]
    fn test_type_is_not() {
        let e = engine(&[("a", FilterOp::TypeIsNot, json!("string"))]);
        assert!(e.passes("a", &json!(1)));
        assert!(!e.passes("a", &json!("x")));
    }

    #[test]
    fn test_multi_rules_no_match() {
        let e = engine(&[("a", FilterOp::Eq, json!("b")), ("a", FilterOp::Eq, json!("c"))]);
        assert!(!e.passes("a", &json!(1)));
    }

    #[test]
    fn test_multi_rules_one_match() {
        let e = engine(&[("a", FilterOp::Eq, json!("b")), ("a", FilterOp::Eq, json!("c"))]);
        assert!(e.passes("a", &json!("c")));
    }

    #[test]
    fn test_unnamed_field_passes() {
        let e = engine(&[("a", FilterOp::Eq, json!("b"))]);
        assert!(e.passes("other", &json!("anything")));
    }

    #[test]
    fn test_invalid_comparand_is_skipped() {
        // The first rule is misconfigured; the second can still accept the value.
        let e = engine(&[
            ("a", FilterOp::TypeIs, json!(42)),
            ("a", FilterOp::Eq, json!("ok")),
        ]);
        assert!(matches!(e.rules()[0].comparand(), Comparand::Invalid(_)));
        assert!(e.passes("a", &json!("ok")));
        assert!(!e.passes("a", &json!(42)));
    }

    #[test]
    fn test_strict_rule_rejects_bad_kind() {
        let err = FilterRule::new("a", FilterOp::TypeIsNot, json!("float")).unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidRule { .. }));
        assert!(err.to_string().contains("kind name"));

        assert!(FilterRule::new("a", FilterOp::Eq, json!(["any", "shape"])).is_ok());
    }

    #[test]
    fn test_passes_all_is_conjunction() {
        let e = engine(&[
            ("operation", FilterOp::Eq, json!("INSERT")),
            ("version", FilterOp::TypeIs, json!("string")),
        ]);
        let keep = json!({"operation": "INSERT", "version": "1", "extra": 3});
        let drop = json!({"operation": "INSERT", "version": 1});
        assert!(e.passes_all(keep.as_object().unwrap()));
        assert!(!e.passes_all(drop.as_object().unwrap()));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ValueKind::of(&json!(null)), ValueKind::Null);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Mapping);
        assert_eq!(ValueKind::from_name("object"), Some(ValueKind::Mapping));
        assert_eq!(ValueKind::from_name("float"), None);
        assert_eq!(ValueKind::Sequence.to_string(), "sequence");
    }
}
