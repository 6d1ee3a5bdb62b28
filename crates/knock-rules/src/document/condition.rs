use knock_core::RuleContext;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

use super::value::lookup;

/// Comparison applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// The attribute is set
    Exists,
    /// The attribute is not set
    Absent,
}

impl ConditionOp {
    /// Whether the operator compares against a `value`
    pub fn needs_value(self) -> bool {
        !matches!(self, ConditionOp::Exists | ConditionOp::Absent)
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionOp::Eq => "eq",
            ConditionOp::Ne => "ne",
            ConditionOp::Gt => "gt",
            ConditionOp::Ge => "ge",
            ConditionOp::Lt => "lt",
            ConditionOp::Le => "le",
            ConditionOp::Exists => "exists",
            ConditionOp::Absent => "absent",
        };
        f.write_str(name)
    }
}

/// Defines a condition that must hold for a rule to fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    /// Attribute or `payload.` path to test
    pub attr: String,

    /// Comparison
    pub op: ConditionOp,

    /// Right-hand side, required by every operator except `exists` and `absent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ConditionDefinition {
    /// Evaluate the condition against a rule context
    pub fn holds(&self, ctx: &RuleContext<'_>) -> bool {
        let actual = lookup(&self.attr, ctx);
        match (self.op, actual, &self.value) {
            (ConditionOp::Exists, actual, _) => actual.is_some(),
            (ConditionOp::Absent, actual, _) => actual.is_none(),
            (_, None, _) | (_, _, None) => false,
            (ConditionOp::Eq, Some(actual), Some(expected)) => values_equal(actual, expected),
            (ConditionOp::Ne, Some(actual), Some(expected)) => !values_equal(actual, expected),
            (op, Some(actual), Some(expected)) => match compare(actual, expected) {
                Some(ordering) => match op {
                    ConditionOp::Gt => ordering == Ordering::Greater,
                    ConditionOp::Ge => ordering != Ordering::Less,
                    ConditionOp::Lt => ordering == Ordering::Less,
                    ConditionOp::Le => ordering != Ordering::Greater,
                    _ => false,
                },
                None => false,
            },
        }
    }
}

// 1 and 1.0 are the same number to a rule author
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Exact for integers, `f64` only once a float is involved
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return Some(x.cmp(&y));
    }
    // negative i64 against a u64 above i64::MAX
    if a.is_i64() && b.is_u64() {
        return Some(Ordering::Less);
    }
    if a.is_u64() && b.is_i64() {
        return Some(Ordering::Greater);
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}
