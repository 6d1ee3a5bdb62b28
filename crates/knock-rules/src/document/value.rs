use knock_core::RuleContext;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix addressing the payload of the trigger instead of node state
pub const PAYLOAD_PREFIX: &str = "payload";

/// Reference to a value available to a rule, e.g. `{ from: packets }`
///
/// `payload` reads the whole trigger payload and `payload.a.b` walks into it.
/// Any other path names a node attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeRef {
    /// Path of the referenced value
    pub from: String,
}

/// An object whose fields are themselves value sources,
/// e.g. `{ fields: { sender: sensor, content: { from: packets } } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectTemplate {
    /// Field name to value
    pub fields: BTreeMap<String, ValueSource>,
}

/// A literal value or a reference resolved at evaluation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    /// Read from the snapshot or trigger
    Ref(AttributeRef),
    /// Built field by field
    Object(ObjectTemplate),
    /// Used as written
    Literal(Value),
}

impl Default for ValueSource {
    fn default() -> Self {
        ValueSource::Literal(Value::Object(Default::default()))
    }
}

impl ValueSource {
    /// Resolve against a rule context. `None` when a reference points nowhere.
    pub fn resolve(&self, ctx: &RuleContext<'_>) -> Option<Value> {
        match self {
            ValueSource::Literal(value) => Some(value.clone()),
            ValueSource::Ref(reference) => lookup(&reference.from, ctx).cloned(),
            ValueSource::Object(template) => template
                .fields
                .iter()
                .map(|(name, field)| Some((name.clone(), field.resolve(ctx)?)))
                .collect::<Option<Map<String, Value>>>()
                .map(Value::Object),
        }
    }
}

/// Look up an attribute or payload path
pub fn lookup<'a>(path: &str, ctx: &RuleContext<'a>) -> Option<&'a Value> {
    let mut segments = path.split('.');
    match segments.next() {
        Some(PAYLOAD_PREFIX) => {
            let payload = ctx.trigger.payload()?;
            segments.try_fold(payload, |value, segment| value.get(segment))
        }
        _ => ctx.state.get(path),
    }
}
