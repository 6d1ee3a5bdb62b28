use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::domain::consequence::Effect;
use crate::types::{NodeState, Tick};
use crate::CoreError;

/// Value object: Rule ID
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    /// Borrow the identifier
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        RuleId(id.to_string())
    }
}

impl From<String> for RuleId {
    fn from(id: String) -> Self {
        RuleId(id)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stimulus that starts a cascade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// First cascade of a node
    Initialize {
        /// Seed selecting the initial conditions
        seed: i64,
    },
    /// A previously scheduled timer fired
    Timer {
        /// Payload the timer was scheduled with
        payload: Value,
    },
    /// A message arrived from another node
    Message {
        /// Message payload
        payload: Value,
    },
    /// The node received a telemetry reading
    Telemetry {
        /// Telemetry payload
        payload: Value,
    },
    /// The simulation is ending
    Finish,
}

impl Trigger {
    /// The kind of this trigger
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Initialize { .. } => TriggerKind::Initialize,
            Trigger::Timer { .. } => TriggerKind::Timer,
            Trigger::Message { .. } => TriggerKind::Message,
            Trigger::Telemetry { .. } => TriggerKind::Telemetry,
            Trigger::Finish => TriggerKind::Finish,
        }
    }

    /// Payload carried by timer, message and telemetry triggers
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Trigger::Timer { payload }
            | Trigger::Message { payload }
            | Trigger::Telemetry { payload } => Some(payload),
            _ => None,
        }
    }
}

/// Trigger discriminant, used by rules to declare what they react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// `initialize`
    Initialize,
    /// `handle_timer`
    Timer,
    /// `handle_message`
    Message,
    /// `handle_telemetry`
    Telemetry,
    /// `finish`
    Finish,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerKind::Initialize => "initialize",
            TriggerKind::Timer => "timer",
            TriggerKind::Message => "message",
            TriggerKind::Telemetry => "telemetry",
            TriggerKind::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Read-only view handed to a rule during evaluation
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// State snapshot at the start of the current wave
    pub state: &'a NodeState,
    /// Trigger of the cascade
    pub trigger: &'a Trigger,
    /// Logical time of the node
    pub timestamp: Tick,
    /// Current wave, 0 for the trigger wave
    pub wave: u32,
}

/// A rule of the simulation
///
/// Rules are pure: they read the snapshot they are given and return the
/// effects they want applied. Returning `Ok(None)` means the rule did not
/// fire. The engine applies the effects and decides which rules to wake up
/// next from the attributes they watch.
pub trait Rule: Send + Sync {
    /// Unique identifier of the rule
    fn id(&self) -> &RuleId;

    /// Ordering key inside a wave, lower runs first
    fn priority(&self) -> i32 {
        0
    }

    /// Attributes whose changes re-activate this rule in later waves
    fn watches(&self) -> &[String] {
        &[]
    }

    /// Attributes this rule may write, used for dependency analysis
    fn writes(&self) -> &[String] {
        &[]
    }

    /// Whether the rule takes part in the first wave of a cascade started by `trigger`
    fn accepts(&self, trigger: &Trigger) -> bool {
        trigger.kind() == TriggerKind::Initialize
    }

    /// Evaluate the rule against a snapshot
    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Option<Vec<Effect>>, CoreError>;
}

/// Signature of a closure-backed rule body
pub type RuleFn =
    Arc<dyn Fn(&RuleContext<'_>) -> Result<Option<Vec<Effect>>, CoreError> + Send + Sync>;

/// A rule whose body is a closure
///
/// Handy for rule sets assembled in code and for tests.
#[derive(Clone)]
pub struct FnRule {
    id: RuleId,
    priority: i32,
    watches: Vec<String>,
    writes: Vec<String>,
    triggers: Vec<TriggerKind>,
    body: RuleFn,
}

impl FnRule {
    /// Create a rule reacting to `initialize` with no watched attributes
    pub fn new<F>(id: impl Into<RuleId>, body: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Result<Option<Vec<Effect>>, CoreError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            priority: 0,
            watches: Vec::new(),
            writes: Vec::new(),
            triggers: vec![TriggerKind::Initialize],
            body: Arc::new(body),
        }
    }

    /// Set the in-wave priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add watched attributes
    pub fn watching<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watches.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Declare written attributes
    pub fn writing<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.writes.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Replace the trigger kinds the rule reacts to in wave 0
    pub fn on(mut self, triggers: impl IntoIterator<Item = TriggerKind>) -> Self {
        self.triggers = triggers.into_iter().collect();
        self
    }
}

impl fmt::Debug for FnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("watches", &self.watches)
            .field("writes", &self.writes)
            .field("triggers", &self.triggers)
            .finish()
    }
}

impl Rule for FnRule {
    fn id(&self) -> &RuleId {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn watches(&self) -> &[String] {
        &self.watches
    }

    fn writes(&self) -> &[String] {
        &self.writes
    }

    fn accepts(&self, trigger: &Trigger) -> bool {
        self.triggers.contains(&trigger.kind())
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Option<Vec<Effect>>, CoreError> {
        (self.body)(ctx)
    }
}
