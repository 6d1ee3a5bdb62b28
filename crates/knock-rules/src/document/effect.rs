use knock_core::MobilityCommand;
use serde::{Deserialize, Serialize};

use super::value::ValueSource;

/// Declarative form of an effect
///
/// ```yaml
/// - { effect: set, attr: packets, value: 0 }
/// - { effect: increment, attr: packets }
/// - { effect: timer, after: 1 }
/// - { effect: send, message: { from: packets }, destination: drone-1 }
/// - { effect: broadcast, message: hello }
/// - { effect: mobility, command: goto_waypoint, waypoint: 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectDefinition {
    /// Write an attribute
    Set {
        /// Attribute name
        attr: String,
        /// New value
        value: ValueSource,
    },
    /// Add to an integer attribute, starting from 0 when it is not set
    Increment {
        /// Attribute name
        attr: String,
        /// Amount added
        #[serde(default = "default_step")]
        by: i64,
    },
    /// Schedule a timer relative to the node's timestamp
    Timer {
        /// Ticks from now
        after: i64,
        /// Payload handed back when the timer fires
        #[serde(default)]
        payload: ValueSource,
    },
    /// Send a message
    Send {
        /// Message payload
        message: ValueSource,
        /// Destination node, if any
        #[serde(default)]
        destination: Option<String>,
    },
    /// Broadcast a message
    Broadcast {
        /// Message payload
        message: ValueSource,
    },
    /// Mobility command
    Mobility(MobilityCommand),
}

fn default_step() -> i64 {
    1
}

impl EffectDefinition {
    /// The attribute this effect writes, if any
    pub fn written_attribute(&self) -> Option<&str> {
        match self {
            EffectDefinition::Set { attr, .. } | EffectDefinition::Increment { attr, .. } => {
                Some(attr)
            }
            _ => None,
        }
    }
}
