//! Consequences produced by a cascade
//!
//! A consequence is an immutable record of one effect a rule produced while a
//! node was being initialized (or reacting to a timer, a message or the end of
//! the simulation). The host only ever sees these records; the state changes
//! they describe have already been applied when a cascade returns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Index;

use crate::domain::rule::RuleId;
use crate::types::Tick;

/// Attribute reference used by consequences that do not touch node state
pub const TIMER_TARGET: &str = "timer";
/// Attribute reference used by communication consequences
pub const COMMUNICATION_TARGET: &str = "communication";
/// Attribute reference used by mobility consequences
pub const MOBILITY_TARGET: &str = "mobility";

/// Flight mode of a mobile node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityMode {
    /// Follows explicit coordinates
    Guided,
    /// Follows its mission waypoints
    Auto,
}

/// Command sent to the node's mobility layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MobilityCommand {
    /// Switch flight mode
    SetMode {
        /// Target mode
        mode: MobilityMode,
    },
    /// Fly to the given coordinates
    GotoCoords {
        /// x, y, z
        coords: [f64; 3],
    },
    /// Fly to a mission waypoint
    GotoWaypoint {
        /// Waypoint index
        waypoint: u32,
    },
    /// Reverse the mission direction
    Reverse,
}

/// Command sent to the node's communication layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommunicationCommand {
    /// Send a message to one destination (or the default peer when `None`)
    Send {
        /// Message payload
        message: Value,
        /// Destination node, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    /// Send a message to every node in range
    Broadcast {
        /// Message payload
        message: Value,
    },
}

/// The effect a rule asks the kernel to apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Write an attribute of the node's state
    SetAttribute {
        /// Attribute name
        key: String,
        /// New value
        value: Value,
    },
    /// Ask the host to fire a timer at a logical tick
    ScheduleTimer {
        /// Opaque timer payload handed back on `handle_timer`
        payload: Value,
        /// Tick at which the timer fires
        at: Tick,
    },
    /// Communication command
    Communication(CommunicationCommand),
    /// Mobility command
    Mobility(MobilityCommand),
}

impl Effect {
    /// Convenience constructor for attribute writes
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        Effect::SetAttribute {
            key: key.into(),
            value,
        }
    }

    /// Convenience constructor for timers
    pub fn timer(payload: Value, at: Tick) -> Self {
        Effect::ScheduleTimer { payload, at }
    }

    /// The attribute this effect affects
    pub fn target(&self) -> &str {
        match self {
            Effect::SetAttribute { key, .. } => key,
            Effect::ScheduleTimer { .. } => TIMER_TARGET,
            Effect::Communication(_) => COMMUNICATION_TARGET,
            Effect::Mobility(_) => MOBILITY_TARGET,
        }
    }

    /// Short name of the effect kind
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::SetAttribute { .. } => "SET",
            Effect::ScheduleTimer { .. } => "TIMER",
            Effect::Communication(_) => "COMMUNICATION",
            Effect::Mobility(_) => "MOBILITY",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetAttribute { key, value } => write!(f, "{} = {}", key, value),
            Effect::ScheduleTimer { payload, at } => write!(f, "{} at t={}", payload, at),
            Effect::Communication(CommunicationCommand::Send {
                message,
                destination: Some(dest),
            }) => write!(f, "send {} to {}", message, dest),
            Effect::Communication(CommunicationCommand::Send { message, .. }) => {
                write!(f, "send {}", message)
            }
            Effect::Communication(CommunicationCommand::Broadcast { message }) => {
                write!(f, "broadcast {}", message)
            }
            Effect::Mobility(MobilityCommand::SetMode { mode }) => {
                write!(f, "set mode {:?}", mode)
            }
            Effect::Mobility(MobilityCommand::GotoCoords { coords }) => {
                write!(f, "goto ({}, {}, {})", coords[0], coords[1], coords[2])
            }
            Effect::Mobility(MobilityCommand::GotoWaypoint { waypoint }) => {
                write!(f, "goto waypoint {}", waypoint)
            }
            Effect::Mobility(MobilityCommand::Reverse) => write!(f, "reverse"),
        }
    }
}

/// What activated the rule that produced a consequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum Cause {
    /// The trigger that started the cascade (wave 0)
    Trigger,
    /// An earlier consequence of the same cascade that changed a watched attribute
    Consequence(usize),
}

/// One effect produced during a cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consequence {
    /// Position in the cascade, starting at 0
    pub index: usize,

    /// Cascade wave that produced it
    pub wave: u32,

    /// Rule that emitted the effect
    pub rule: RuleId,

    /// What activated the rule
    pub cause: Cause,

    /// The effect that was applied
    pub effect: Effect,
}

impl Consequence {
    /// The attribute this consequence affected
    #[inline]
    pub fn target(&self) -> &str {
        self.effect.target()
    }
}

impl fmt::Display for Consequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {}: {}",
            self.index,
            self.effect.kind(),
            self.rule,
            self.effect
        )
    }
}

/// Ordered result of one cascade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Consequences {
    items: Vec<Consequence>,
}

impl Consequences {
    pub(crate) fn from_vec(items: Vec<Consequence>) -> Self {
        Self { items }
    }

    /// Number of consequences
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cascade produced nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get a consequence by position
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Consequence> {
        self.items.get(index)
    }

    /// Iterate in production order
    pub fn iter(&self) -> std::slice::Iter<'_, Consequence> {
        self.items.iter()
    }

    /// Borrow as a slice
    #[inline]
    pub fn as_slice(&self) -> &[Consequence] {
        &self.items
    }

    /// Identifiers of the producing rules, in order
    pub fn rules(&self) -> Vec<&str> {
        self.items.iter().map(|c| c.rule.as_str()).collect()
    }

    /// Take ownership of the records
    pub fn into_vec(self) -> Vec<Consequence> {
        self.items
    }
}

impl Index<usize> for Consequences {
    type Output = Consequence;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl IntoIterator for Consequences {
    type Item = Consequence;
    type IntoIter = std::vec::IntoIter<Consequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Consequences {
    type Item = &'a Consequence;
    type IntoIter = std::slice::Iter<'a, Consequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
