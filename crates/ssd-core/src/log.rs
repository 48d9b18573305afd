//! Append-only event records produced while agents act.

use serde::{Deserialize, Serialize};

use crate::Tick;
use crate::agent::{ActionKind, AgentMode, Vitals};

/// What an agent did (or what happened to it) in one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Death,
    ShareFood,
    TendWounds,
    Rest,
    FallAsleep,
    Sleep,
    Wake,
    EatSuccess,
    EatFail,
    HuntSuccess,
    HuntFail,
    SearchFoodFallback,
    Patrol,
}

impl LogAction {
    /// Whether the action produced food for the acting agent.
    #[must_use]
    pub const fn is_meal(self) -> bool {
        matches!(self, Self::EatSuccess | Self::HuntSuccess)
    }

    /// Whether the action targeted another agent.
    #[must_use]
    pub const fn is_help(self) -> bool {
        matches!(self, Self::ShareFood | Self::TendWounds)
    }
}

/// SSD readings at the moment of logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SsdReading {
    #[serde(rename = "E")]
    pub energy: f64,
    #[serde(rename = "T")]
    pub temperature: f64,
    /// Habit exercised by the action, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub habit: Option<ActionKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub kappa: Option<f64>,
}

/// Hazard figures recorded with a death.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeapDiagnostics {
    pub hazard: f64,
    #[serde(rename = "theta")]
    pub threshold: f64,
    #[serde(rename = "jump_rate")]
    pub probability: f64,
}

/// One record in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "t")]
    pub tick: Tick,
    #[serde(rename = "name")]
    pub agent: String,
    #[serde(rename = "state")]
    pub mode: AgentMode,
    pub action: LogAction,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub amount: Option<f64>,
    #[serde(flatten)]
    pub vitals: Vitals,
    #[serde(flatten)]
    pub ssd: SsdReading,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub leap: Option<LeapDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub boredom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sleep_debt: Option<f64>,
}
