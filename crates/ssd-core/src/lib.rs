//! Headless kernel for the SSD (Subjective State Dynamics) survival simulation.
//!
//! NPCs forage, hunt, rest, sleep and help each other on a small grid of berry
//! patches and hunt zones. Each agent carries accumulated pressure `E`,
//! per-action habit strength `κ` and an exploration temperature `T`; the
//! [`Simulation`] driver advances every agent once per tick and exposes plain
//! data snapshots plus an append-only event log.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod agent;
pub mod config;
pub mod environment;
pub mod log;
pub mod rng;
pub mod roster;
pub mod simulation;
pub mod snapshot;
pub mod ssd;

pub use agent::{ActionKind, AgentMode, Npc, Preset, SleepState, Vitals};
pub use config::{
    AgentSpec, BehaviorParams, EnvironmentConfig, KernelProfile, SimulationConfig, SsdParams,
    ValueRange,
};
pub use environment::{
    BerryPatch, DayPhase, Environment, ForageOutcome, GridPos, HuntOutcome, HuntZone, PatchId,
    ZoneId,
};
pub use log::{LeapDiagnostics, LogAction, LogEntry, SsdReading};
pub use rng::RandomSource;
pub use roster::{AgentId, Roster};
pub use simulation::{Simulation, TickReport, TickSummary};
pub use snapshot::{
    AgentSnapshot, EnvironmentSnapshot, Frame, HuntZoneSnapshot, PatchSnapshot, SocialGraph,
    SocialLink, SocialNode,
};
pub use ssd::{LeapCheck, SsdState};

/// Simulation clock (ticks processed since the last reset).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The tick every simulation starts from.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Tick `duration` steps after this one.
    #[must_use]
    pub const fn after(self, duration: u64) -> Self {
        Self(self.0.saturating_add(duration))
    }
}

/// Errors raised while building or resetting a simulation.
///
/// Ticking never fails: every edge case inside a tick is handled by policy.
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// Two roster entries share a name.
    #[error("duplicate agent name `{0}`")]
    DuplicateAgent(String),
    /// A roster entry starts outside the environment grid.
    #[error("agent `{name}` starts at ({x}, {y}) outside the grid")]
    StartOutOfBounds { name: String, x: i32, y: i32 },
}

pub(crate) fn clip(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}
