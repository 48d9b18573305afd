//! Plain-data views handed to hosts. Nothing here borrows kernel state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Tick;
use crate::agent::{ActionKind, AgentMode, Preset};
use crate::environment::DayPhase;

/// Observable state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hunger: f64,
    pub fatigue: f64,
    pub injury: f64,
    pub alive: bool,
    pub mode: AgentMode,
    #[serde(rename = "E")]
    pub energy: f64,
    #[serde(rename = "T")]
    pub temperature: f64,
    pub kappa: BTreeMap<ActionKind, f64>,
    pub preset: Preset,
    pub relationships: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sleep_debt: Option<f64>,
    pub is_sleeping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchSnapshot {
    pub abundance: f64,
    pub regen: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HuntZoneSnapshot {
    pub base_success: f64,
    pub danger: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub population: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub unsafe_until: Option<Tick>,
}

/// Resource map keyed by `"x,y"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub tick: Tick,
    pub size: u32,
    pub phase: DayPhase,
    pub patches: BTreeMap<String, PatchSnapshot>,
    pub hunt_zones: BTreeMap<String, HuntZoneSnapshot>,
}

/// Complete observable state at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub tick: Tick,
    pub agents: Vec<AgentSnapshot>,
    pub environment: EnvironmentSnapshot,
}

impl Frame {
    #[must_use]
    pub fn agent(&self, name: &str) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.name == name)
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialNode {
    pub id: String,
    pub alive: bool,
    pub mode: AgentMode,
}

/// Directed affinity from `source` toward `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialLink {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Relationship graph derived from agent snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialGraph {
    pub nodes: Vec<SocialNode>,
    pub links: Vec<SocialLink>,
}

impl SocialGraph {
    /// Builds the graph; only positive affinities become links.
    #[must_use]
    pub fn from_agents(agents: &[AgentSnapshot]) -> Self {
        let nodes = agents
            .iter()
            .map(|a| SocialNode {
                id: a.name.clone(),
                alive: a.alive,
                mode: a.mode,
            })
            .collect();
        let links = agents
            .iter()
            .flat_map(|a| {
                a.relationships
                    .iter()
                    .filter(|(_, weight)| **weight > 0.0)
                    .map(|(target, weight)| SocialLink {
                        source: a.name.clone(),
                        target: target.clone(),
                        weight: *weight,
                    })
            })
            .collect();
        Self { nodes, links }
    }

    #[must_use]
    pub fn weight(&self, source: &str, target: &str) -> Option<f64> {
        self.links
            .iter()
            .find(|l| l.source == source && l.target == target)
            .map(|l| l.weight)
    }
}
