//! Tick driver: owns the environment, the roster, the randomness source and
//! the event log.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{info, trace};

use crate::agent::{Npc, TickContext};
use crate::config::SimulationConfig;
use crate::environment::Environment;
use crate::log::{LogAction, LogEntry};
use crate::rng::RandomSource;
use crate::roster::Roster;
use crate::snapshot::{AgentSnapshot, EnvironmentSnapshot, Frame, SocialGraph};
use crate::{SimulationError, Tick};

/// Aggregate statistics recorded after every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: Tick,
    pub alive: usize,
    pub deaths: usize,
    pub meals: usize,
    pub helps: usize,
    pub sleeping: usize,
    pub average_hunger: f64,
    pub average_energy: f64,
    pub average_temperature: f64,
    pub mean_abundance: f64,
    pub mean_hunt_success: f64,
}

/// Everything a host needs after one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: Tick,
    pub agents: Vec<AgentSnapshot>,
    /// Entries appended during this tick, in processing order.
    pub log: Vec<LogEntry>,
    pub environment: EnvironmentSnapshot,
    pub summary: TickSummary,
}

/// A running simulation.
pub struct Simulation {
    config: SimulationConfig,
    tick: Tick,
    rng: Box<dyn RandomSource + Send>,
    reseed_on_reset: bool,
    environment: Environment,
    roster: Roster,
    log: Vec<LogEntry>,
    history: VecDeque<TickSummary>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("agents", &self.roster.len())
            .field("alive", &self.roster.alive_count())
            .field("log_len", &self.log.len())
            .finish()
    }
}

impl Simulation {
    /// Builds a simulation seeded from `config.rng_seed`.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let rng = Box::new(config.seeded_rng());
        Self::build(config, rng, true)
    }

    /// Builds a simulation drawing from a caller-supplied source. The source
    /// is kept across resets.
    pub fn with_rng(
        config: SimulationConfig,
        rng: Box<dyn RandomSource + Send>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        Self::build(config, rng, false)
    }

    fn build(
        config: SimulationConfig,
        mut rng: Box<dyn RandomSource + Send>,
        reseed_on_reset: bool,
    ) -> Result<Self, SimulationError> {
        let environment = Environment::initialize(
            config.world_size,
            config.berry_count,
            config.hunt_zone_count,
            &config.environment,
            config.profile,
            rng.as_mut(),
        );
        let roster = Roster::from_config(&config)?;
        let history_capacity = config.history_capacity;
        info!(
            agents = roster.len(),
            patches = environment.patches().len(),
            zones = environment.zones().len(),
            seed = ?config.rng_seed,
            profile = ?config.profile,
            "simulation initialised"
        );
        Ok(Self {
            config,
            tick: Tick::zero(),
            rng,
            reseed_on_reset,
            environment,
            roster,
            log: Vec::new(),
            history: VecDeque::with_capacity(history_capacity),
        })
    }

    /// Replaces the generated resource map, e.g. with a hand-built one.
    /// A later [`Simulation::reset`] regenerates it from the configuration.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Discards all state and starts over at tick 0.
    pub fn reset(&mut self) -> Result<Frame, SimulationError> {
        if self.reseed_on_reset {
            self.rng = Box::new(self.config.seeded_rng());
        }
        self.environment = Environment::initialize(
            self.config.world_size,
            self.config.berry_count,
            self.config.hunt_zone_count,
            &self.config.environment,
            self.config.profile,
            self.rng.as_mut(),
        );
        self.roster = Roster::from_config(&self.config)?;
        self.tick = Tick::zero();
        self.log.clear();
        self.history.clear();
        info!(
            agents = self.roster.len(),
            seed = ?self.config.rng_seed,
            profile = ?self.config.profile,
            "simulation reset"
        );
        Ok(self.frame())
    }

    /// Advances every living agent once, then the environment, and reports
    /// what happened.
    pub fn advance_tick(&mut self) -> TickReport {
        let tick = self.tick.next();
        let first_new = self.log.len();

        {
            let mut ctx = TickContext {
                tick,
                config: &self.config,
                environment: &mut self.environment,
                rng: self.rng.as_mut(),
                log: &mut self.log,
            };
            for id in self.roster.ids() {
                self.roster.step(id, &mut ctx);
            }
        }
        self.environment.advance_tick(self.rng.as_mut());
        self.tick = tick;

        let entries = self.log[first_new..].to_vec();
        let summary = self.summarize(&entries);
        trace!(
            tick = tick.0,
            alive = summary.alive,
            deaths = summary.deaths,
            meals = summary.meals,
            helps = summary.helps,
            "tick complete"
        );
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary.clone());

        TickReport {
            tick,
            agents: self.roster.snapshots(),
            log: entries,
            environment: self.environment.snapshot(),
            summary,
        }
    }

    /// Advances `ticks` times, stopping early once nobody is left alive.
    /// Returns the number of ticks actually run.
    pub fn run(&mut self, ticks: u64) -> u64 {
        let mut ran = 0;
        while ran < ticks {
            self.advance_tick();
            ran += 1;
            if self.is_extinct() {
                break;
            }
        }
        ran
    }

    fn summarize(&self, entries: &[LogEntry]) -> TickSummary {
        let mut alive = 0;
        let mut sleeping = 0;
        let mut hunger = 0.0;
        let mut energy = 0.0;
        let mut temperature = 0.0;
        for (_, agent) in self.roster.iter().filter(|(_, a)| a.is_alive()) {
            alive += 1;
            if agent.is_sleeping() {
                sleeping += 1;
            }
            hunger += agent.vitals().hunger;
            energy += agent.ssd().energy();
            temperature += agent.ssd().temperature();
        }
        let mean = |total: f64| if alive > 0 { total / alive as f64 } else { 0.0 };
        TickSummary {
            tick: self.tick,
            alive,
            deaths: entries
                .iter()
                .filter(|e| e.action == LogAction::Death)
                .count(),
            meals: entries.iter().filter(|e| e.action.is_meal()).count(),
            helps: entries.iter().filter(|e| e.action.is_help()).count(),
            sleeping,
            average_hunger: mean(hunger),
            average_energy: mean(energy),
            average_temperature: mean(temperature),
            mean_abundance: self.environment.mean_abundance(),
            mean_hunt_success: self.environment.mean_hunt_success(),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame {
            tick: self.tick,
            agents: self.roster.snapshots(),
            environment: self.environment.snapshot(),
        }
    }

    #[must_use]
    pub fn social_graph(&self) -> SocialGraph {
        SocialGraph::from_agents(&self.roster.snapshots())
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn agent(&self, name: &str) -> Option<&Npc> {
        self.roster.by_name(name)
    }

    /// Mutable access for hosts scripting scenarios.
    pub fn agent_mut(&mut self, name: &str) -> Option<&mut Npc> {
        self.roster.by_name_mut(name)
    }

    /// Every entry logged since the last reset.
    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Entries logged at `tick` or later.
    #[must_use]
    pub fn log_since(&self, tick: Tick) -> &[LogEntry] {
        let start = self.log.partition_point(|e| e.tick < tick);
        &self.log[start..]
    }

    /// Recent tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    #[must_use]
    pub fn is_extinct(&self) -> bool {
        !self.roster.is_empty() && self.roster.alive_count() == 0
    }
}
