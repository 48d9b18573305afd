//! Static configuration for a simulation run.

use rand::{SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::SimulationError;
use crate::agent::Preset;
use crate::environment::GridPos;

/// Closed interval used for randomized initial values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    fn is_unit(&self) -> bool {
        self.is_ordered() && self.min >= 0.0 && self.max <= 1.0
    }
}

/// Feature toggles selecting one of the kernel variants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KernelProfile {
    /// Nearby allies raise hunt success; hunt zones track prey population.
    pub cooperation: bool,
    /// Night lowers forage/hunt success and gates sleep onset.
    pub day_night: bool,
    /// Agents accumulate sleep debt while awake and repay it asleep.
    pub sleep_debt: bool,
}

impl KernelProfile {
    /// Threshold-driven model without cooperation or circadian effects.
    #[must_use]
    pub const fn basic() -> Self {
        Self {
            cooperation: false,
            day_night: false,
            sleep_debt: false,
        }
    }

    /// Cooperative hunting with prey population depletion.
    #[must_use]
    pub const fn cooperative() -> Self {
        Self {
            cooperation: true,
            day_night: false,
            sleep_debt: false,
        }
    }

    /// Day/night cycle with sleep debt, no cooperation bonus.
    #[must_use]
    pub const fn circadian() -> Self {
        Self {
            cooperation: false,
            day_night: true,
            sleep_debt: true,
        }
    }

    /// Every feature enabled; the reference behaviour.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            cooperation: true,
            day_night: true,
            sleep_debt: true,
        }
    }
}

impl Default for KernelProfile {
    fn default() -> Self {
        Self::full()
    }
}

/// Resource generation and dynamics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentConfig {
    /// Initial berry abundance.
    pub abundance: ValueRange,
    /// Per-tick berry regeneration rate.
    pub berry_regen: ValueRange,
    /// Foraging success weight on abundance.
    pub forage_abundance_weight: f64,
    /// Foraging success weight on proximity.
    pub forage_proximity_weight: f64,
    /// Manhattan distance at which the forage proximity bonus vanishes.
    pub forage_reach: f64,
    /// Abundance removed by a successful forage.
    pub forage_depletion: ValueRange,
    /// Base food yield of a successful forage, scaled by abundance.
    pub forage_yield: ValueRange,
    /// Constant injury risk carried by every forage attempt.
    pub forage_injury_risk: f64,
    /// Initial hunt zone success rate.
    pub hunt_success: ValueRange,
    /// Hunt zone danger.
    pub hunt_danger: ValueRange,
    /// Standard deviation of the per-tick success random walk.
    pub success_drift: f64,
    /// Bounds the success random walk is clipped to.
    pub success_bounds: ValueRange,
    /// Manhattan distance at which the hunt proximity factor bottoms out.
    pub hunt_reach: f64,
    /// Floor of the hunt proximity factor.
    pub hunt_min_proximity: f64,
    /// Bounds applied to the final hunt probability.
    pub hunt_probability_bounds: ValueRange,
    /// Base food yield of a successful hunt.
    pub hunt_yield: ValueRange,
    /// Distance scale of hunt injury risk: `danger * (0.9 + d / scale)`.
    pub hunt_risk_distance_scale: f64,
    /// Initial prey population (cooperative profile only).
    pub population: ValueRange,
    /// Per-tick prey regeneration toward 1.0.
    pub population_regen: f64,
    /// Population removed by a successful hunt.
    pub population_depletion: ValueRange,
    /// Ticks a zone stays unsafe after an injurious failed hunt.
    pub unsafe_window: u64,
    /// Ticks in one full day.
    pub day_length: u64,
    /// Fraction of the day that is night.
    pub night_fraction: f64,
    /// Multiplier on forage/hunt success at night.
    pub night_light: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            abundance: ValueRange::new(0.1, 0.3),
            berry_regen: ValueRange::new(0.001, 0.008),
            forage_abundance_weight: 0.6,
            forage_proximity_weight: 0.2,
            forage_reach: 12.0,
            forage_depletion: ValueRange::new(0.2, 0.4),
            forage_yield: ValueRange::new(10.0, 20.0),
            forage_injury_risk: 0.05,
            hunt_success: ValueRange::new(0.10, 0.30),
            hunt_danger: ValueRange::new(0.35, 0.75),
            success_drift: 0.01,
            success_bounds: ValueRange::new(0.03, 0.8),
            hunt_reach: 14.0,
            hunt_min_proximity: 0.15,
            hunt_probability_bounds: ValueRange::new(0.01, 0.95),
            hunt_yield: ValueRange::new(20.0, 45.0),
            hunt_risk_distance_scale: 18.0,
            population: ValueRange::new(0.6, 1.0),
            population_regen: 0.02,
            population_depletion: ValueRange::new(0.1, 0.2),
            unsafe_window: 10,
            day_length: 24,
            night_fraction: 0.35,
            night_light: 0.7,
        }
    }
}

/// Coefficients of the SSD recurrences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SsdParams {
    /// Habit strength of an action never tried before.
    pub kappa_default: f64,
    /// Floor habit strength decays toward.
    pub kappa_min: f64,
    /// Baseline alignment conductance `G0`.
    pub g0: f64,
    /// Habit gain on conductance `g`.
    pub g: f64,
    /// Learning rate `η` on success.
    pub eta: f64,
    /// Forgetting rate `λ`.
    pub lambda_forget: f64,
    /// Weakening rate `ρ` on failure.
    pub rho: f64,
    /// Pressure gain `α` on unprocessed meaning pressure.
    pub alpha: f64,
    /// Pressure decay `β`.
    pub beta: f64,
    /// Base leap threshold `Θ0`.
    pub theta0: f64,
    /// Threshold gain on mean habit strength.
    pub a1: f64,
    /// Threshold loss on fatigue.
    pub a2: f64,
    /// Base hazard `h0`.
    pub h0: f64,
    /// Hazard sharpness `γ`.
    pub gamma: f64,
    /// Base temperature `T0`.
    pub t0: f64,
    /// Temperature gain on pressure.
    pub c1: f64,
    /// Temperature loss on habit dispersion.
    pub c2: f64,
    /// Dispersion assumed while fewer than two habits exist.
    pub default_dispersion: f64,
    /// Temperature clip.
    pub temperature_bounds: ValueRange,
    /// Temperature at reset.
    pub initial_temperature: f64,
}

impl Default for SsdParams {
    fn default() -> Self {
        Self {
            kappa_default: 0.1,
            kappa_min: 0.05,
            g0: 0.5,
            g: 0.7,
            eta: 0.3,
            lambda_forget: 0.02,
            rho: 0.1,
            alpha: 0.6,
            beta: 0.15,
            theta0: 1.0,
            a1: 0.5,
            a2: 0.4,
            h0: 0.2,
            gamma: 0.8,
            t0: 0.3,
            c1: 0.5,
            c2: 0.6,
            default_dispersion: 0.5,
            temperature_bounds: ValueRange::new(0.1, 1.0),
            initial_temperature: 0.3,
        }
    }
}

/// Thresholds and rates driving the per-tick decision loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorParams {
    pub initial_hunger: f64,
    pub initial_fatigue: f64,
    /// Hunger added every tick.
    pub hunger_rate: f64,
    /// Fatigue added every tick.
    pub fatigue_rate: f64,
    /// Injury added per unit of `fatigue / 100`.
    pub injury_from_fatigue: f64,
    /// Soft cap on hunger, fatigue and injury.
    pub vital_cap: f64,
    /// Cap applied when an action (not metabolism) raises a vital.
    pub action_cap: f64,
    /// Vital level at which the leap check starts firing.
    pub crisis_level: f64,
    /// Vital level that kills outright.
    pub death_ceiling: f64,
    /// Hunger above which the agent seeks food.
    pub hunger_threshold: f64,
    /// Fatigue above which the agent rests.
    pub fatigue_threshold: f64,
    /// Rest needs hunger below `hunger_threshold * rest_hunger_margin`.
    pub rest_hunger_margin: f64,
    /// Base fatigue removed by resting.
    pub rest_amount: f64,
    /// Manhattan radius scanned for help targets.
    pub help_radius: i32,
    /// Help utility needed before acting.
    pub help_activation: f64,
    /// Hunger transferred by `share_food`.
    pub share_amount: f64,
    /// Manhattan radius counted for cooperative hunting.
    pub cooperation_radius: i32,
    /// Hunt bonus per nearby ally.
    pub cooperation_bonus: f64,
    /// Nearest berry patches considered when foraging.
    pub forage_candidates: usize,
    /// Nearest hunt zones considered when hunting.
    pub hunt_candidates: usize,
    /// Utility lost per step of distance to a target.
    pub distance_penalty: f64,
    /// Risk tolerance above which hunting alone is acceptable.
    pub solo_hunt_risk_tolerance: f64,
    /// Consecutive adjacent failures that suppress a patch.
    pub forage_failure_limit: u32,
    /// Chance per search tick of clearing suppressed patches.
    pub forage_failure_reset_chance: f64,
    /// Avoidance at or above which open unsafe windows are respected.
    pub unsafe_avoidance: f64,
    /// Injury at or above which open unsafe windows are respected.
    pub unsafe_injury: f64,
    /// Boredom accrued per patrol tick.
    pub boredom_rate: f64,
    /// Fraction of boredom fed back as pressure.
    pub boredom_pressure: f64,
    /// Search moves within `floor(T * search_radius_scale)`.
    pub search_radius_scale: f64,
    /// Patrol moves within `floor(T * patrol_radius_scale)`.
    pub patrol_radius_scale: f64,
    /// Upper bound of sleep debt.
    pub sleep_debt_cap: f64,
    /// Sleep debt accrued per waking tick.
    pub sleep_debt_rate: f64,
    /// Extra multiplier on debt accrual at night.
    pub night_debt_multiplier: f64,
    /// Sleep debt repaid per sleeping tick.
    pub sleep_recovery: f64,
    /// Fatigue removed per sleeping tick.
    pub sleep_fatigue_recovery: f64,
    /// Fatigue needed to fall asleep at night.
    pub sleep_fatigue_threshold: f64,
    /// Sleep debt forcing sleep regardless of the hour.
    pub sleep_debt_limit: f64,
    /// Sleep debt below which the agent wakes in daylight.
    pub wake_debt: f64,
    /// Hunger that wakes a sleeping agent.
    pub wake_hunger: f64,
    /// Metabolic hunger multiplier while asleep.
    pub sleeping_hunger_factor: f64,
}

impl Default for BehaviorParams {
    fn default() -> Self {
        Self {
            initial_hunger: 50.0,
            initial_fatigue: 30.0,
            hunger_rate: 1.8,
            fatigue_rate: 0.8,
            injury_from_fatigue: 0.02,
            vital_cap: 120.0,
            action_cap: 100.0,
            crisis_level: 100.0,
            death_ceiling: 110.0,
            hunger_threshold: 55.0,
            fatigue_threshold: 70.0,
            rest_hunger_margin: 0.9,
            rest_amount: 30.0,
            help_radius: 3,
            help_activation: 0.05,
            share_amount: 25.0,
            cooperation_radius: 4,
            cooperation_bonus: 0.15,
            forage_candidates: 4,
            hunt_candidates: 3,
            distance_penalty: 0.5,
            solo_hunt_risk_tolerance: 0.4,
            forage_failure_limit: 3,
            forage_failure_reset_chance: 0.1,
            unsafe_avoidance: 0.5,
            unsafe_injury: 30.0,
            boredom_rate: 0.05,
            boredom_pressure: 0.1,
            search_radius_scale: 3.0,
            patrol_radius_scale: 2.0,
            sleep_debt_cap: 200.0,
            sleep_debt_rate: 1.0,
            night_debt_multiplier: 1.5,
            sleep_recovery: 6.0,
            sleep_fatigue_recovery: 12.0,
            sleep_fatigue_threshold: 50.0,
            sleep_debt_limit: 150.0,
            wake_debt: 40.0,
            wake_hunger: 70.0,
            sleeping_hunger_factor: 0.6,
        }
    }
}

/// One roster entry created at reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSpec {
    pub name: String,
    pub preset: Preset,
    /// Starting cell; `None` places the agent at the grid centre.
    pub start: Option<GridPos>,
}

impl AgentSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, preset: Preset, start: Option<GridPos>) -> Self {
        Self {
            name: name.into(),
            preset,
            start,
        }
    }
}

/// Static configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Side length of the square grid.
    pub world_size: u32,
    /// Berry patches placed at reset.
    pub berry_count: usize,
    /// Hunt zones placed at reset.
    pub hunt_zone_count: usize,
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
    pub profile: KernelProfile,
    pub environment: EnvironmentConfig,
    pub ssd: SsdParams,
    pub behavior: BehaviorParams,
    pub roster: Vec<AgentSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let world_size = 26;
        Self {
            world_size,
            berry_count: 4,
            hunt_zone_count: 5,
            rng_seed: None,
            history_capacity: 256,
            profile: KernelProfile::default(),
            environment: EnvironmentConfig::default(),
            ssd: SsdParams::default(),
            behavior: BehaviorParams::default(),
            roster: default_roster(world_size),
        }
    }
}

/// The five reference personalities, clustered around the grid centre.
#[must_use]
pub fn default_roster(world_size: u32) -> Vec<AgentSpec> {
    let c = (world_size / 2) as i32;
    let entry = |name: &str, preset: Preset, dx: i32, dy: i32| {
        AgentSpec::new(name, preset, Some(GridPos::new(c + dx, c + dy)))
    };
    vec![
        entry("Forager_A", Preset::new(0.2, 0.3, 0.8, 0.6, 0.8), -2, 0),
        entry("Tracker_B", Preset::new(0.6, 0.5, 0.2, 0.8, 0.6), 2, -1),
        entry("Pioneer_C", Preset::new(0.5, 0.9, 0.3, 0.7, 0.5), 0, 2),
        entry("Guardian_D", Preset::new(0.4, 0.4, 0.6, 0.9, 0.9), -1, -2),
        entry("Scavenger_E", Preset::new(0.3, 0.6, 0.7, 0.5, 0.5), 1, 1),
    ]
}

impl SimulationConfig {
    /// Default configuration with a fixed seed and the given profile.
    #[must_use]
    pub fn seeded(seed: u64, profile: KernelProfile) -> Self {
        Self {
            rng_seed: Some(seed),
            profile,
            ..Self::default()
        }
    }

    /// Checks every value the kernel relies on being in range.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.world_size == 0 || self.world_size > i32::MAX as u32 {
            return Err(SimulationError::InvalidConfig(
                "world_size must be positive",
            ));
        }
        if self.history_capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        self.validate_environment()?;
        self.validate_ssd()?;
        self.validate_behavior()?;
        self.validate_roster()
    }

    fn validate_environment(&self) -> Result<(), SimulationError> {
        let env = &self.environment;
        let unit_ranges = [
            env.abundance,
            env.berry_regen,
            env.forage_depletion,
            env.hunt_success,
            env.hunt_danger,
            env.success_bounds,
            env.hunt_probability_bounds,
            env.population,
            env.population_depletion,
        ];
        if !unit_ranges.iter().all(ValueRange::is_unit) {
            return Err(SimulationError::InvalidConfig(
                "environment ranges must be ordered and within [0, 1]",
            ));
        }
        if !env.forage_yield.is_ordered()
            || !env.hunt_yield.is_ordered()
            || env.forage_yield.min < 0.0
            || env.hunt_yield.min < 0.0
        {
            return Err(SimulationError::InvalidConfig(
                "food yields must be ordered and non-negative",
            ));
        }
        if env.forage_reach <= 0.0 || env.hunt_reach <= 0.0 || env.hunt_risk_distance_scale <= 0.0
        {
            return Err(SimulationError::InvalidConfig(
                "reach and distance scales must be positive",
            ));
        }
        if env.success_drift < 0.0
            || !(0.0..=1.0).contains(&env.population_regen)
            || !(0.0..=1.0).contains(&env.forage_injury_risk)
            || !(0.0..=1.0).contains(&env.night_light)
            || !(0.0..=1.0).contains(&env.night_fraction)
            || !(0.0..=1.0).contains(&env.hunt_min_proximity)
        {
            return Err(SimulationError::InvalidConfig(
                "drift must be non-negative and rates/factors within [0, 1]",
            ));
        }
        if env.day_length == 0 {
            return Err(SimulationError::InvalidConfig(
                "day_length must be non-zero",
            ));
        }
        Ok(())
    }

    fn validate_ssd(&self) -> Result<(), SimulationError> {
        let ssd = &self.ssd;
        if ssd.kappa_min < 0.0 || ssd.kappa_default < ssd.kappa_min {
            return Err(SimulationError::InvalidConfig(
                "kappa_default must be at least kappa_min, which must be non-negative",
            ));
        }
        if ssd.gamma <= 0.0 {
            return Err(SimulationError::InvalidConfig("gamma must be positive"));
        }
        if !(0.0..=1.0).contains(&ssd.beta) || !(0.0..=1.0).contains(&ssd.lambda_forget) {
            return Err(SimulationError::InvalidConfig(
                "beta and lambda_forget must be within [0, 1]",
            ));
        }
        if [ssd.g0, ssd.g, ssd.eta, ssd.rho, ssd.alpha, ssd.h0]
            .iter()
            .any(|v| *v < 0.0)
        {
            return Err(SimulationError::InvalidConfig(
                "SSD gains and rates must be non-negative",
            ));
        }
        let bounds = ssd.temperature_bounds;
        if !bounds.is_ordered() || !bounds.contains(ssd.initial_temperature) {
            return Err(SimulationError::InvalidConfig(
                "initial_temperature must lie within ordered temperature_bounds",
            ));
        }
        Ok(())
    }

    fn validate_behavior(&self) -> Result<(), SimulationError> {
        let b = &self.behavior;
        if b.hunger_rate < 0.0
            || b.fatigue_rate < 0.0
            || b.injury_from_fatigue < 0.0
            || b.rest_amount < 0.0
            || b.share_amount < 0.0
            || b.boredom_rate < 0.0
            || b.sleep_debt_rate < 0.0
            || b.sleep_recovery < 0.0
            || b.sleep_fatigue_recovery < 0.0
        {
            return Err(SimulationError::InvalidConfig(
                "behavior rates must be non-negative",
            ));
        }
        if b.vital_cap <= 0.0
            || b.action_cap > b.vital_cap
            || b.crisis_level > b.death_ceiling
            || b.death_ceiling > b.vital_cap
        {
            return Err(SimulationError::InvalidConfig(
                "vital caps must satisfy crisis <= ceiling <= vital_cap and action_cap <= vital_cap",
            ));
        }
        if !(0.0..=b.vital_cap).contains(&b.initial_hunger)
            || !(0.0..=b.vital_cap).contains(&b.initial_fatigue)
        {
            return Err(SimulationError::InvalidConfig(
                "initial vitals must lie within [0, vital_cap]",
            ));
        }
        if b.hunger_threshold >= b.crisis_level {
            return Err(SimulationError::InvalidConfig(
                "hunger_threshold must be below crisis_level",
            ));
        }
        if b.help_radius < 0 || b.cooperation_radius < 0 {
            return Err(SimulationError::InvalidConfig(
                "radii must be non-negative",
            ));
        }
        if b.sleep_debt_cap <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "sleep_debt_cap must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&b.forage_failure_reset_chance) {
            return Err(SimulationError::InvalidConfig(
                "forage_failure_reset_chance must be within [0, 1]",
            ));
        }
        Ok(())
    }

    fn validate_roster(&self) -> Result<(), SimulationError> {
        let mut names = BTreeSet::new();
        let size = self.world_size as i32;
        for spec in &self.roster {
            if spec.name.trim().is_empty() {
                return Err(SimulationError::InvalidConfig(
                    "agent names must be non-empty",
                ));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(SimulationError::DuplicateAgent(spec.name.clone()));
            }
            if !spec.preset.is_valid() {
                return Err(SimulationError::InvalidConfig(
                    "preset traits must lie within [0, 1]",
                ));
            }
            if let Some(start) = spec.start {
                if start.x < 0 || start.y < 0 || start.x >= size || start.y >= size {
                    return Err(SimulationError::StartOutOfBounds {
                        name: spec.name.clone(),
                        x: start.x,
                        y: start.y,
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns the configured RNG, generating a seed from entropy if absent.
    pub(crate) fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => {
                let seed: u64 = rand::random();
                SmallRng::seed_from_u64(seed)
            }
        }
    }
}
