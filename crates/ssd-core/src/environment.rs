//! Shared resource map: berry patches, hunt zones and the day/night clock.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{EnvironmentConfig, KernelProfile};
use crate::rng::RandomSource;
use crate::snapshot::{EnvironmentSnapshot, HuntZoneSnapshot, PatchSnapshot};
use crate::{Tick, clip};

/// Integer grid cell.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn manhattan(self, other: Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// One step toward `target`, closing the x gap before the y gap.
    #[must_use]
    pub fn step_toward(self, target: Self) -> Self {
        if self.x != target.x {
            Self::new(self.x + (target.x - self.x).signum(), self.y)
        } else {
            Self::new(self.x, self.y + (target.y - self.y).signum())
        }
    }

    /// Offsets the position and clamps it onto a `size`×`size` grid.
    #[must_use]
    pub fn offset_within(self, dx: i32, dy: i32, size: u32) -> Self {
        let max = size.saturating_sub(1) as i32;
        Self::new((self.x + dx).clamp(0, max), (self.y + dy).clamp(0, max))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Index of a berry patch inside its [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchId(pub usize);

/// Index of a hunt zone inside its [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub usize);

/// Regenerating food source foraged by agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BerryPatch {
    pub position: GridPos,
    /// Remaining food, always within `[0, 1]`.
    pub abundance: f64,
    pub regen: f64,
}

/// Area where agents hunt prey at some risk of injury.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HuntZone {
    pub position: GridPos,
    pub base_success: f64,
    pub danger: f64,
    /// Prey left, tracked only when cooperative hunting is enabled.
    pub population: Option<f64>,
    /// Zone is considered unsafe while the current tick is before this one.
    pub unsafe_until: Option<Tick>,
}

/// Light conditions of the active tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DayPhase {
    Day,
    Night,
}

/// Result of one forage attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForageOutcome {
    pub success: bool,
    pub food: f64,
    pub injury_risk: f64,
    pub probability: f64,
}

/// Result of one hunt attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HuntOutcome {
    pub success: bool,
    pub food: f64,
    pub injury_risk: f64,
    pub probability: f64,
}

trait Located {
    fn position(&self) -> GridPos;
}

impl Located for BerryPatch {
    fn position(&self) -> GridPos {
        self.position
    }
}

impl Located for HuntZone {
    fn position(&self) -> GridPos {
        self.position
    }
}

/// Indices of the `k` items closest to `origin`; equal distances keep
/// insertion order.
fn nearest<T: Located>(items: &[T], origin: GridPos, k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&idx| items[idx].position().manhattan(origin));
    order.truncate(k);
    order
}

/// Places `item` keyed by position: an occupied cell is overwritten in place.
fn place<T: Located>(items: &mut Vec<T>, item: T) {
    match items
        .iter_mut()
        .find(|existing| existing.position() == item.position())
    {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

/// Spatial resource state shared by every agent.
#[derive(Debug, Clone)]
pub struct Environment {
    size: u32,
    elapsed: Tick,
    patches: Vec<BerryPatch>,
    zones: Vec<HuntZone>,
    config: EnvironmentConfig,
    profile: KernelProfile,
}

impl Environment {
    /// Scatters patches and zones over uniformly random cells.
    pub fn initialize(
        size: u32,
        berry_count: usize,
        hunt_zone_count: usize,
        config: &EnvironmentConfig,
        profile: KernelProfile,
        rng: &mut dyn RandomSource,
    ) -> Self {
        let mut patches = Vec::with_capacity(berry_count);
        for _ in 0..berry_count {
            let position = GridPos::new(rng.below(size) as i32, rng.below(size) as i32);
            let patch = BerryPatch {
                position,
                abundance: rng.range(config.abundance.min, config.abundance.max),
                regen: rng.range(config.berry_regen.min, config.berry_regen.max),
            };
            place(&mut patches, patch);
        }

        let mut zones = Vec::with_capacity(hunt_zone_count);
        for _ in 0..hunt_zone_count {
            let position = GridPos::new(rng.below(size) as i32, rng.below(size) as i32);
            let base_success = rng.range(config.hunt_success.min, config.hunt_success.max);
            let danger = rng.range(config.hunt_danger.min, config.hunt_danger.max);
            let population = profile
                .cooperation
                .then(|| rng.range(config.population.min, config.population.max));
            let zone = HuntZone {
                position,
                base_success,
                danger,
                population,
                unsafe_until: None,
            };
            place(&mut zones, zone);
        }

        Self::with_entities(size, config, profile, patches, zones)
    }

    /// Builds an environment from explicit entities.
    pub fn with_entities(
        size: u32,
        config: &EnvironmentConfig,
        profile: KernelProfile,
        patches: Vec<BerryPatch>,
        zones: Vec<HuntZone>,
    ) -> Self {
        let mut placed_patches = Vec::with_capacity(patches.len());
        for patch in patches {
            place(&mut placed_patches, patch);
        }
        let mut placed_zones = Vec::with_capacity(zones.len());
        for zone in zones {
            place(&mut placed_zones, zone);
        }
        Self {
            size,
            elapsed: Tick::zero(),
            patches: placed_patches,
            zones: placed_zones,
            config: config.clone(),
            profile,
        }
    }

    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Ticks fully processed so far.
    #[must_use]
    pub const fn elapsed(&self) -> Tick {
        self.elapsed
    }

    /// Tick currently being processed by agents.
    #[must_use]
    pub const fn active_tick(&self) -> Tick {
        self.elapsed.next()
    }

    #[must_use]
    pub fn patches(&self) -> &[BerryPatch] {
        &self.patches
    }

    #[must_use]
    pub fn zones(&self) -> &[HuntZone] {
        &self.zones
    }

    #[must_use]
    pub fn patch(&self, id: PatchId) -> Option<&BerryPatch> {
        self.patches.get(id.0)
    }

    #[must_use]
    pub fn zone(&self, id: ZoneId) -> Option<&HuntZone> {
        self.zones.get(id.0)
    }

    /// Day or night for `tick`; always day without the day/night profile.
    #[must_use]
    pub fn day_phase(&self, tick: Tick) -> DayPhase {
        if !self.profile.day_night {
            return DayPhase::Day;
        }
        let day_length = self.config.day_length.max(1);
        let hour = (tick.0 % day_length) as f64;
        let dusk = day_length as f64 * (1.0 - self.config.night_fraction);
        if hour >= dusk {
            DayPhase::Night
        } else {
            DayPhase::Day
        }
    }

    fn light_factor(&self) -> f64 {
        match self.day_phase(self.active_tick()) {
            DayPhase::Day => 1.0,
            DayPhase::Night => self.config.night_light,
        }
    }

    /// End-of-tick dynamics: regrowth, success drift, prey recovery and
    /// expiry of unsafe windows.
    pub fn advance_tick(&mut self, rng: &mut dyn RandomSource) {
        for patch in &mut self.patches {
            patch.abundance = clip(
                patch.abundance + patch.regen * (1.0 - patch.abundance),
                0.0,
                1.0,
            );
        }

        self.elapsed = self.elapsed.next();
        let bounds = self.config.success_bounds;
        for zone in &mut self.zones {
            let drift = rng.normal(0.0, self.config.success_drift);
            zone.base_success = clip(zone.base_success + drift, bounds.min, bounds.max);
            if let Some(population) = zone.population.as_mut() {
                *population = clip(
                    *population + self.config.population_regen * (1.0 - *population),
                    0.0,
                    1.0,
                );
            }
            if zone.unsafe_until.is_some_and(|until| self.elapsed >= until) {
                zone.unsafe_until = None;
            }
        }
    }

    /// The `k` patches nearest to `position`.
    #[must_use]
    pub fn nearest_patches(&self, position: GridPos, k: usize) -> Vec<PatchId> {
        nearest(&self.patches, position, k)
            .into_iter()
            .map(PatchId)
            .collect()
    }

    /// The `k` hunt zones nearest to `position`.
    #[must_use]
    pub fn nearest_zones(&self, position: GridPos, k: usize) -> Vec<ZoneId> {
        nearest(&self.zones, position, k)
            .into_iter()
            .map(ZoneId)
            .collect()
    }

    /// Resolves a forage attempt from `position` against `target`.
    pub fn forage(
        &mut self,
        position: GridPos,
        target: PatchId,
        rng: &mut dyn RandomSource,
    ) -> ForageOutcome {
        let light = self.light_factor();
        let config = &self.config;
        let Some(patch) = self.patches.get_mut(target.0) else {
            return ForageOutcome::default();
        };

        let abundance = patch.abundance;
        let distance = f64::from(position.manhattan(patch.position));
        let proximity = (1.0 - distance / config.forage_reach).max(0.0);
        let probability = clip(
            (config.forage_abundance_weight * abundance
                + config.forage_proximity_weight * proximity)
                * light,
            0.0,
            1.0,
        );

        let success = rng.chance(probability);
        let mut food = 0.0;
        if success {
            let depletion = rng.range(config.forage_depletion.min, config.forage_depletion.max);
            patch.abundance = clip(patch.abundance - depletion, 0.0, 1.0);
            food = rng.range(config.forage_yield.min, config.forage_yield.max)
                * (0.5 + abundance / 2.0);
        }

        ForageOutcome {
            success,
            food,
            injury_risk: config.forage_injury_risk,
            probability,
        }
    }

    /// Resolves a hunt attempt from `position` against `target`.
    pub fn hunt(
        &mut self,
        position: GridPos,
        target: ZoneId,
        injury_factor: f64,
        coop_bonus: f64,
        rng: &mut dyn RandomSource,
    ) -> HuntOutcome {
        let light = self.light_factor();
        let config = &self.config;
        let Some(zone) = self.zones.get_mut(target.0) else {
            return HuntOutcome::default();
        };

        let base = zone.base_success;
        let distance = f64::from(position.manhattan(zone.position));
        let proximity = (1.0 - distance / config.hunt_reach).max(config.hunt_min_proximity);
        let prey = zone.population.map_or(1.0, |p| 0.25 + 0.75 * p);
        let bounds = config.hunt_probability_bounds;
        let probability = clip(
            base * proximity * injury_factor.max(0.0) * (1.0 + coop_bonus) * prey * light,
            bounds.min,
            bounds.max,
        );

        let success = rng.chance(probability);
        let mut food = 0.0;
        if success {
            food = rng.range(config.hunt_yield.min, config.hunt_yield.max)
                * (0.5 + base / 2.0)
                * (1.0 + 0.25 * coop_bonus);
            if let Some(population) = zone.population.as_mut() {
                let taken = rng.range(
                    config.population_depletion.min,
                    config.population_depletion.max,
                );
                *population = clip(*population - taken, 0.0, 1.0);
            }
        }

        HuntOutcome {
            success,
            food,
            injury_risk: zone.danger * (0.9 + distance / config.hunt_risk_distance_scale),
            probability,
        }
    }

    /// Flags `zone` unsafe for `duration` ticks starting at `tick`.
    pub fn mark_unsafe(&mut self, zone: ZoneId, tick: Tick, duration: u64) {
        if let Some(zone) = self.zones.get_mut(zone.0) {
            zone.unsafe_until = Some(tick.after(duration));
        }
    }

    /// Flags `zone` unsafe for the configured window.
    pub fn mark_unsafe_default(&mut self, zone: ZoneId, tick: Tick) {
        self.mark_unsafe(zone, tick, self.config.unsafe_window);
    }

    #[must_use]
    pub fn is_unsafe(&self, zone: ZoneId, tick: Tick) -> bool {
        self.zone(zone)
            .and_then(|z| z.unsafe_until)
            .is_some_and(|until| tick < until)
    }

    /// Plain-data view keyed by `"x,y"`.
    #[must_use]
    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            tick: self.elapsed,
            size: self.size,
            phase: self.day_phase(self.elapsed),
            patches: self
                .patches
                .iter()
                .map(|p| {
                    (
                        p.position.to_string(),
                        PatchSnapshot {
                            abundance: p.abundance,
                            regen: p.regen,
                        },
                    )
                })
                .collect(),
            hunt_zones: self
                .zones
                .iter()
                .map(|z| {
                    (
                        z.position.to_string(),
                        HuntZoneSnapshot {
                            base_success: z.base_success,
                            danger: z.danger,
                            population: z.population,
                            unsafe_until: z.unsafe_until,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Mean abundance over all patches (0 when none exist).
    #[must_use]
    pub fn mean_abundance(&self) -> f64 {
        if self.patches.is_empty() {
            return 0.0;
        }
        self.patches.iter().map(|p| p.abundance).sum::<f64>() / self.patches.len() as f64
    }

    /// Mean base success over all zones (0 when none exist).
    #[must_use]
    pub fn mean_hunt_success(&self) -> f64 {
        if self.zones.is_empty() {
            return 0.0;
        }
        self.zones.iter().map(|z| z.base_success).sum::<f64>() / self.zones.len() as f64
    }
}
