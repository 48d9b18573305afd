//! NPC state and the self-contained phases of its per-tick decision loop.
//!
//! Phases that touch a peer (helping) live in [`crate::roster`]; everything
//! here reads and writes only the agent itself plus the shared environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{AgentSpec, BehaviorParams, SimulationConfig};
use crate::environment::{DayPhase, Environment, GridPos, PatchId, ZoneId};
use crate::log::{LeapDiagnostics, LogAction, LogEntry, SsdReading};
use crate::rng::RandomSource;
use crate::snapshot::AgentSnapshot;
use crate::ssd::SsdState;
use crate::{Tick, clip};

/// Fixed personality traits, all within `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub risk_tolerance: f64,
    pub curiosity: f64,
    pub avoidance: f64,
    pub stamina: f64,
    pub empathy: f64,
}

impl Preset {
    #[must_use]
    pub const fn new(
        risk_tolerance: f64,
        curiosity: f64,
        avoidance: f64,
        stamina: f64,
        empathy: f64,
    ) -> Self {
        Self {
            risk_tolerance,
            curiosity,
            avoidance,
            stamina,
            empathy,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        [
            self.risk_tolerance,
            self.curiosity,
            self.avoidance,
            self.stamina,
            self.empathy,
        ]
        .iter()
        .all(|v| (0.0..=1.0).contains(v))
    }
}

/// Biological needs; values above 100 signal a crisis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vitals {
    pub hunger: f64,
    pub fatigue: f64,
    pub injury: f64,
}

/// Action kinds tracked by habit strength.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Rest,
    Forage,
    Hunt,
    Help,
}

/// Coarse behavioural state shown to observers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentMode {
    #[default]
    Idle,
    Sleep,
    Help,
    Hunt,
    Food,
    Patrol,
    Searching,
    Dead,
}

/// Circadian bookkeeping.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SleepState {
    /// Accumulated sleep debt within `[0, sleep_debt_cap]`.
    pub debt: f64,
    pub sleeping: bool,
}

/// Per-tick state borrowed from the driver while one agent steps.
pub(crate) struct TickContext<'a> {
    pub tick: Tick,
    pub config: &'a SimulationConfig,
    pub environment: &'a mut Environment,
    pub rng: &'a mut dyn RandomSource,
    pub log: &'a mut Vec<LogEntry>,
}

impl TickContext<'_> {
    pub fn is_night(&self) -> bool {
        self.environment.day_phase(self.tick) == DayPhase::Night
    }
}

/// Whether a sleeping agent stayed asleep this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SleepProgress {
    Awake,
    Asleep,
    Woke,
}

// Scales converting vitals into unmet need for help utility.
const NEED_HUNGER_SCALE: f64 = 40.0;
const NEED_INJURY_BASE: f64 = 15.0;
const NEED_INJURY_SCALE: f64 = 50.0;
const NEED_FATIGUE_SCALE: f64 = 50.0;

const SCRAPE_INJURY: (f64, f64) = (1.0, 4.0);
const HUNT_HIT_INJURY: (f64, f64) = (5.0, 20.0);
const HUNT_MISS_INJURY: (f64, f64) = (10.0, 30.0);
const HUNT_MISS_FATIGUE: f64 = 10.0;
const HUNT_MISS_RISK: f64 = 1.2;
const HUNT_INJURY_DIVISOR: f64 = 150.0;
const REST_HUNGER_COST: f64 = 6.0;

/// Adds `amount` to `value` without exceeding `cap`; values already past
/// the cap are left alone.
pub(crate) fn raise(value: f64, amount: f64, cap: f64) -> f64 {
    if value >= cap {
        value
    } else {
        (value + amount).min(cap)
    }
}

fn lower(value: f64, amount: f64) -> f64 {
    (value - amount).max(0.0)
}

/// An autonomous forager.
#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub(crate) name: String,
    pub(crate) preset: Preset,
    pub(crate) position: GridPos,
    pub(crate) vitals: Vitals,
    pub(crate) alive: bool,
    pub(crate) mode: AgentMode,
    pub(crate) ssd: SsdState,
    pub(crate) relationship: BTreeMap<String, f64>,
    pub(crate) help_debt: BTreeMap<String, f64>,
    pub(crate) forage_failures: BTreeMap<GridPos, u32>,
    pub(crate) boredom: f64,
    pub(crate) sleep: Option<SleepState>,
}

impl Npc {
    /// Creates a fresh agent at `start`.
    #[must_use]
    pub fn new(spec: &AgentSpec, start: GridPos, config: &SimulationConfig) -> Self {
        let circadian = config.profile.day_night || config.profile.sleep_debt;
        Self {
            name: spec.name.clone(),
            preset: spec.preset,
            position: start,
            vitals: Vitals {
                hunger: config.behavior.initial_hunger,
                fatigue: config.behavior.initial_fatigue,
                injury: 0.0,
            },
            alive: true,
            mode: AgentMode::Idle,
            ssd: SsdState::new(&config.ssd),
            relationship: BTreeMap::new(),
            help_debt: BTreeMap::new(),
            forage_failures: BTreeMap::new(),
            boredom: 0.0,
            sleep: circadian.then(SleepState::default),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn preset(&self) -> &Preset {
        &self.preset
    }

    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    #[must_use]
    pub const fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    /// Mutable vitals, for hosts scripting scenarios.
    pub fn vitals_mut(&mut self) -> &mut Vitals {
        &mut self.vitals
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    #[must_use]
    pub const fn mode(&self) -> AgentMode {
        self.mode
    }

    #[must_use]
    pub const fn ssd(&self) -> &SsdState {
        &self.ssd
    }

    #[must_use]
    pub const fn sleep(&self) -> Option<&SleepState> {
        self.sleep.as_ref()
    }

    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.sleep.is_some_and(|s| s.sleeping)
    }

    /// Affinity toward `peer` (0 when unknown).
    #[must_use]
    pub fn relationship(&self, peer: &str) -> f64 {
        self.relationship.get(peer).copied().unwrap_or(0.0)
    }

    /// Help this agent owes `peer` (0 when unknown).
    #[must_use]
    pub fn help_debt(&self, peer: &str) -> f64 {
        self.help_debt.get(peer).copied().unwrap_or(0.0)
    }

    pub(crate) fn relationship_entry(&mut self, peer: &str) -> &mut f64 {
        self.relationship.entry(peer.to_owned()).or_insert(0.0)
    }

    pub(crate) fn help_debt_entry(&mut self, peer: &str) -> &mut f64 {
        self.help_debt.entry(peer.to_owned()).or_insert(0.0)
    }

    /// Unmet needs beyond comfort thresholds.
    #[must_use]
    pub fn unmet_need(&self, behavior: &BehaviorParams) -> f64 {
        let v = &self.vitals;
        ((v.hunger - behavior.hunger_threshold) / NEED_HUNGER_SCALE).max(0.0)
            + ((v.injury - NEED_INJURY_BASE) / NEED_INJURY_SCALE).max(0.0)
            + ((v.fatigue - behavior.fatigue_threshold) / NEED_FATIGUE_SCALE).max(0.0)
    }

    /// How worthwhile helping `target` looks from this agent's perspective.
    #[must_use]
    pub fn help_utility(&self, target: &Npc, behavior: &BehaviorParams) -> f64 {
        let need = target.unmet_need(behavior);
        let inclination = 0.35 * self.preset.empathy
            + 0.4 * self.relationship(&target.name)
            + 0.35 * self.help_debt(&target.name);
        need * inclination - 0.4 * self.unmet_need(behavior)
    }

    pub(crate) fn entry(&self, tick: Tick, action: LogAction) -> LogEntry {
        LogEntry {
            tick,
            agent: self.name.clone(),
            mode: self.mode,
            action,
            target: None,
            amount: None,
            vitals: self.vitals,
            ssd: SsdReading {
                energy: self.ssd.energy(),
                temperature: self.ssd.temperature(),
                habit: None,
                kappa: None,
            },
            leap: None,
            boredom: None,
            sleep_debt: self.sleep.map(|s| s.debt),
        }
    }

    pub(crate) fn entry_with_habit(
        &self,
        tick: Tick,
        action: LogAction,
        kind: ActionKind,
    ) -> LogEntry {
        let mut entry = self.entry(tick, action);
        entry.ssd.habit = Some(kind);
        entry.ssd.kappa = self.ssd.kappa_map().get(&kind).copied();
        entry
    }

    /// Hunger, fatigue and injury accrual plus sleep-debt bookkeeping.
    pub(crate) fn metabolize(&mut self, ctx: &TickContext<'_>) {
        let config = ctx.config;
        let b = &config.behavior;
        let night = ctx.is_night();
        let sleeping = self.is_sleeping();

        let mut hunger_rate = b.hunger_rate;
        if sleeping {
            hunger_rate *= b.sleeping_hunger_factor;
        }
        let mut fatigue_rate = b.fatigue_rate;
        if config.profile.sleep_debt {
            if let Some(sleep) = self.sleep.as_mut() {
                let excess = (sleep.debt - b.sleep_debt_cap / 2.0).max(0.0);
                fatigue_rate *= 1.0 + excess / b.sleep_debt_cap;
                if sleep.sleeping {
                    sleep.debt = lower(sleep.debt, b.sleep_recovery);
                } else {
                    let multiplier = if night { b.night_debt_multiplier } else { 1.0 };
                    sleep.debt = clip(
                        sleep.debt + b.sleep_debt_rate * multiplier,
                        0.0,
                        b.sleep_debt_cap,
                    );
                }
            }
        }

        let v = &mut self.vitals;
        v.hunger = (v.hunger + hunger_rate).min(b.vital_cap);
        v.fatigue = (v.fatigue + fatigue_rate).min(b.vital_cap);
        v.injury = (v.injury + b.injury_from_fatigue * v.fatigue / 100.0).min(b.vital_cap);
    }

    /// Crisis check; returns `true` when the agent died this tick.
    pub(crate) fn check_death(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let config = ctx.config;
        let b = &config.behavior;
        let v = self.vitals;
        if v.hunger < b.crisis_level && v.injury < b.crisis_level {
            return false;
        }
        let leap = self.ssd.check_leap(v.fatigue, &config.ssd, ctx.rng);
        let beyond_ceiling = v.hunger >= b.death_ceiling || v.injury >= b.death_ceiling;
        if !leap.fired && !beyond_ceiling {
            return false;
        }

        self.alive = false;
        self.mode = AgentMode::Dead;
        if let Some(sleep) = self.sleep.as_mut() {
            sleep.sleeping = false;
        }
        debug!(
            tick = ctx.tick.0,
            agent = %self.name,
            hunger = v.hunger,
            injury = v.injury,
            hazard = leap.hazard,
            leap = leap.fired,
            "agent died"
        );
        let mut entry = self.entry(ctx.tick, LogAction::Death);
        entry.leap = Some(LeapDiagnostics {
            hazard: leap.hazard,
            threshold: leap.threshold,
            probability: leap.probability,
        });
        ctx.log.push(entry);
        true
    }

    pub(crate) fn update_temperature(&mut self, ctx: &TickContext<'_>) {
        self.ssd.update_temperature(&ctx.config.ssd);
    }

    /// Keeps a sleeping agent asleep or wakes it.
    pub(crate) fn continue_sleep(&mut self, ctx: &mut TickContext<'_>) -> SleepProgress {
        let Some(sleep) = self.sleep else {
            return SleepProgress::Awake;
        };
        if !sleep.sleeping {
            return SleepProgress::Awake;
        }

        let config = ctx.config;
        let b = &config.behavior;
        let night = ctx.is_night();
        let starving = self.vitals.hunger >= b.wake_hunger;
        let daylight_rested = !night && sleep.debt <= b.wake_debt;
        let fully_rested = self.vitals.fatigue <= 0.0 && sleep.debt <= 0.0;
        if starving || daylight_rested || fully_rested {
            if let Some(sleep) = self.sleep.as_mut() {
                sleep.sleeping = false;
            }
            self.mode = AgentMode::Idle;
            ctx.log.push(self.entry(ctx.tick, LogAction::Wake));
            return SleepProgress::Woke;
        }

        let recovery = b.sleep_fatigue_recovery * (1.0 + 0.25 * self.preset.stamina);
        self.vitals.fatigue = lower(self.vitals.fatigue, recovery);
        self.vitals.injury = lower(self.vitals.injury, 1.0 + 0.1 * self.preset.stamina);
        let ssd = &config.ssd;
        self.ssd.update_kappa(ActionKind::Rest, true, recovery, ssd);
        self.ssd
            .update_heat(b.fatigue_rate, recovery / b.rest_amount.max(1.0), ssd);
        self.mode = AgentMode::Sleep;
        let mut entry = self.entry_with_habit(ctx.tick, LogAction::Sleep, ActionKind::Rest);
        entry.amount = Some(recovery);
        ctx.log.push(entry);
        SleepProgress::Asleep
    }

    /// Falls asleep when tired at night or when sleep debt is overwhelming.
    pub(crate) fn try_fall_asleep(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let Some(sleep) = self.sleep else {
            return false;
        };
        let config = ctx.config;
        let b = &config.behavior;
        if self.vitals.hunger >= b.hunger_threshold {
            return false;
        }
        let tired_at_night = ctx.is_night() && self.vitals.fatigue >= b.sleep_fatigue_threshold;
        let exhausted = config.profile.sleep_debt && sleep.debt >= b.sleep_debt_limit;
        if !tired_at_night && !exhausted {
            return false;
        }

        if let Some(sleep) = self.sleep.as_mut() {
            sleep.sleeping = true;
        }
        self.mode = AgentMode::Sleep;
        ctx.log.push(self.entry(ctx.tick, LogAction::FallAsleep));
        true
    }

    /// Short rest when fatigued and not hungry.
    pub(crate) fn try_rest(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let config = ctx.config;
        let b = &config.behavior;
        let v = self.vitals;
        if v.fatigue <= b.fatigue_threshold || v.hunger >= b.hunger_threshold * b.rest_hunger_margin
        {
            return false;
        }

        let amount = b.rest_amount * (1.0 + 0.25 * self.preset.stamina);
        self.vitals.fatigue = lower(v.fatigue, amount);
        self.vitals.hunger = raise(v.hunger, REST_HUNGER_COST, b.action_cap);
        self.vitals.injury = lower(v.injury, 4.0 * (1.0 + 0.1 * self.preset.stamina));

        let ssd = &config.ssd;
        self.ssd.update_kappa(ActionKind::Rest, true, amount, ssd);
        self.ssd
            .update_heat(b.fatigue_rate, amount / b.rest_amount.max(1.0), ssd);
        self.mode = AgentMode::Sleep;
        let mut entry = self.entry_with_habit(ctx.tick, LogAction::Rest, ActionKind::Rest);
        entry.amount = Some(amount);
        ctx.log.push(entry);
        true
    }

    fn avoids_unsafe_zones(&self, b: &BehaviorParams) -> bool {
        self.preset.avoidance >= b.unsafe_avoidance || self.vitals.injury >= b.unsafe_injury
    }

    fn best_hunt_target(&self, ctx: &TickContext<'_>, coop_bonus: f64) -> Option<(ZoneId, f64)> {
        let config = ctx.config;
        let b = &config.behavior;
        let env = &*ctx.environment;
        let cautious = self.avoids_unsafe_zones(b);
        let mut best: Option<(ZoneId, f64)> = None;
        for id in env.nearest_zones(self.position, b.hunt_candidates) {
            if cautious && env.is_unsafe(id, ctx.tick) {
                continue;
            }
            let Some(zone) = env.zone(id) else { continue };
            let distance = f64::from(self.position.manhattan(zone.position));
            let utility = (zone.base_success + coop_bonus
                - zone.danger * (1.0 - self.preset.risk_tolerance))
                * 30.0
                - distance * b.distance_penalty;
            if best.is_none_or(|(_, u)| utility > u) {
                best = Some((id, utility));
            }
        }
        best
    }

    fn best_forage_target(&self, ctx: &TickContext<'_>) -> Option<(PatchId, f64)> {
        let config = ctx.config;
        let b = &config.behavior;
        let env = &*ctx.environment;
        let mut best: Option<(PatchId, f64)> = None;
        for id in env.nearest_patches(self.position, b.forage_candidates) {
            let Some(patch) = env.patch(id) else { continue };
            let failures = self
                .forage_failures
                .get(&patch.position)
                .copied()
                .unwrap_or(0);
            if failures >= b.forage_failure_limit {
                continue;
            }
            let distance = f64::from(self.position.manhattan(patch.position));
            let utility = patch.abundance * 0.7 * 15.0 - distance * b.distance_penalty;
            if best.is_none_or(|(_, u)| utility > u) {
                best = Some((id, utility));
            }
        }
        best
    }

    /// Seeks food when hunger passes its threshold; returns `false` when not
    /// hungry enough to bother.
    pub(crate) fn try_feed(&mut self, ctx: &mut TickContext<'_>, coop_bonus: f64) -> bool {
        let config = ctx.config;
        let b = &config.behavior;
        if self.vitals.hunger <= b.hunger_threshold {
            return false;
        }
        let meaning = (self.vitals.hunger - b.hunger_threshold)
            / (b.crisis_level - b.hunger_threshold).max(f64::EPSILON);

        let hunt = self.best_hunt_target(ctx, coop_bonus);
        let forage = self.best_forage_target(ctx);
        let forage_utility = forage.map_or(-1.0, |(_, u)| u);
        let bold_enough = self.preset.risk_tolerance > b.solo_hunt_risk_tolerance || coop_bonus > 0.0;

        match (hunt, forage) {
            (Some((zone, utility)), _) if utility > forage_utility && bold_enough => {
                self.hunt(ctx, zone, coop_bonus, meaning);
            }
            (_, Some((patch, _))) => self.forage(ctx, patch, meaning),
            _ => self.search(ctx, meaning),
        }
        true
    }

    fn hunt(&mut self, ctx: &mut TickContext<'_>, zone: ZoneId, coop_bonus: f64, meaning: f64) {
        let Some(target) = ctx.environment.zone(zone).map(|z| z.position) else {
            return self.search(ctx, meaning);
        };
        self.position = self.position.step_toward(target);

        let config = ctx.config;
        let b = &config.behavior;
        let ssd = &config.ssd;
        let injury_factor = 1.0 - self.vitals.injury / HUNT_INJURY_DIVISOR;
        let outcome = ctx
            .environment
            .hunt(self.position, zone, injury_factor, coop_bonus, ctx.rng);
        let flow = self.ssd.alignment_flow(ActionKind::Hunt, meaning, ssd);

        let action = if outcome.success {
            self.vitals.hunger = lower(self.vitals.hunger, outcome.food);
            self.vitals.fatigue = raise(self.vitals.fatigue, outcome.food * 0.2, b.action_cap);
            if ctx.rng.chance(outcome.injury_risk) {
                let wound = ctx.rng.range(HUNT_HIT_INJURY.0, HUNT_HIT_INJURY.1);
                self.vitals.injury = raise(self.vitals.injury, wound, b.action_cap);
            }
            self.ssd
                .update_kappa(ActionKind::Hunt, true, outcome.food, ssd);
            self.ssd.update_heat(meaning, flow, ssd);
            LogAction::HuntSuccess
        } else {
            self.vitals.fatigue = raise(self.vitals.fatigue, HUNT_MISS_FATIGUE, b.action_cap);
            if ctx.rng.chance(outcome.injury_risk * HUNT_MISS_RISK) {
                let wound = ctx.rng.range(HUNT_MISS_INJURY.0, HUNT_MISS_INJURY.1);
                self.vitals.injury = raise(self.vitals.injury, wound, b.action_cap);
                ctx.environment.mark_unsafe_default(zone, ctx.tick);
                debug!(tick = ctx.tick.0, agent = %self.name, zone = %target, "hunt zone marked unsafe");
            }
            self.ssd.update_kappa(ActionKind::Hunt, false, 0.0, ssd);
            self.ssd.update_heat(meaning, 0.0, ssd);
            LogAction::HuntFail
        };

        self.mode = AgentMode::Hunt;
        let mut entry = self.entry_with_habit(ctx.tick, action, ActionKind::Hunt);
        entry.target = Some(target.to_string());
        entry.amount = Some(outcome.food);
        ctx.log.push(entry);
    }

    fn forage(&mut self, ctx: &mut TickContext<'_>, patch: PatchId, meaning: f64) {
        let Some(target) = ctx.environment.patch(patch).map(|p| p.position) else {
            return self.search(ctx, meaning);
        };
        self.position = self.position.step_toward(target);

        let config = ctx.config;
        let b = &config.behavior;
        let ssd = &config.ssd;
        let flow = self.ssd.alignment_flow(ActionKind::Forage, meaning, ssd);
        let outcome = ctx.environment.forage(self.position, patch, ctx.rng);

        let action = if outcome.success {
            self.vitals.hunger = lower(self.vitals.hunger, outcome.food);
            self.vitals.fatigue = lower(self.vitals.fatigue, outcome.food * 0.1);
            self.ssd
                .update_kappa(ActionKind::Forage, true, outcome.food, ssd);
            self.ssd.update_heat(meaning, flow, ssd);
            self.forage_failures.remove(&target);
            LogAction::EatSuccess
        } else {
            self.ssd
                .update_kappa(ActionKind::Forage, false, 0.0, ssd);
            self.ssd.update_heat(meaning, 0.0, ssd);
            if self.position.manhattan(target) <= 1 {
                *self.forage_failures.entry(target).or_insert(0) += 1;
            }
            LogAction::EatFail
        };
        if ctx.rng.chance(outcome.injury_risk) {
            let scrape = ctx.rng.range(SCRAPE_INJURY.0, SCRAPE_INJURY.1);
            self.vitals.injury = raise(self.vitals.injury, scrape, b.action_cap);
        }

        self.mode = AgentMode::Food;
        let mut entry = self.entry_with_habit(ctx.tick, action, ActionKind::Forage);
        entry.target = Some(target.to_string());
        entry.amount = Some(outcome.food);
        ctx.log.push(entry);
    }

    /// Hungry but nothing viable in range: wander wider, hoping to find food.
    fn search(&mut self, ctx: &mut TickContext<'_>, meaning: f64) {
        let config = ctx.config;
        let b = &config.behavior;
        self.ssd.update_heat(meaning, 0.0, &config.ssd);
        self.mode = AgentMode::Searching;
        ctx.log
            .push(self.entry(ctx.tick, LogAction::SearchFoodFallback));

        if ctx.rng.chance(b.forage_failure_reset_chance) {
            self.forage_failures.clear();
        }
        self.wander(ctx, b.search_radius_scale);
    }

    /// Idle patrol; boredom slowly turns into pressure.
    pub(crate) fn patrol(&mut self, ctx: &mut TickContext<'_>) {
        let config = ctx.config;
        let b = &config.behavior;
        self.wander(ctx, b.patrol_radius_scale);
        self.boredom += b.boredom_rate;
        self.ssd
            .update_heat(self.boredom * b.boredom_pressure, 0.0, &config.ssd);
        self.mode = AgentMode::Patrol;
        let mut entry = self.entry(ctx.tick, LogAction::Patrol);
        entry.boredom = Some(self.boredom);
        ctx.log.push(entry);
    }

    fn wander(&mut self, ctx: &mut TickContext<'_>, scale: f64) {
        let radius = (self.ssd.temperature() * scale).floor().max(0.0) as i32;
        let span = (2 * radius + 1) as u32;
        let dx = ctx.rng.below(span) as i32 - radius;
        let dy = ctx.rng.below(span) as i32 - radius;
        self.position = self
            .position
            .offset_within(dx, dy, ctx.environment.size());
    }

    /// Plain-data view of the agent.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            hunger: self.vitals.hunger,
            fatigue: self.vitals.fatigue,
            injury: self.vitals.injury,
            alive: self.alive,
            mode: self.mode,
            energy: self.ssd.energy(),
            temperature: self.ssd.temperature(),
            kappa: self.ssd.kappa_map().clone(),
            preset: self.preset,
            relationships: self.relationship.clone(),
            sleep_debt: self.sleep.map(|s| s.debt),
            is_sleeping: self.is_sleeping(),
        }
    }
}
