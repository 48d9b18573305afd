//! Agent arena plus the per-agent tick pipeline, including the helping
//! phase that mutates two agents at once.

use slotmap::{SlotMap, new_key_type};
use std::collections::BTreeMap;
use tracing::debug;

use crate::SimulationError;
use crate::agent::{ActionKind, AgentMode, Npc, SleepProgress, TickContext, raise};
use crate::config::SimulationConfig;
use crate::environment::GridPos;
use crate::log::LogAction;
use crate::snapshot::AgentSnapshot;

new_key_type! {
    /// Stable handle for agents backed by a generational slot map.
    pub struct AgentId;
}

// Helping thresholds.
const SHARE_HELPER_MAX_HUNGER: f64 = 85.0;
const SHARE_TARGET_MIN_HUNGER: f64 = 75.0;
const SHARE_HELPER_COST: f64 = 6.0;
const TEND_INJURY_THRESHOLD: f64 = 30.0;
const TEND_FATIGUE_THRESHOLD: f64 = 85.0;
const TEND_FATIGUE_RELIEF: f64 = 28.0;
const TEND_INJURY_RELIEF: f64 = 7.0;
const TEND_HELPER_COST: f64 = 6.0;
const TEND_REWARD: f64 = 20.0;

/// Affinity and debt increments: (helper toward target, target toward helper, target's debt).
const SHARE_BONDS: (f64, f64, f64) = (0.08, 0.04, 0.2);
const TEND_BONDS: (f64, f64, f64) = (0.1, 0.05, 0.25);

/// All agents of one run, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    agents: SlotMap<AgentId, Npc>,
    by_name: BTreeMap<String, AgentId>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the configured roster; agents without a start cell spawn at
    /// the grid centre.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let centre = (config.world_size / 2) as i32;
        let mut roster = Self::new();
        for spec in &config.roster {
            let start = spec.start.unwrap_or(GridPos::new(centre, centre));
            roster.insert(Npc::new(spec, start, config))?;
        }
        Ok(roster)
    }

    /// Adds an agent; names must be unique.
    pub fn insert(&mut self, npc: Npc) -> Result<AgentId, SimulationError> {
        if self.by_name.contains_key(npc.name()) {
            return Err(SimulationError::DuplicateAgent(npc.name().to_owned()));
        }
        let name = npc.name().to_owned();
        let id = self.agents.insert(npc);
        self.by_name.insert(name, id);
        Ok(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.agents.values().filter(|a| a.is_alive()).count()
    }

    #[must_use]
    pub fn get(&self, id: AgentId) -> Option<&Npc> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Npc> {
        self.agents.get_mut(id)
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<AgentId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Npc> {
        self.id_of(name).and_then(|id| self.agents.get(id))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Npc> {
        let id = self.id_of(name)?;
        self.agents.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &Npc)> {
        self.agents.iter()
    }

    /// Handles in processing order.
    #[must_use]
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().collect()
    }

    /// Living, awake agents other than `id` within `radius` steps.
    #[must_use]
    pub fn allies_near(&self, id: AgentId, radius: i32) -> usize {
        let Some(origin) = self.agents.get(id).map(Npc::position) else {
            return 0;
        };
        self.agents
            .iter()
            .filter(|(other_id, other)| {
                *other_id != id
                    && other.is_alive()
                    && !other.is_sleeping()
                    && origin.manhattan(other.position()) <= radius
            })
            .count()
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.values().map(Npc::snapshot).collect()
    }

    /// Runs one agent's decision pipeline for the active tick.
    pub(crate) fn step(&mut self, id: AgentId, ctx: &mut TickContext<'_>) {
        let Some(agent) = self.agents.get_mut(id) else {
            return;
        };
        if !agent.is_alive() {
            return;
        }

        agent.metabolize(ctx);
        if agent.check_death(ctx) {
            return;
        }
        agent.update_temperature(ctx);
        if agent.continue_sleep(ctx) == SleepProgress::Asleep {
            return;
        }

        if self.try_help(id, ctx) {
            return;
        }

        let config = ctx.config;
        let coop_bonus = if config.profile.cooperation {
            self.allies_near(id, config.behavior.cooperation_radius) as f64
                * config.behavior.cooperation_bonus
        } else {
            0.0
        };
        let Some(agent) = self.agents.get_mut(id) else {
            return;
        };
        if agent.try_fall_asleep(ctx) || agent.try_rest(ctx) || agent.try_feed(ctx, coop_bonus) {
            return;
        }
        agent.patrol(ctx);
    }

    /// Picks the neighbour with the highest positive help utility and feeds
    /// or tends it when the utility clears the activation threshold.
    fn try_help(&mut self, id: AgentId, ctx: &mut TickContext<'_>) -> bool {
        let config = ctx.config;
        let b = &config.behavior;
        let Some(helper) = self.agents.get(id) else {
            return false;
        };

        let mut best: Option<(AgentId, f64)> = None;
        for (other_id, other) in &self.agents {
            if other_id == id
                || !other.is_alive()
                || helper.position().manhattan(other.position()) > b.help_radius
            {
                continue;
            }
            let utility = helper.help_utility(other, b);
            if utility > best.map_or(0.0, |(_, u)| u) {
                best = Some((other_id, utility));
            }
        }
        let Some((target_id, utility)) = best else {
            return false;
        };
        if utility <= b.help_activation {
            return false;
        }

        let Some([helper, target]) = self.agents.get_disjoint_mut([id, target_id]) else {
            return false;
        };
        if helper.vitals.hunger < SHARE_HELPER_MAX_HUNGER
            && target.vitals.hunger > SHARE_TARGET_MIN_HUNGER
        {
            share_food(helper, target, ctx);
        } else if target.vitals.injury > TEND_INJURY_THRESHOLD
            || target.vitals.fatigue > TEND_FATIGUE_THRESHOLD
        {
            tend_wounds(helper, target, ctx);
        } else {
            return false;
        }
        true
    }
}

fn bond(helper: &mut Npc, target: &mut Npc, (toward, back, debt): (f64, f64, f64)) {
    *helper.relationship_entry(&target.name) += toward;
    *target.relationship_entry(&helper.name) += back;
    *target.help_debt_entry(&helper.name) += debt;
}

fn share_food(helper: &mut Npc, target: &mut Npc, ctx: &mut TickContext<'_>) {
    let config = ctx.config;
    let amount = config.behavior.share_amount;
    target.vitals.hunger = (target.vitals.hunger - amount).max(0.0);
    helper.vitals.hunger = raise(
        helper.vitals.hunger,
        SHARE_HELPER_COST,
        config.behavior.action_cap,
    );
    bond(helper, target, SHARE_BONDS);
    helper
        .ssd
        .update_kappa(ActionKind::Help, true, amount * 0.5, &config.ssd);
    helper.mode = AgentMode::Help;

    debug!(tick = ctx.tick.0, helper = %helper.name, target = %target.name, amount, "shared food");
    let mut entry = helper.entry_with_habit(ctx.tick, LogAction::ShareFood, ActionKind::Help);
    entry.target = Some(target.name.clone());
    entry.amount = Some(amount);
    ctx.log.push(entry);
}

fn tend_wounds(helper: &mut Npc, target: &mut Npc, ctx: &mut TickContext<'_>) {
    let config = ctx.config;
    let relief = TEND_FATIGUE_RELIEF * (1.0 + 0.2 * helper.preset.stamina);
    target.vitals.fatigue = (target.vitals.fatigue - relief).max(0.0);
    let healed = target.vitals.injury.min(TEND_INJURY_RELIEF);
    target.vitals.injury -= healed;
    helper.vitals.fatigue = raise(
        helper.vitals.fatigue,
        TEND_HELPER_COST,
        config.behavior.action_cap,
    );
    bond(helper, target, TEND_BONDS);
    helper
        .ssd
        .update_kappa(ActionKind::Help, true, TEND_REWARD, &config.ssd);
    helper.mode = AgentMode::Help;

    debug!(tick = ctx.tick.0, helper = %helper.name, target = %target.name, healed, "tended wounds");
    let mut entry = helper.entry_with_habit(ctx.tick, LogAction::TendWounds, ActionKind::Help);
    entry.target = Some(target.name.clone());
    entry.amount = Some(healed);
    ctx.log.push(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Preset, SleepState};
    use crate::config::{AgentSpec, KernelProfile};
    use crate::environment::{BerryPatch, Environment, HuntZone};
    use crate::log::LogEntry;
    use crate::rng::testing::Scripted;
    use crate::{Tick, Vitals};

    fn config_with(agents: &[(&str, f64, GridPos)]) -> SimulationConfig {
        let mut config = SimulationConfig::seeded(5, KernelProfile::basic());
        config.roster = agents
            .iter()
            .map(|(name, empathy, start)| {
                AgentSpec::new(*name, Preset::new(0.3, 0.5, 0.7, 0.5, *empathy), Some(*start))
            })
            .collect();
        config
    }

    fn empty_environment(config: &SimulationConfig) -> Environment {
        Environment::with_entities(
            config.world_size,
            &config.environment,
            config.profile,
            vec![],
            vec![],
        )
    }

    fn set_vitals(roster: &mut Roster, name: &str, vitals: Vitals) {
        if let Some(agent) = roster.by_name_mut(name) {
            *agent.vitals_mut() = vitals;
        }
    }

    fn run_step(roster: &mut Roster, config: &SimulationConfig, name: &str) -> Vec<LogEntry> {
        let mut environment = empty_environment(config);
        let mut rng = Scripted::constant(0.99);
        let mut log = Vec::new();
        let mut ctx = TickContext {
            tick: Tick(1),
            config,
            environment: &mut environment,
            rng: &mut rng,
            log: &mut log,
        };
        let id = roster.id_of(name).expect("agent exists");
        roster.step(id, &mut ctx);
        log
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let config = config_with(&[("A", 0.5, GridPos::new(1, 1))]);
        let mut roster = Roster::from_config(&config).expect("roster");
        let spec = AgentSpec::new("A", Preset::new(0.5, 0.5, 0.5, 0.5, 0.5), None);
        let err = roster
            .insert(Npc::new(&spec, GridPos::new(2, 2), &config))
            .expect_err("duplicate");
        assert_eq!(err, SimulationError::DuplicateAgent("A".into()));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn missing_start_spawns_at_centre() {
        let mut config = config_with(&[]);
        config.roster = vec![AgentSpec::new(
            "Solo",
            Preset::new(0.5, 0.5, 0.5, 0.5, 0.5),
            None,
        )];
        let roster = Roster::from_config(&config).expect("roster");
        let solo = roster.by_name("Solo").expect("solo");
        assert_eq!(solo.position(), GridPos::new(13, 13));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let config = config_with(&[
            ("Zed", 0.5, GridPos::new(1, 1)),
            ("Amy", 0.5, GridPos::new(2, 2)),
            ("Max", 0.5, GridPos::new(3, 3)),
        ]);
        let roster = Roster::from_config(&config).expect("roster");
        let names: Vec<_> = roster.iter().map(|(_, a)| a.name().to_owned()).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Max"]);
    }

    #[test]
    fn allies_near_counts_living_neighbours_only() {
        let config = config_with(&[
            ("A", 0.5, GridPos::new(5, 5)),
            ("B", 0.5, GridPos::new(7, 6)),
            ("C", 0.5, GridPos::new(9, 9)),
            ("D", 0.5, GridPos::new(5, 6)),
        ]);
        let mut roster = Roster::from_config(&config).expect("roster");
        let a = roster.id_of("A").expect("A");
        assert_eq!(roster.allies_near(a, 4), 2);
        if let Some(d) = roster.by_name_mut("D") {
            d.alive = false;
        }
        assert_eq!(roster.allies_near(a, 4), 1);
    }

    #[test]
    fn sleeping_neighbours_are_not_allies() {
        let config = config_with(&[
            ("A", 0.5, GridPos::new(5, 5)),
            ("B", 0.5, GridPos::new(6, 5)),
            ("C", 0.5, GridPos::new(5, 7)),
        ]);
        let mut roster = Roster::from_config(&config).expect("roster");
        let a = roster.id_of("A").expect("A");
        assert_eq!(roster.allies_near(a, 4), 2);
        if let Some(b) = roster.by_name_mut("B") {
            b.sleep = Some(SleepState { debt: 0.0, sleeping: true });
        }
        assert_eq!(roster.allies_near(a, 4), 1);
    }

    fn hunting_ground(config: &SimulationConfig) -> Environment {
        Environment::with_entities(
            config.world_size,
            &config.environment,
            config.profile,
            vec![BerryPatch {
                position: GridPos::new(5, 6),
                abundance: 0.3,
                regen: 0.0,
            }],
            vec![HuntZone {
                position: GridPos::new(5, 5),
                base_success: 0.8,
                danger: 0.1,
                population: Some(1.0),
                unsafe_until: None,
            }],
        )
    }

    fn timid_hunter_action(profile: KernelProfile, ally_asleep: bool) -> LogAction {
        let mut config = config_with(&[
            ("Hunter", 0.5, GridPos::new(5, 5)),
            ("Ally", 0.5, GridPos::new(7, 5)),
        ]);
        config.profile = profile;
        let mut roster = Roster::from_config(&config).expect("roster");
        set_vitals(&mut roster, "Hunter", Vitals { hunger: 80.0, fatigue: 20.0, injury: 0.0 });
        set_vitals(&mut roster, "Ally", Vitals { hunger: 30.0, fatigue: 20.0, injury: 0.0 });
        if ally_asleep {
            if let Some(ally) = roster.by_name_mut("Ally") {
                ally.sleep = Some(SleepState { debt: 0.0, sleeping: true });
            }
        }

        let mut environment = hunting_ground(&config);
        let mut rng = Scripted::constant(0.99);
        let mut log = Vec::new();
        let mut ctx = TickContext {
            tick: Tick(1),
            config: &config,
            environment: &mut environment,
            rng: &mut rng,
            log: &mut log,
        };
        let id = roster.id_of("Hunter").expect("hunter");
        roster.step(id, &mut ctx);
        assert_eq!(log.len(), 1);
        log[0].action
    }

    #[test]
    fn awake_ally_emboldens_timid_hunter() {
        let full = KernelProfile::full();
        assert_eq!(timid_hunter_action(full, false), LogAction::HuntFail);
        assert_eq!(timid_hunter_action(full, true), LogAction::EatFail);
    }

    #[test]
    fn cooperation_bonus_needs_cooperative_profile() {
        assert_eq!(
            timid_hunter_action(KernelProfile::circadian(), false),
            LogAction::EatFail
        );
    }

    #[test]
    fn helper_shares_food_with_starving_neighbour() {
        let config = config_with(&[
            ("Helper", 0.8, GridPos::new(5, 5)),
            ("Hungry", 0.5, GridPos::new(6, 6)),
        ]);
        let mut roster = Roster::from_config(&config).expect("roster");
        set_vitals(&mut roster, "Helper", Vitals { hunger: 30.0, fatigue: 20.0, injury: 0.0 });
        set_vitals(&mut roster, "Hungry", Vitals { hunger: 90.0, fatigue: 20.0, injury: 0.0 });

        let log = run_step(&mut roster, &config, "Helper");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, LogAction::ShareFood);
        assert_eq!(log[0].target.as_deref(), Some("Hungry"));

        let helper = roster.by_name("Helper").expect("helper");
        let hungry = roster.by_name("Hungry").expect("hungry");
        assert!((hungry.vitals().hunger - 65.0).abs() < 1e-9);
        assert!((helper.vitals().hunger - (30.0 + 1.8 + 6.0)).abs() < 1e-9);
        assert!((helper.relationship("Hungry") - 0.08).abs() < 1e-12);
        assert!((hungry.relationship("Helper") - 0.04).abs() < 1e-12);
        assert!((hungry.help_debt("Helper") - 0.2).abs() < 1e-12);
        assert_eq!(helper.mode(), AgentMode::Help);
        assert!(helper.ssd().kappa(ActionKind::Help, &config.ssd) > 0.1);
    }

    #[test]
    fn helper_tends_wounded_neighbour() {
        let config = config_with(&[
            ("Medic", 0.9, GridPos::new(5, 5)),
            ("Wounded", 0.5, GridPos::new(5, 7)),
        ]);
        let mut roster = Roster::from_config(&config).expect("roster");
        set_vitals(&mut roster, "Medic", Vitals { hunger: 30.0, fatigue: 20.0, injury: 0.0 });
        set_vitals(&mut roster, "Wounded", Vitals { hunger: 40.0, fatigue: 60.0, injury: 70.0 });

        let log = run_step(&mut roster, &config, "Medic");
        assert_eq!(log[0].action, LogAction::TendWounds);
        let wounded = roster.by_name("Wounded").expect("wounded");
        assert!((wounded.vitals().injury - 63.0).abs() < 1e-9);
        assert!((wounded.vitals().fatigue - (60.0 - 28.0 * 1.1)).abs() < 1e-9);
        assert!((wounded.help_debt("Medic") - 0.25).abs() < 1e-12);
    }

    #[test]
    fn distant_agents_are_not_helped() {
        let config = config_with(&[
            ("Helper", 0.8, GridPos::new(1, 1)),
            ("Hungry", 0.5, GridPos::new(10, 10)),
        ]);
        let mut roster = Roster::from_config(&config).expect("roster");
        set_vitals(&mut roster, "Helper", Vitals { hunger: 30.0, fatigue: 20.0, injury: 0.0 });
        set_vitals(&mut roster, "Hungry", Vitals { hunger: 90.0, fatigue: 20.0, injury: 0.0 });

        let log = run_step(&mut roster, &config, "Helper");
        assert!(log.iter().all(|e| !e.action.is_help()));
        let hungry = roster.by_name("Hungry").expect("hungry");
        assert_eq!(hungry.vitals().hunger, 90.0);
    }

    #[test]
    fn dead_agents_are_skipped() {
        let config = config_with(&[("Ghost", 0.5, GridPos::new(3, 3))]);
        let mut roster = Roster::from_config(&config).expect("roster");
        if let Some(ghost) = roster.by_name_mut("Ghost") {
            ghost.alive = false;
        }
        let log = run_step(&mut roster, &config, "Ghost");
        assert!(log.is_empty());
        assert_eq!(roster.alive_count(), 0);
    }
}
