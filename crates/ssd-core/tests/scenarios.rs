use ssd_core::{
    ActionKind, AgentSpec, BerryPatch, Environment, GridPos, KernelProfile, LogAction, PatchId,
    Preset, RandomSource, Simulation, SimulationConfig, SimulationError, SsdParams, SsdState, Tick,
    Vitals,
};

/// Always returns the same sample, forcing every Bernoulli draw one way.
struct Fixed(f64);

impl RandomSource for Fixed {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

fn solo_config(profile: KernelProfile, agents: Vec<AgentSpec>) -> SimulationConfig {
    SimulationConfig {
        roster: agents,
        ..SimulationConfig::seeded(42, profile)
    }
}

fn empty_map(config: &SimulationConfig) -> Environment {
    Environment::with_entities(
        config.world_size,
        &config.environment,
        config.profile,
        Vec::new(),
        Vec::new(),
    )
}

fn set_vitals(sim: &mut Simulation, name: &str, vitals: Vitals) {
    let agent = sim.agent_mut(name).expect("agent present");
    *agent.vitals_mut() = vitals;
}

#[test]
fn starving_agent_dies_once_and_stays_dead() {
    let config = solo_config(
        KernelProfile::basic(),
        vec![AgentSpec::new(
            "Loner",
            Preset::new(0.3, 0.5, 0.5, 0.5, 0.5),
            Some(GridPos::new(10, 10)),
        )],
    );
    let map = empty_map(&config);
    let mut sim = Simulation::new(config).expect("simulation").with_environment(map);
    set_vitals(
        &mut sim,
        "Loner",
        Vitals {
            hunger: 95.0,
            fatigue: 30.0,
            injury: 0.0,
        },
    );

    for _ in 0..10 {
        sim.advance_tick();
    }
    let loner = sim.agent("Loner").expect("loner");
    assert!(!loner.is_alive());

    for _ in 0..10 {
        sim.advance_tick();
    }
    let deaths: Vec<_> = sim
        .log()
        .iter()
        .filter(|e| e.action == LogAction::Death)
        .collect();
    assert_eq!(deaths.len(), 1);
    let death_tick = deaths[0].tick;
    assert!(death_tick <= Tick(10));
    assert!(deaths[0].leap.is_some());
    assert!(sim.log().iter().all(|e| e.tick <= death_tick));
    assert!(sim.is_extinct());
}

#[test]
fn leap_kills_before_the_hard_ceiling() {
    let config = solo_config(
        KernelProfile::basic(),
        vec![AgentSpec::new(
            "Loner",
            Preset::new(0.3, 0.5, 0.5, 0.5, 0.5),
            Some(GridPos::new(10, 10)),
        )],
    );
    let map = empty_map(&config);
    let mut sim = Simulation::with_rng(config, Box::new(Fixed(0.0)))
        .expect("simulation")
        .with_environment(map);
    set_vitals(
        &mut sim,
        "Loner",
        Vitals {
            hunger: 95.0,
            fatigue: 30.0,
            injury: 0.0,
        },
    );

    sim.run(10);
    let deaths: Vec<_> = sim
        .log()
        .iter()
        .filter(|e| e.action == LogAction::Death)
        .collect();
    assert_eq!(deaths.len(), 1);
    let death = deaths[0];
    assert_eq!(death.tick, Tick(3));
    assert!(death.vitals.hunger >= 100.0 && death.vitals.hunger < 110.0);
    let leap = death.leap.expect("leap diagnostics");
    assert!(leap.probability > 0.0 && leap.probability < 1.0);
    assert_eq!(sim.tick(), Tick(3));
}

#[test]
fn run_stops_early_once_everyone_is_dead() {
    let config = solo_config(
        KernelProfile::basic(),
        vec![AgentSpec::new(
            "Loner",
            Preset::new(0.3, 0.5, 0.5, 0.5, 0.5),
            None,
        )],
    );
    let map = empty_map(&config);
    let mut sim = Simulation::new(config).expect("simulation").with_environment(map);
    let ran = sim.run(500);
    assert!(ran < 500);
    assert!(sim.is_extinct());
    assert_eq!(sim.tick(), Tick(ran));
}

#[test]
fn neighbour_shares_food_with_starving_agent() {
    let config = solo_config(
        KernelProfile::basic(),
        vec![
            AgentSpec::new(
                "Helper",
                Preset::new(0.3, 0.5, 0.5, 0.5, 0.8),
                Some(GridPos::new(5, 5)),
            ),
            AgentSpec::new(
                "Hungry",
                Preset::new(0.3, 0.5, 0.5, 0.5, 0.5),
                Some(GridPos::new(6, 5)),
            ),
        ],
    );
    let map = empty_map(&config);
    let mut sim = Simulation::new(config).expect("simulation").with_environment(map);
    set_vitals(
        &mut sim,
        "Helper",
        Vitals {
            hunger: 30.0,
            fatigue: 20.0,
            injury: 0.0,
        },
    );
    set_vitals(
        &mut sim,
        "Hungry",
        Vitals {
            hunger: 90.0,
            fatigue: 20.0,
            injury: 0.0,
        },
    );

    let report = sim.advance_tick();
    let shared = report
        .log
        .iter()
        .find(|e| e.action == LogAction::ShareFood)
        .expect("food shared");
    assert_eq!(shared.agent, "Helper");
    assert_eq!(shared.target.as_deref(), Some("Hungry"));

    let hungry = report
        .agents
        .iter()
        .find(|a| a.name == "Hungry")
        .expect("hungry snapshot");
    assert!(hungry.hunger < 90.0);

    let graph = sim.social_graph();
    assert!(graph.weight("Helper", "Hungry").is_some_and(|w| w > 0.0));
    assert!(graph.weight("Hungry", "Helper").is_some_and(|w| w > 0.0));
    assert_eq!(report.summary.helps, 1);
}

#[test]
fn foraging_depletes_a_patch_and_regrowth_restores_it() {
    let config = SimulationConfig::seeded(1, KernelProfile::basic());
    let patch = BerryPatch {
        position: GridPos::new(4, 4),
        abundance: 0.9,
        regen: 0.01,
    };
    let mut env = Environment::with_entities(
        config.world_size,
        &config.environment,
        config.profile,
        vec![patch],
        Vec::new(),
    );
    let mut always = Fixed(0.0);

    let mut previous = env.patches()[0].abundance;
    for _ in 0..50 {
        let outcome = env.forage(GridPos::new(4, 4), PatchId(0), &mut always);
        assert!(outcome.success);
        let current = env.patches()[0].abundance;
        assert!(current <= previous);
        assert!(current >= 0.0);
        previous = current;
    }
    assert_eq!(previous, 0.0);

    for _ in 0..50 {
        env.advance_tick(&mut always);
    }
    assert!(env.patches()[0].abundance > 0.0);
    assert!(env.patches()[0].abundance <= 1.0);
}

#[test]
fn hungry_agent_eats_from_rich_patch() {
    let config = solo_config(
        KernelProfile::basic(),
        vec![AgentSpec::new(
            "Forager",
            Preset::new(0.2, 0.3, 0.8, 0.6, 0.8),
            Some(GridPos::new(8, 8)),
        )],
    );
    let map = Environment::with_entities(
        config.world_size,
        &config.environment,
        config.profile,
        vec![BerryPatch {
            position: GridPos::new(9, 8),
            abundance: 1.0,
            regen: 0.0,
        }],
        Vec::new(),
    );
    let mut sim = Simulation::with_rng(config, Box::new(Fixed(0.0)))
        .expect("simulation")
        .with_environment(map);
    set_vitals(
        &mut sim,
        "Forager",
        Vitals {
            hunger: 80.0,
            fatigue: 10.0,
            injury: 0.0,
        },
    );

    let report = sim.advance_tick();
    assert_eq!(report.log.len(), 1);
    assert_eq!(report.log[0].action, LogAction::EatSuccess);
    assert_eq!(report.log[0].target.as_deref(), Some("9,8"));
    let forager = sim.agent("Forager").expect("forager");
    assert_eq!(forager.position(), GridPos::new(9, 8));
    assert!(forager.vitals().hunger < 80.0);
    assert!(report.environment.patches["9,8"].abundance < 1.0);
    assert_eq!(report.summary.meals, 1);
}

#[test]
fn same_seed_reproduces_the_run() {
    let config = SimulationConfig::seeded(0xC0FFEE, KernelProfile::full());
    let mut a = Simulation::new(config.clone()).expect("simulation a");
    let mut b = Simulation::new(config).expect("simulation b");
    for _ in 0..120 {
        assert_eq!(a.advance_tick(), b.advance_tick());
    }
    assert_eq!(a.log(), b.log());
    assert_eq!(a.frame(), b.frame());
}

#[test]
fn different_seeds_generate_different_maps() {
    let a = Simulation::new(SimulationConfig::seeded(1, KernelProfile::full())).expect("a");
    let b = Simulation::new(SimulationConfig::seeded(2, KernelProfile::full())).expect("b");
    assert_ne!(a.frame().environment, b.frame().environment);
}

#[test]
fn default_roster_spawns_around_the_centre() {
    let sim = Simulation::new(SimulationConfig::seeded(7, KernelProfile::full())).expect("sim");
    let frame = sim.frame();
    assert_eq!(frame.agents.len(), 5);
    let pioneer = frame.agent("Pioneer_C").expect("pioneer");
    assert_eq!((pioneer.x, pioneer.y), (13, 15));
    assert!(frame.agents.iter().all(|a| a.alive && a.hunger == 50.0));
    assert!(frame.agents.iter().all(|a| a.sleep_debt == Some(0.0)));
}

#[test]
fn basic_profile_never_sleeps_or_tracks_population() {
    let mut sim =
        Simulation::new(SimulationConfig::seeded(11, KernelProfile::basic())).expect("sim");
    sim.run(80);
    assert!(sim.log().iter().all(|e| !matches!(
        e.action,
        LogAction::FallAsleep | LogAction::Sleep | LogAction::Wake
    )));
    let frame = sim.frame();
    assert!(frame.environment.hunt_zones.values().all(|z| z.population.is_none()));
    assert!(frame.agents.iter().all(|a| a.sleep_debt.is_none()));
}

#[test]
fn out_of_bounds_start_is_rejected() {
    let config = solo_config(
        KernelProfile::basic(),
        vec![AgentSpec::new(
            "Lost",
            Preset::new(0.5, 0.5, 0.5, 0.5, 0.5),
            Some(GridPos::new(40, 2)),
        )],
    );
    assert_eq!(
        Simulation::new(config).expect_err("invalid start"),
        SimulationError::StartOutOfBounds {
            name: "Lost".into(),
            x: 40,
            y: 2,
        }
    );
}

#[test]
fn tick_report_serializes_for_hosts() {
    let mut sim = Simulation::new(SimulationConfig::seeded(5, KernelProfile::full())).expect("sim");
    let report = sim.advance_tick();
    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["tick"], 1);
    assert_eq!(json["agents"].as_array().map(Vec::len), Some(5));
    assert!(json["environment"]["patches"].is_object());
    assert!(json["summary"]["alive"].is_u64());
}

#[test]
fn habit_strength_responds_monotonically_to_outcomes() {
    let params = SsdParams::default();
    let mut ssd = SsdState::new(&params);

    let mut previous = ssd.kappa(ActionKind::Forage, &params);
    for _ in 0..20 {
        ssd.update_kappa(ActionKind::Forage, true, 8.0, &params);
        let current = ssd.kappa(ActionKind::Forage, &params);
        assert!(current > previous);
        previous = current;
    }

    for _ in 0..100 {
        ssd.update_kappa(ActionKind::Forage, false, 0.0, &params);
        let current = ssd.kappa(ActionKind::Forage, &params);
        assert!(current <= previous);
        assert!(current >= params.kappa_min);
        previous = current;
    }
    assert!(ssd.kappa(ActionKind::Hunt, &params) == params.kappa_default);
}
