use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use ssd_core::{AgentSpec, GridPos, KernelProfile, Preset, Simulation, SimulationConfig};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn crowded_config(agents: usize) -> SimulationConfig {
    let mut config = SimulationConfig::seeded(0xBEEF, KernelProfile::full());
    // Scale the map with the crowd so resources stay contested.
    config.world_size = 26.max((agents as f64).sqrt() as u32 * 6);
    config.berry_count = 4.max(agents);
    config.hunt_zone_count = 5.max(agents + agents / 4);
    let size = config.world_size;
    config.roster = (0..agents)
        .map(|i| {
            let t = i as f64 / agents.max(1) as f64;
            let preset = Preset::new(t, 1.0 - t, (t * 3.0).fract(), 0.5, (t * 7.0).fract());
            let x = (i as u32 * 7) % size;
            let y = (i as u32 * 13) % size;
            AgentSpec::new(
                format!("npc_{i:04}"),
                preset,
                Some(GridPos::new(x as i32, y as i32)),
            )
        })
        .collect();
    config
}

fn bench_simulation_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_tick");
    group.sample_size(env_or("SSD_BENCH_SAMPLES", 30_usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("SSD_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("SSD_BENCH_MEASURE_SECS", 8)));
    let steps: usize = env_or("SSD_BENCH_STEPS", 64_usize).max(1);
    let crowd_sizes: Vec<usize> = std::env::var("SSD_BENCH_AGENTS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![5_usize, 50, 200]);

    for &agents in &crowd_sizes {
        group.bench_function(format!("steps{steps}_agents{agents}"), |b| {
            b.iter_batched(
                || Simulation::new(crowded_config(agents)).expect("simulation"),
                |mut sim| {
                    for _ in 0..steps {
                        sim.advance_tick();
                    }
                    sim
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_simulation_ticks);
criterion_main!(benches);
