use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ssd_core::{Frame, KernelProfile, LogAction, Simulation, SimulationConfig, TickSummary};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "ssd-sim",
    version,
    about = "Run the SSD survival simulation headlessly"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation and print its progress.
    Run(RunArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of ticks to advance (stops early if every agent dies).
    #[arg(long, default_value_t = 200)]
    ticks: u64,
    /// RNG seed; overrides the configuration file.
    #[arg(long, env = "SSD_SIM_SEED")]
    seed: Option<u64>,
    /// Feature profile; overrides the configuration file.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,
    /// JSON configuration file (see `ssd-sim config`).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    format: OutputFormat,
    /// Print a summary line every N ticks (summary format only).
    #[arg(long, default_value_t = 10)]
    every: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Basic,
    Cooperative,
    Circadian,
    Full,
}

impl From<ProfileArg> for KernelProfile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Basic => KernelProfile::basic(),
            ProfileArg::Cooperative => KernelProfile::cooperative(),
            ProfileArg::Circadian => KernelProfile::circadian(),
            ProfileArg::Full => KernelProfile::full(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Periodic human-readable summary lines plus a final roster table.
    Summary,
    /// One JSON tick report per line.
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Command::Run(args) => run_command(&args, &mut out)?,
        Command::Config => {
            serde_json::to_writer_pretty(&mut out, &SimulationConfig::default())
                .context("failed to encode default configuration")?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

fn resolve_config(args: &RunArgs) -> Result<SimulationConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(profile) = args.profile {
        config.profile = profile.into();
    }
    Ok(config)
}

fn run_command(args: &RunArgs, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(args)?;
    let mut sim = Simulation::new(config).context("invalid simulation configuration")?;
    info!(ticks = args.ticks, format = ?args.format, "starting run");

    if args.format == OutputFormat::Summary {
        writeln!(
            out,
            "{:>6} {:>5} {:>6} {:>5} {:>5} {:>7} {:>6} {:>5} {:>9} {:>9}",
            "tick", "alive", "deaths", "meals", "helps", "hunger", "E", "T", "abundance", "hunt_p"
        )?;
    }

    let every = args.every.max(1);
    for _ in 0..args.ticks {
        let report = sim.advance_tick();
        match args.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &report).context("failed to encode tick")?;
                writeln!(out)?;
            }
            OutputFormat::Summary => {
                let deaths = report
                    .log
                    .iter()
                    .filter(|e| e.action == LogAction::Death);
                for death in deaths {
                    writeln!(out, "  t={} {} died", death.tick.0, death.agent)?;
                }
                if report.tick.0 % every == 0 {
                    write_summary(out, &report.summary)?;
                }
            }
        }
        if sim.is_extinct() {
            warn!(tick = sim.tick().0, "every agent has died");
            break;
        }
    }

    if args.format == OutputFormat::Summary {
        write_roster(out, &sim.frame())?;
        let graph = sim.social_graph();
        if !graph.links.is_empty() {
            writeln!(out, "\nrelationships:")?;
            for link in &graph.links {
                writeln!(out, "  {} -> {}: {:.2}", link.source, link.target, link.weight)?;
            }
        }
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, summary: &TickSummary) -> io::Result<()> {
    writeln!(
        out,
        "{:>6} {:>5} {:>6} {:>5} {:>5} {:>7.1} {:>6.2} {:>5.2} {:>9.3} {:>9.3}",
        summary.tick.0,
        summary.alive,
        summary.deaths,
        summary.meals,
        summary.helps,
        summary.average_hunger,
        summary.average_energy,
        summary.average_temperature,
        summary.mean_abundance,
        summary.mean_hunt_success,
    )
}

fn write_roster(out: &mut impl Write, frame: &Frame) -> io::Result<()> {
    writeln!(out, "\nfinal state at tick {}:", frame.tick.0)?;
    for agent in &frame.agents {
        writeln!(
            out,
            "  {:<12} {:<9} ({:>2},{:>2}) hunger {:>5.1} fatigue {:>5.1} injury {:>5.1} E {:.2} T {:.2}",
            agent.name,
            format!("{:?}", agent.mode),
            agent.x,
            agent.y,
            agent.hunger,
            agent.fatigue,
            agent.injury,
            agent.energy,
            agent.temperature,
        )?;
    }
    Ok(())
}
