//! Replay a recorded observation log through a pilot
//!
//! Reads JSON lines of `{ "observation": ..., "report": ... }` and writes one
//! decision per line as JSON. Useful for regression-checking decisions
//! against captured sessions.

use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use pokepilot::anomaly::ProfileStore;
use pokepilot::core::config::PilotConfig;
use pokepilot::core::error::{PilotError, Result};
use pokepilot::navigation::WorldGraph;
use pokepilot::pilot::{ActuationReport, Observation, Pilot};
use pokepilot::planner::{ActionCatalog, Condition, Goal, Requirement};

#[derive(Parser, Debug)]
#[command(name = "pilot_replay")]
#[command(about = "Replay a JSON-lines observation log and print each decision")]
struct Args {
    /// World graph definition (JSON or TOML)
    #[arg(long)]
    graph: PathBuf,

    /// Action catalog (JSON or TOML)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Goals to push before the first tick (TOML)
    #[arg(long)]
    goals: Option<PathBuf>,

    /// Pilot configuration (TOML); defaults when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Duration profile store, loaded at start and written back at the end
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Observation log; stdin when absent
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print the final pilot snapshot to stderr
    #[arg(long)]
    snapshot: bool,
}

#[derive(Debug, Deserialize)]
struct ReplayFrame {
    observation: Observation,
    #[serde(default)]
    report: Option<ActuationReport>,
}

#[derive(Debug, Default, Deserialize)]
struct GoalFile {
    #[serde(default)]
    goals: Vec<GoalEntry>,
}

#[derive(Debug, Deserialize)]
struct GoalEntry {
    name: String,
    priority: f32,
    #[serde(default)]
    desired: Vec<Condition>,
    #[serde(default)]
    requirements: Vec<Requirement>,
    #[serde(default)]
    deadline: Option<u64>,
}

impl GoalEntry {
    fn into_goal(self) -> Goal {
        let mut goal = Goal::new(self.name, self.priority);
        goal.desired = self.desired;
        goal.requirements = self.requirements;
        goal.deadline = self.deadline;
        goal
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("pokepilot=info")
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PilotConfig::load(path)?,
        None => PilotConfig::default(),
    };
    let graph = WorldGraph::load(&args.graph)?;
    let catalog = match &args.catalog {
        Some(path) => ActionCatalog::load(path)?,
        None => ActionCatalog::new(),
    };
    let profiles = match &args.profiles {
        Some(path) => ProfileStore::load(path)?,
        None => ProfileStore::new(),
    };

    let mut pilot = Pilot::new(config, graph, catalog)?.with_profiles(profiles);
    tracing::info!(instance = %pilot.id(), "Pilot ready");

    if let Some(path) = &args.goals {
        let file: GoalFile = toml::from_str(&fs::read_to_string(path)?)?;
        for entry in file.goals {
            pilot.push_goal(entry.into_goal());
        }
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut tick = 0;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: ReplayFrame = serde_json::from_str(&line).map_err(|e| {
            PilotError::Config(format!("line {}: {}", line_no + 1, e))
        })?;
        let report = frame.report.unwrap_or_else(|| ActuationReport::at(tick));
        tick = report.tick + 1;

        let decision = pilot.tick(&frame.observation, &report);
        writeln!(out, "{}", serde_json::to_string(&decision)?)?;

        if let Err(err) = pilot.stall() {
            tracing::error!(error = %err, "Stopping replay");
            break;
        }
    }

    if args.snapshot {
        eprintln!("{}", serde_json::to_string_pretty(&pilot.snapshot())?);
    }
    if let Some(path) = &args.profiles {
        pilot.profiles().save(path)?;
    }

    Ok(())
}
