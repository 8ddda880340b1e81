use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gardensim::{
    events::{FanoutSink, MemorySink, TracingSink},
    scenario::{Scenario, ScenarioLoader},
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Autonomous smart-garden simulator")]
struct Cli {
    /// Path to a scenario YAML file (the standard garden when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override tick count for headless runs
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Serve the JSON/SSE API and run in real time instead of headless
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Simulation speed multiplier for the real-time driver (0.1 to 10)
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::standard(),
    };
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }

    if cli.serve {
        let journal = Arc::new(MemorySink::default());
        let sink = FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(journal.clone());
        let engine = scenario.build_engine(Arc::new(sink))?;
        return web::run(WebServerConfig {
            engine,
            journal,
            host: cli.host,
            port: cli.port,
            speed: cli.speed,
        })
        .await;
    }

    let ticks = scenario.ticks(cli.ticks);
    let mut engine = scenario.build_engine(Arc::new(TracingSink))?;
    let failures = engine.run(ticks);

    println!(
        "Garden '{}' completed {} ticks ({} isolated failures).",
        scenario.name,
        engine.current_tick(),
        failures
    );
    println!("{}", engine.status_line());
    for summary in engine.status_summaries() {
        println!("  {summary}");
    }
    Ok(())
}
