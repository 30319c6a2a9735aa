//! Mocksim - CLI companion for inspecting a mock directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mocksim::loader::{DirLoader, RouteSource};
use mocksim::recording::Recorder;
use mocksim::scenario::ScenarioManager;
use mocksim::EngineConfig;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "mocksim",
    about = "Inspect and validate mock directories, scenarios and recordings",
    version
)]
struct Args {
    /// Mock root directory
    #[arg(short, long, default_value = "mock")]
    root: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "warn")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every route file loads, reporting per-file route counts
    Validate,
    /// Print the effective route table in load order
    Routes,
    /// List persisted scenarios
    Scenarios,
    /// List persisted recordings
    Recordings,
    /// Print a sample payload from a data template
    Sample {
        /// Template name (user, product, article, list, error)
        name: String,
        /// Number of values to generate
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EngineConfig {
        root: args.root,
        ..EngineConfig::default()
    };

    match args.command {
        Command::Validate => validate(&config),
        Command::Routes => routes(&config),
        Command::Scenarios => scenarios(&config).await,
        Command::Recordings => recordings(&config).await,
        Command::Sample { name, count } => sample(&name, count),
    }
}

fn validate(config: &EngineConfig) -> Result<()> {
    let loader = DirLoader::new(&config.root, &config.ignore)?;
    let files = loader.scan_files()?;
    if files.is_empty() {
        println!("No route files under {}", config.root.display());
        return Ok(());
    }

    let mut total = 0usize;
    let mut failures = 0usize;
    for path in &files {
        match DirLoader::load_file(path) {
            Ok(defs) => {
                total += defs.len();
                println!("ok   {} ({} routes)", path.display(), defs.len());
            }
            Err(e) => {
                failures += 1;
                println!("FAIL {}: {}", path.display(), e);
            }
        }
    }

    println!("{} files, {} routes, {} failures", files.len(), total, failures);
    if failures > 0 {
        anyhow::bail!("{} route file(s) failed to load", failures);
    }
    Ok(())
}

fn routes(config: &EngineConfig) -> Result<()> {
    let loader = DirLoader::new(&config.root, &config.ignore)?;
    let routes = loader.load()?;
    if routes.is_empty() {
        println!("No routes loaded");
        return Ok(());
    }

    for route in &routes {
        let def = route.def();
        println!(
            "{:7} {}{}",
            def.method.as_deref().unwrap_or("*"),
            def.url,
            def.status
                .map(|s| format!("  -> {}", s))
                .unwrap_or_default()
        );
    }
    Ok(())
}

async fn scenarios(config: &EngineConfig) -> Result<()> {
    let manager = ScenarioManager::new(config.scenarios_dir());
    manager.init().await?;

    for scenario in manager.list().await {
        println!(
            "{}{}  ({} routes){}",
            scenario.name,
            if scenario.active { " *" } else { "" },
            scenario.routes.len(),
            if scenario.description.is_empty() {
                String::new()
            } else {
                format!("  - {}", scenario.description)
            }
        );
    }
    Ok(())
}

async fn recordings(config: &EngineConfig) -> Result<()> {
    let recorder = Recorder::new(config.recordings_dir());
    let names = recorder.list().await?;
    if names.is_empty() {
        println!("No recordings");
        return Ok(());
    }

    for name in names {
        let entries = recorder.load(&name).await?;
        println!("{}  ({} entries)", name, entries.len());
    }
    Ok(())
}

fn sample(name: &str, count: usize) -> Result<()> {
    let value = mocksim::datagen::generate(name, count)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
