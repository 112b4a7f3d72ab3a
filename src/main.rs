//! ECC command line entry point
//!
//! `ecc run` executes the four-stage weekly workflow once and prints the
//! briefing on stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use ecc_pipeline::agent::ecc::DEMO_INPUT;
use ecc_pipeline::agent::{build_provider, AgentFactory};
use ecc_pipeline::config::{load_env, EccConfig};
use ecc_pipeline::error::{EccError, EccResult};
use ecc_pipeline::observability::init_default_logging;
use ecc_pipeline::pipeline::{InMemorySessionStore, PipelineRunner, SequentialPipeline};
use ecc_pipeline::tools::ToolSystem;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

const BRIEFING_BANNER: &str = "==================== ECC BRIEFING ====================";
const BRIEFING_FOOTER: &str = "======================================================";

/// Executive command center: weekly notes in, prioritized plan and briefing out
#[derive(Parser)]
#[command(name = "ecc")]
#[command(about = "Four-stage LLM pipeline for weekly planning")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and print the briefing
    Run {
        /// File with the weekly notes (defaults to the built-in demo note)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// User id for the session (overrides app.user_id)
        #[arg(short, long, value_name = "ID")]
        user: Option<String>,
    },
    /// Print the strategic goal registry
    Goals,
    /// Validate configuration
    Config {
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_file = load_env();
    init_default_logging();
    env_file.log();

    info!("Starting ecc v{}", env!("CARGO_PKG_VERSION"));

    let result = match load_configuration(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Run { input, user } => run_pipeline(config, input, user).await,
            Commands::Goals => print_goals(&config),
            Commands::Config { show } => handle_config_command(&config, show),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("error: {}", e.user_message());
        process::exit(1);
    }
}

fn load_configuration(path: Option<&Path>) -> EccResult<EccConfig> {
    let (config, source) = EccConfig::discover(path)?;
    match source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => info!("Using built-in configuration"),
    }
    Ok(config)
}

async fn run_pipeline(
    mut config: EccConfig,
    input: Option<PathBuf>,
    user: Option<String>,
) -> EccResult<()> {
    if let Some(user) = user {
        config.app.user_id = user;
        config.validate()?;
    }

    let message = match input {
        Some(path) => {
            info!(path = %path.display(), "Reading weekly notes");
            tokio::fs::read_to_string(&path).await?
        }
        None => DEMO_INPUT.to_string(),
    };

    let runner = build_runner(&config).await?;
    info!(
        pipeline = runner.pipeline().name(),
        stages = runner.pipeline().len(),
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Pipeline ready"
    );

    let briefing = runner.run_once(&message).await?;

    println!("{BRIEFING_BANNER}");
    println!("{briefing}");
    println!("{BRIEFING_FOOTER}");
    Ok(())
}

/// Wire provider, tools, stages and session store from the config
async fn build_runner(config: &EccConfig) -> EccResult<PipelineRunner> {
    let provider = build_provider(config)?;
    let goals = config.goal_registry()?;

    let mut tools = ToolSystem::new();
    tools.initialize(&config.tools).await?;

    let factory = AgentFactory::from_config(config, provider);
    let pipeline = SequentialPipeline::ecc(&factory, &goals, Arc::new(tools))?;

    Ok(PipelineRunner::new(
        pipeline,
        InMemorySessionStore::new(),
        config.app.name.clone(),
        config.app.user_id.clone(),
    ))
}

fn print_goals(config: &EccConfig) -> EccResult<()> {
    let goals = config.goal_registry()?;
    for goal in goals.iter() {
        println!("{}  {}", goal.id, goal.name);
        println!("   {}", goal.description);
        println!("   horizon: {}", goal.time_horizon);
    }
    Ok(())
}

fn handle_config_command(config: &EccConfig, show: bool) -> EccResult<()> {
    if show {
        let rendered = toml::to_string_pretty(config).map_err(|e| {
            EccError::Config(ecc_pipeline::config::ConfigError::InvalidConfig(
                e.to_string(),
            ))
        })?;
        println!("{rendered}");
    }

    info!("Configuration validation complete");
    Ok(())
}
