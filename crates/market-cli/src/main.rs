//! Curation market CLI - runs scenario files through the settlement engine

mod scenario;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use market_core::MarketConfig;
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "market")]
#[command(about = "Curation market - pairwise ranking with stake-weighted settlement")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a scenario
    Run {
        /// Scenario file path
        #[arg(short, long, default_value = "scenarios/baseline.json")]
        scenario: PathBuf,
        /// Rounds to run, overriding the scenario
        #[arg(short, long)]
        rounds: Option<u64>,
        /// RNG seed, overriding the scenario config
        #[arg(long)]
        seed: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check scenario validity
    Check {
        /// Scenario file path
        #[arg(short, long, default_value = "scenarios/baseline.json")]
        scenario: PathBuf,
    },
    /// Print the default market config as JSON
    Defaults,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            rounds,
            seed,
            json,
        }) => {
            let mut scenario = Scenario::from_path(&scenario)?;
            if let Some(seed) = seed {
                scenario.config.seed = Some(seed);
            }
            let rounds = rounds.unwrap_or(scenario.rounds);
            tracing::info!(scenario = %scenario.name, rounds, seed = ?scenario.config.seed, "starting run");

            let summary = scenario.build()?.run(rounds)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
        Some(Commands::Check { scenario }) => {
            let parsed = Scenario::from_path(&scenario)?;
            println!(
                "{}: OK ({} curator specs, {} groups, {} markets, {} golden pairs)",
                scenario.display(),
                parsed.curators.len(),
                parsed.groups.len(),
                parsed.markets.len(),
                parsed.golden.len()
            );
        }
        Some(Commands::Defaults) => {
            println!("{}", serde_json::to_string_pretty(&MarketConfig::default())?);
        }
        None => {
            println!("Curation market v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
