//! `cardquest` command line
//!
//! ## Commands
//!
//! - `cardquest cards` - List a game's catalog grouped by category
//! - `cardquest project` - Print a 5-year projection from year-1 values
//! - `cardquest prompt <scenario.toml>` - Render the evaluation prompt
//! - `cardquest play <scenario.toml>` - Evaluate, save and snapshot a scenario
//! - `cardquest normalize` - Turn a raw evaluator answer into an evaluation
//!
//! ## Exit Codes
//! - 0: Success
//! - 2: Invalid input (scenario file, selection, free text, config)
//! - 3: External failure (catalog, evaluator, store); retrying may succeed

pub mod cards_cmd;
pub mod normalize_cmd;
pub mod play_cmd;
pub mod project_cmd;
pub mod prompt_cmd;
pub mod scenario_file;

use cardquest_scenario::{CardQuestConfig, ScenarioError};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

pub const EXIT_INVALID_INPUT: i32 = 2;
pub const EXIT_EXTERNAL: i32 = 3;

/// CardQuest scenario composition and evaluation
#[derive(Debug, Parser)]
#[command(name = "cardquest", version)]
pub struct Cli {
    /// Config file (overrides CARDQUEST_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the cards of a game, grouped by category
    Cards(cards_cmd::CardsArgs),
    /// Compute a 5-year projection from year-1 values
    Project(project_cmd::ProjectArgs),
    /// Render the evaluation prompt for a scenario file without calling the evaluator
    Prompt(prompt_cmd::PromptArgs),
    /// Run a scenario file through evaluation and save
    Play(play_cmd::PlayArgs),
    /// Normalize a raw evaluator answer
    Normalize(normalize_cmd::NormalizeArgs),
}

impl Cli {
    pub async fn run(self) -> i32 {
        let cfg = match self.load_config() {
            Ok(cfg) => cfg,
            Err(e) => return report(&e.into()),
        };

        let outcome = match self.command {
            Command::Cards(args) => args.execute(&cfg).await,
            Command::Project(args) => args.execute(&cfg),
            Command::Prompt(args) => args.execute(cfg).await,
            Command::Play(args) => args.execute(cfg).await,
            Command::Normalize(args) => args.execute(&cfg),
        };

        match outcome {
            Ok(()) => 0,
            Err(e) => report(&e),
        }
    }

    fn load_config(&self) -> cardquest_scenario::Result<CardQuestConfig> {
        match &self.config {
            Some(path) => CardQuestConfig::load_from_path(path),
            None => CardQuestConfig::load(),
        }
    }
}

/// Which card game a command works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    Business,
    Policy,
}

/// Exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ScenarioError>() {
        Some(e) if e.category().is_external() => EXIT_EXTERNAL,
        _ => EXIT_INVALID_INPUT,
    }
}

/// Print a failed command's error chain to stderr and return its exit code
pub fn report(err: &anyhow::Error) -> i32 {
    eprintln!("error: {err:#}");
    if let Some(e) = err.downcast_ref::<ScenarioError>() {
        eprintln!("{}", e.user_message());
    }
    exit_code(err)
}
