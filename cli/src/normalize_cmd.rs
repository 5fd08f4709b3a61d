use crate::Game;
use anyhow::Context;
use cardquest_scenario::{BusinessPlan, CardQuestConfig, PolicyPlan, Template, normalize};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
pub struct NormalizeArgs {
    /// Which game's answer schema to apply
    #[arg(long, value_enum, default_value_t = Game::Business)]
    pub game: Game,

    /// Raw evaluator answer; `-` reads stdin
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: PathBuf,

    /// Locally computed metrics (JSON) to merge over the answer
    #[arg(long, value_name = "PATH")]
    pub metrics: Option<PathBuf>,
}

impl NormalizeArgs {
    pub fn execute(&self, cfg: &CardQuestConfig) -> anyhow::Result<()> {
        let raw = read_input(&self.input)?;
        let preview_chars = cfg.normalizer.preview_chars;
        let json = match self.game {
            Game::Business => self.normalize_as::<BusinessPlan>(&raw, preview_chars)?,
            Game::Policy => self.normalize_as::<PolicyPlan>(&raw, preview_chars)?,
        };
        println!("{json}");
        Ok(())
    }

    fn normalize_as<T: Template>(&self, raw: &str, preview_chars: usize) -> anyhow::Result<String> {
        let metrics: T::Metrics = match &self.metrics {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read metrics {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("invalid metrics {}", path.display()))?
            }
            None => Default::default(),
        };
        let result = normalize::<T>(raw, metrics, preview_chars)?;
        Ok(serde_json::to_string_pretty(&result)?)
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
