//! `cardquest play`: evaluate a scenario file end to end
//!
//! The session snapshot is written whenever `--snapshot` is given, also
//! after a failed submit or save, so the selection and projection survive.

use crate::Game;
use crate::scenario_file::ScenarioFile;
use anyhow::Context;
use cardquest_scenario::adapters::{FileScenarioStore, HttpEvaluator};
use cardquest_scenario::{
    BusinessPlan, CardQuestConfig, Evaluator, PolicyPlan, ScenarioStore, Session, Template,
};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
pub struct PlayArgs {
    /// Scenario file (TOML)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Write the session snapshot (JSON) to this path
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Evaluate only; do not save the result
    #[arg(long)]
    pub no_save: bool,

    /// Print the full evaluation as JSON
    #[arg(long)]
    pub json: bool,
}

impl PlayArgs {
    pub async fn execute(&self, cfg: CardQuestConfig) -> anyhow::Result<()> {
        let file = ScenarioFile::load(&self.scenario)?;
        let evaluator = HttpEvaluator::from_config(&cfg.evaluator)?;
        let store = FileScenarioStore::new(cfg.resolved_store_dir());

        match file.game {
            Game::Business => {
                let mut session = file.open_session::<BusinessPlan>(None, cfg).await?;
                file.apply_projection_edits(&mut session)?;
                self.play(&file, &mut session, &evaluator, &store).await
            }
            Game::Policy => {
                let mut session = file
                    .open_session::<PolicyPlan>(file.policy_targets(), cfg)
                    .await?;
                self.play(&file, &mut session, &evaluator, &store).await
            }
        }
    }

    async fn play<T: Template>(
        &self,
        file: &ScenarioFile,
        session: &mut Session<T>,
        evaluator: &dyn Evaluator,
        store: &dyn ScenarioStore,
    ) -> anyhow::Result<()> {
        let submitted = session
            .submit(&file.text, evaluator, file.date())
            .await
            .map(|_| ());
        if let Err(e) = submitted {
            self.write_snapshot(session)?;
            return Err(e.into());
        }

        let summary = session.save_summary()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&session.evaluation())?);
        } else {
            println!("{}", summary.title);
            println!("Result: {}", summary.headline_score);
        }

        if !self.no_save {
            let saved = session.save(store).await.map(|r| r.location_url.clone());
            match saved {
                Ok(url) => println!("Saved: {url}"),
                Err(e) => {
                    self.write_snapshot(session)?;
                    return Err(e.into());
                }
            }
        }

        self.write_snapshot(session)
    }

    fn write_snapshot<T: Template>(&self, session: &Session<T>) -> anyhow::Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        write_json(path, session)
    }
}

fn write_json<T: Template>(path: &Path, session: &Session<T>) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(session)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), "Session snapshot written");
    Ok(())
}
