use crate::Game;
use crate::scenario_file::ScenarioFile;
use anyhow::Context;
use cardquest_scenario::{
    BusinessPlan, CardQuestConfig, PolicyPlan, Session, Submission, Template, synthesize,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
pub struct PromptArgs {
    /// Scenario file (TOML)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Print the system message before the prompt
    #[arg(long)]
    pub system: bool,
}

impl PromptArgs {
    pub async fn execute(&self, cfg: CardQuestConfig) -> anyhow::Result<()> {
        let file = ScenarioFile::load(&self.scenario)?;
        let (system, prompt) = match file.game {
            Game::Business => {
                let mut session = file.open_session::<BusinessPlan>(None, cfg).await?;
                file.apply_projection_edits(&mut session)?;
                (BusinessPlan::system_prompt(), render(&file, &session)?)
            }
            Game::Policy => {
                let session = file
                    .open_session::<PolicyPlan>(file.policy_targets(), cfg)
                    .await?;
                (PolicyPlan::system_prompt(), render(&file, &session)?)
            }
        };

        if self.system {
            println!("{system}\n");
        }
        println!("{prompt}");
        Ok(())
    }
}

/// Render the prompt a submit with the file's free text would send
pub fn render<T: Template>(file: &ScenarioFile, session: &Session<T>) -> anyhow::Result<String> {
    let metrics = session.metrics()?;
    let selection = session
        .final_selection()
        .cloned()
        .context("selection is not final")?;
    let submission = Submission::new(
        session.team.clone(),
        selection,
        &file.text,
        session.parameters().clone(),
        file.date(),
    )?;
    Ok(synthesize(&submission, &metrics))
}
