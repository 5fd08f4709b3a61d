//! CardQuest scenario pipeline
//!
//! Teams pick four themed cards (one per category), tune parameters, write a
//! short plan, and get an AI evaluation merged with locally computed metrics.
//! Two games share the pipeline through the [`Template`] trait:
//! [`BusinessPlan`] (5-year revenue projection) and [`PolicyPlan`]
//! (municipal well-being and population targets).
//!
//! Stages:
//! - [`selection`]: ordered four-category state machine over a catalog snapshot
//! - [`projection`]: pure financial and policy arithmetic
//! - [`prompt`]: deterministic rendering of a submission
//! - [`normalize`]: extraction of a JSON object from untrusted evaluator text
//! - [`session`]: one team's serializable pass through all of the above
//!
//! External services sit behind the traits in [`collaborators`]; file and
//! HTTP implementations live in [`adapters`].

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod adapters;
pub mod card;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod lenient;
pub mod normalize;
pub mod projection;
pub mod prompt;
pub mod selection;
pub mod session;
pub mod template;

pub use card::{Card, Suit};
pub use collaborators::{CardCatalog, CardLabel, Evaluator, SaveReceipt, SaveSummary, ScenarioStore};
pub use config::CardQuestConfig;
pub use errors::{ErrorCategory, Result, ScenarioError};
pub use normalize::{EvaluationResult, extract_json, normalize};
pub use projection::{
    Aggregate, MonthlyMetrics, PolicyMetrics, YearField, YearParameter, YearResult,
};
pub use prompt::{Submission, Team, synthesize};
pub use selection::{Catalog, FinalSelection, SelectionMachine, SelectionState};
pub use session::Session;
pub use template::{BusinessPlan, Category, PolicyPlan, Template, TextField};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
