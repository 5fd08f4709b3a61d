//! File and HTTP implementations of the collaborator traits.

pub mod file_store;
pub mod http_evaluator;
pub mod json_catalog;

pub use file_store::{FileScenarioStore, SavedScenario};
pub use http_evaluator::HttpEvaluator;
pub use json_catalog::JsonCatalog;
