//! Response normalization
//!
//! The evaluator's answer is untrusted text. Code fences are stripped, the
//! outermost `{ ... }` is sliced out and parsed; anything that is not a JSON
//! object fails with [`ScenarioError::MalformedAiResponse`] carrying only the
//! raw length and a bounded preview. A parsed object is read leniently into
//! the template's assessment and merged with the locally computed metrics,
//! which always win over numbers the evaluator echoes back.

use crate::errors::{Result, ScenarioError};
use crate::template::Template;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of characters kept in diagnostics
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Normalized evaluation: the evaluator's assessment plus trusted metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EvaluationResult<T: Template> {
    #[serde(flatten)]
    pub assessment: T::Assessment,
    pub metrics: T::Metrics,
}

/// First `max_chars` characters of `text`
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn malformed(
    raw: &str,
    candidate: &str,
    preview_chars: usize,
    source: Option<serde_json::Error>,
) -> ScenarioError {
    let raw_length = raw.chars().count();
    let preview = preview(candidate, preview_chars);
    tracing::warn!(
        raw_length,
        preview = %preview,
        error = ?source,
        "Evaluator response is not a JSON object"
    );
    ScenarioError::MalformedAiResponse {
        raw_length,
        preview,
        source,
    }
}

/// Text between the outermost braces once code fences are stripped
fn json_candidate(raw: &str) -> String {
    let stripped = raw.replace("```json", "").replace("```", "");
    let trimmed = stripped.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Pull one JSON object out of free-form evaluator text
pub fn extract_json(raw: &str, preview_chars: usize) -> Result<Value> {
    let candidate = json_candidate(raw);
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value) if value.is_object() => Ok(value),
        Ok(_) => Err(malformed(raw, &candidate, preview_chars, None)),
        Err(e) => Err(malformed(raw, &candidate, preview_chars, Some(e))),
    }
}

/// Parse evaluator text into an [`EvaluationResult`] carrying `metrics`
pub fn normalize<T: Template>(
    raw: &str,
    metrics: T::Metrics,
    preview_chars: usize,
) -> Result<EvaluationResult<T>> {
    let value = extract_json(raw, preview_chars)?;

    let mut assessment: T::Assessment = serde_json::from_value(value)
        .map_err(|e| malformed(raw, &json_candidate(raw), preview_chars, Some(e)))?;
    T::finalize_assessment(&mut assessment);

    tracing::info!(
        template = T::NAME,
        raw_length = raw.chars().count(),
        "Evaluation normalized"
    );
    Ok(EvaluationResult {
        assessment,
        metrics,
    })
}
