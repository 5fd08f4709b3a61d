//! Scenario pipeline error types
//!
//! Local errors (`IncompleteSelection`, `Validation`, `Config`) block the
//! current action and are fixed by the participant. External errors come from
//! a collaborator (catalog, evaluator, store) and are recovered by a manual
//! retry; the pipeline itself never retries.

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error category for structured logging and behavior mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required category has no selected card
    IncompleteSelection,
    /// A required free-text field is empty or a parameter is out of range
    ValidationError,
    /// The card catalog could not be fetched
    CatalogError,
    /// The AI evaluation call failed (status or transport)
    AiServiceError,
    /// The AI answered with text that holds no parseable JSON object
    MalformedResponse,
    /// The save collaborator failed
    PersistenceError,
    /// `cardquest.toml` or env misconfigured
    ConfigError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncompleteSelection => "INCOMPLETE_SELECTION",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::CatalogError => "CATALOG_UNAVAILABLE",
            Self::AiServiceError => "AI_SERVICE_UNAVAILABLE",
            Self::MalformedResponse => "MALFORMED_AI_RESPONSE",
            Self::PersistenceError => "PERSISTENCE_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// Whether the failure originated in an external collaborator
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::CatalogError
                | Self::AiServiceError
                | Self::MalformedResponse
                | Self::PersistenceError
        )
    }

    /// Whether re-issuing the same action unchanged can succeed
    pub fn is_retryable(&self) -> bool {
        self.is_external()
    }
}

/// Scenario pipeline error with category and context
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("incomplete selection: missing {}", missing.join(", "))]
    IncompleteSelection { missing: Vec<String> },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("card catalog unavailable: {message}")]
    CatalogUnavailable {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("AI service unavailable: {message}")]
    AiServiceUnavailable {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("malformed AI response ({raw_length} chars): {preview:?}")]
    MalformedAiResponse {
        raw_length: usize,
        preview: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("persistence failed: {message}")]
    PersistenceFailed {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl ScenarioError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IncompleteSelection { .. } => ErrorCategory::IncompleteSelection,
            Self::Validation { .. } => ErrorCategory::ValidationError,
            Self::CatalogUnavailable { .. } => ErrorCategory::CatalogError,
            Self::AiServiceUnavailable { .. } => ErrorCategory::AiServiceError,
            Self::MalformedAiResponse { .. } => ErrorCategory::MalformedResponse,
            Self::PersistenceFailed { .. } => ErrorCategory::PersistenceError,
            Self::Config { .. } => ErrorCategory::ConfigError,
        }
    }

    /// Whether re-issuing the same action unchanged can succeed
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Short message suitable for showing to a participant
    pub fn user_message(&self) -> String {
        match self {
            Self::IncompleteSelection { missing } => {
                format!("Pick one card for each category (missing: {}).", missing.join(", "))
            }
            Self::Validation { message } => message.clone(),
            Self::CatalogUnavailable { .. } => {
                "Could not load the card catalog. Please reload and try again.".to_string()
            }
            Self::AiServiceUnavailable { .. } => {
                "The AI evaluation failed. Please wait a moment and try again.".to_string()
            }
            Self::MalformedAiResponse { .. } => {
                "The AI answer could not be read. Please submit again.".to_string()
            }
            Self::PersistenceFailed { .. } => {
                "Saving failed. Your evaluation is still available; try saving again.".to_string()
            }
            Self::Config { message, .. } => format!("Configuration problem: {message}"),
        }
    }

    /// Create an incomplete-selection error naming the missing categories
    pub fn incomplete_selection<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::IncompleteSelection {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a catalog error with source
    pub fn catalog_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an AI service error
    pub fn ai_service(message: impl Into<String>) -> Self {
        Self::AiServiceUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an AI service error with source
    pub fn ai_service_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::AiServiceUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a persistence error with source
    pub fn persistence_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PersistenceFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for scenario pipeline operations
pub type Result<T> = std::result::Result<T, ScenarioError>;
