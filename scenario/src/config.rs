//! CardQuest configuration loading
//!
//! Loads configuration from `~/.config/cardquest/cardquest.toml` (or the
//! `CARDQUEST_CONFIG` env var). Every key is optional; missing keys fall back
//! to the values the card games ship with.

use crate::errors::{Result, ScenarioError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for the scenario pipeline
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CardQuestConfig {
    /// 5-year projection settings (business template)
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Population and target settings (policy template)
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Response normalizer settings
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// HTTP evaluator settings
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Card catalog files
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Save location for evaluated plans
    #[serde(default)]
    pub store: StoreConfig,
}

/// Projection engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectionConfig {
    /// Yearly growth applied to monthly sales when initializing (0.20 = 20%)
    #[serde(default = "default_growth_rate")]
    pub growth_rate: f64,

    /// Number of projected years
    #[serde(default = "default_years")]
    pub years: u8,

    /// Year-1 monthly sales used when the persona card carries none
    #[serde(default = "default_fallback_monthly_sales")]
    pub fallback_monthly_sales: u64,

    /// Year-1 unit price used when the problem card carries none
    #[serde(default = "default_fallback_unit_price")]
    pub fallback_unit_price: f64,

    /// Year-1 cost per unit used when the partner card carries none
    #[serde(default = "default_fallback_variable_cost")]
    pub fallback_variable_cost: f64,
}

fn default_growth_rate() -> f64 {
    0.20
}
fn default_years() -> u8 {
    5
}
fn default_fallback_monthly_sales() -> u64 {
    10
}
fn default_fallback_unit_price() -> f64 {
    10_000.0
}
fn default_fallback_variable_cost() -> f64 {
    1_000.0
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            growth_rate: default_growth_rate(),
            years: default_years(),
            fallback_monthly_sales: default_fallback_monthly_sales(),
            fallback_unit_price: default_fallback_unit_price(),
            fallback_variable_cost: default_fallback_variable_cost(),
        }
    }
}

/// Policy template configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PolicyConfig {
    /// Population of the municipality at game start
    #[serde(default = "default_baseline_population")]
    pub baseline_population: u32,

    /// Default population goal offered to teams
    #[serde(default = "default_target_population")]
    pub default_target_population: u32,

    /// Default well-being index goal offered to teams
    #[serde(default = "default_target_well_being")]
    pub default_target_well_being: u32,

    /// Smallest accepted population goal
    #[serde(default = "default_min_target_population")]
    pub min_target_population: u32,

    /// Largest accepted population goal
    #[serde(default = "default_max_target_population")]
    pub max_target_population: u32,

    /// Smallest accepted well-being goal
    #[serde(default = "default_min_target_well_being")]
    pub min_target_well_being: u32,

    /// Largest accepted well-being goal
    #[serde(default = "default_max_target_well_being")]
    pub max_target_well_being: u32,
}

fn default_baseline_population() -> u32 {
    10_000
}
fn default_target_population() -> u32 {
    12_000
}
fn default_target_well_being() -> u32 {
    75
}
fn default_min_target_population() -> u32 {
    10_001
}
fn default_max_target_population() -> u32 {
    20_000
}
fn default_min_target_well_being() -> u32 {
    40
}
fn default_max_target_well_being() -> u32 {
    100
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            baseline_population: default_baseline_population(),
            default_target_population: default_target_population(),
            default_target_well_being: default_target_well_being(),
            min_target_population: default_min_target_population(),
            max_target_population: default_max_target_population(),
            min_target_well_being: default_min_target_well_being(),
            max_target_well_being: default_max_target_well_being(),
        }
    }
}

/// Response normalizer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NormalizerConfig {
    /// Characters of the candidate kept in diagnostics and logs
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_preview_chars() -> usize {
    200
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

/// OpenAI-compatible chat completions evaluator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EvaluatorConfig {
    /// Full chat completions URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ask the provider for a JSON object response
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
}

fn default_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_api_key_env() -> String {
    "CARDQUEST_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_json_mode() -> bool {
    true
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            json_mode: default_json_mode(),
        }
    }
}

/// Card catalog file locations
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// JSON card file for the business-plan game
    #[serde(default = "default_business_catalog")]
    pub business_path: String,

    /// JSON card file for the policy-plan game
    #[serde(default = "default_policy_catalog")]
    pub policy_path: String,
}

fn default_business_catalog() -> String {
    "~/.config/cardquest/cards/business.json".to_string()
}
fn default_policy_catalog() -> String {
    "~/.config/cardquest/cards/policy.json".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            business_path: default_business_catalog(),
            policy_path: default_policy_catalog(),
        }
    }
}

/// Save location configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory receiving one JSON record per saved plan
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("cardquest").join("plans").to_string_lossy().into_owned())
        .unwrap_or_else(|| "cardquest-plans".to_string())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

impl CardQuestConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "CARDQUEST_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "cardquest.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `CARDQUEST_CONFIG` environment variable
    /// 2. `~/.config/cardquest/cardquest.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::info!(
                path = %path.display(),
                "CardQuest config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ScenarioError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: CardQuestConfig = toml::from_str(contents)
            .map_err(|e| ScenarioError::config_with_source("failed to parse config", e))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the configuration file path
    pub fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("cardquest")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.projection.years == 0 {
            return Err(ScenarioError::config("projection.years must be at least 1"));
        }

        if self.projection.growth_rate <= -1.0 {
            return Err(ScenarioError::config(
                "projection.growth_rate must be greater than -1.0",
            ));
        }

        if self.projection.growth_rate > 1.0 {
            tracing::warn!(
                growth_rate = self.projection.growth_rate,
                "Growth rate above 100% per year, projections will grow very fast"
            );
        }

        let policy = &self.policy;
        if !(policy.min_target_population..=policy.max_target_population)
            .contains(&policy.default_target_population)
        {
            return Err(ScenarioError::config(
                "policy.default_target_population is outside the accepted range",
            ));
        }

        if !(policy.min_target_well_being..=policy.max_target_well_being)
            .contains(&policy.default_target_well_being)
        {
            return Err(ScenarioError::config(
                "policy.default_target_well_being is outside the accepted range",
            ));
        }

        if self.normalizer.preview_chars == 0 {
            tracing::warn!("normalizer.preview_chars is 0; malformed responses carry no preview");
        }

        if self.evaluator.endpoint.trim().is_empty() {
            tracing::warn!("evaluator.endpoint is empty; evaluations will fail at runtime");
        }

        Ok(())
    }

    /// Card catalog path for the business-plan game (expanding ~)
    pub fn resolved_business_catalog(&self) -> PathBuf {
        expand_home(&self.catalog.business_path)
    }

    /// Card catalog path for the policy-plan game (expanding ~)
    pub fn resolved_policy_catalog(&self) -> PathBuf {
        expand_home(&self.catalog.policy_path)
    }

    /// Directory for saved plans (expanding ~)
    pub fn resolved_store_dir(&self) -> PathBuf {
        expand_home(&self.store.dir)
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}
