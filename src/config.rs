// ⚙️ Engine configuration
// Loaded from a JSON file or environment variables, validated after loading

use crate::data_quality::{DataQualityEngine, DEFAULT_MAX_ERROR_SAMPLES};
use crate::schema::Schema;
use anyhow::{bail, Context as AnyhowContext, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const ENV_CONFIG_PATH: &str = "OUTLIER_CONFIG_PATH";
pub const ENV_LOG_LEVEL: &str = "OUTLIER_LOG_LEVEL";
pub const ENV_STRICT_MODE: &str = "OUTLIER_STRICT_MODE";
pub const ENV_MAX_ERROR_SAMPLES: &str = "OUTLIER_MAX_ERROR_SAMPLES";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "warning", "error"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_error_samples: usize,

    /// Fail the run when any record is invalid
    pub strict_mode: bool,

    pub log_level: String,

    /// Field → nullable, applied over the validation schema
    pub null_policies: IndexMap<String, bool>,

    /// Overrides the built-in betting schemas when present
    pub validation_schema: Option<Schema>,
    pub normalization_schema: Option<Schema>,

    /// Records sharing this key are collapsed before processing
    pub dedupe_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let null_policies = [
            ("event_id", false),
            ("sport", false),
            ("event_date", false),
            ("teams", false),
            ("odds_provider", false),
            ("odds", false),
            ("line", true),
            ("volume", false),
            ("timestamp", false),
            ("data_source", false),
        ]
        .into_iter()
        .map(|(field, nullable)| (field.to_string(), nullable))
        .collect();

        EngineConfig {
            max_error_samples: DEFAULT_MAX_ERROR_SAMPLES,
            strict_mode: false,
            log_level: "info".to_string(),
            null_policies,
            validation_schema: None,
            normalization_schema: None,
            dedupe_key: Some("event_id".to_string()),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: EngineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// File named by OUTLIER_CONFIG_PATH, otherwise defaults plus env overrides
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_CONFIG_PATH) {
            return Self::from_file(path);
        }

        let mut config = EngineConfig::default();

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        if let Some(strict) = lookup(ENV_STRICT_MODE) {
            config.strict_mode = strict.trim().eq_ignore_ascii_case("true");
        }

        if let Some(max) = lookup(ENV_MAX_ERROR_SAMPLES) {
            config.max_error_samples = max
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer: {}", ENV_MAX_ERROR_SAMPLES, max))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!(
                "Invalid log level: {}. Must be one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }

        for (name, schema) in [
            ("validation_schema", &self.validation_schema),
            ("normalization_schema", &self.normalization_schema),
        ] {
            if let Some(schema) = schema {
                schema
                    .check_structure()
                    .with_context(|| format!("Invalid {}", name))?;
            }
        }

        Ok(())
    }

    /// Directive for `tracing_subscriber::EnvFilter`
    pub fn tracing_directive(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" => "error",
            _ => "info",
        }
    }

    pub fn validation_schema(&self) -> Schema {
        let mut schema = self
            .validation_schema
            .clone()
            .unwrap_or_else(Schema::betting_validation);
        schema.apply_null_policies(&self.null_policies);
        schema
    }

    pub fn normalization_schema(&self) -> Schema {
        self.normalization_schema
            .clone()
            .unwrap_or_else(Schema::betting_normalization)
    }

    pub fn engine(&self) -> DataQualityEngine {
        DataQualityEngine::new().with_max_error_samples(self.max_error_samples)
    }
}

// ============================================================================
// TESTS
// ============================================================================
