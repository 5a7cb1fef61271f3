use crate::core::RecommendationConfig;
use crate::models::{RecommendationWeights, DEFAULT_MAX_DISTANCE_KM};
use crate::routes::SearchLimits;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub trust: TrustSettings,
    #[serde(default)]
    pub sentiment: SentimentSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Which collaborator implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_max_distance_km")]
    pub default_max_distance_km: f64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: f64,
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_max_distance_km: default_max_distance_km(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            overfetch_factor: default_overfetch_factor(),
            collaborator_timeout_ms: default_collaborator_timeout_ms(),
            price_tolerance: default_price_tolerance(),
            weights: WeightsConfig::default(),
        }
    }
}

fn default_max_distance_km() -> f64 { DEFAULT_MAX_DISTANCE_KM }
fn default_limit() -> usize { 20 }
fn default_max_limit() -> usize { 50 }
fn default_overfetch_factor() -> usize { 2 }
fn default_collaborator_timeout_ms() -> u64 { 2000 }
fn default_price_tolerance() -> f64 { 3000.0 }

/// Recommendation weights in points
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_skills_weight")]
    pub skills: f64,
    #[serde(default = "default_price_weight")]
    pub price: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_trust_weight")]
    pub trust: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            location: default_location_weight(),
            skills: default_skills_weight(),
            price: default_price_weight(),
            rating: default_rating_weight(),
            trust: default_trust_weight(),
        }
    }
}

fn default_location_weight() -> f64 { 40.0 }
fn default_skills_weight() -> f64 { 25.0 }
fn default_price_weight() -> f64 { 15.0 }
fn default_rating_weight() -> f64 { 10.0 }
fn default_trust_weight() -> f64 { 10.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct TrustSettings {
    /// Seconds between full trust refreshes, 0 disables the task
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_response_rate")]
    pub default_response_rate: f64,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            default_response_rate: default_response_rate(),
        }
    }
}

fn default_refresh_interval_secs() -> u64 { 3600 }
fn default_response_rate() -> f64 { 1.0 }

/// Keywords appended to the built-in sentiment lexicon
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentSettings {
    #[serde(default)]
    pub extra_positive: Vec<String>,
    #[serde(default)]
    pub extra_negative: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with WORKMATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., WORKMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("WORKMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("WORKMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the engines cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.matching.weights.to_weights();
        if (weights.total() - 100.0).abs() > 1e-6 {
            return Err(ConfigError::Message(format!(
                "matching.weights must add up to 100, got {}",
                weights.total()
            )));
        }
        if [weights.location, weights.skills, weights.price, weights.rating, weights.trust]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(ConfigError::Message("matching.weights must be non-negative".to_string()));
        }
        if self.matching.max_limit == 0 || self.matching.default_limit > self.matching.max_limit {
            return Err(ConfigError::Message(
                "matching.default_limit must not exceed a non-zero matching.max_limit".to_string(),
            ));
        }
        let max_distance = self.matching.default_max_distance_km;
        if !max_distance.is_finite() || max_distance <= 0.0 {
            return Err(ConfigError::Message(
                "matching.default_max_distance_km must be positive".to_string(),
            ));
        }
        if self.matching.price_tolerance <= 0.0 {
            return Err(ConfigError::Message("matching.price_tolerance must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.trust.default_response_rate) {
            return Err(ConfigError::Message(
                "trust.default_response_rate must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn recommendation_config(&self) -> RecommendationConfig {
        RecommendationConfig {
            weights: self.matching.weights.to_weights(),
            overfetch_factor: self.matching.overfetch_factor.max(1),
            price_tolerance: self.matching.price_tolerance,
            collaborator_timeout: Duration::from_millis(self.matching.collaborator_timeout_ms),
        }
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            default_limit: self.matching.default_limit,
            max_limit: self.matching.max_limit,
            default_max_distance_km: self.matching.default_max_distance_km,
        }
    }
}

impl WeightsConfig {
    pub fn to_weights(&self) -> RecommendationWeights {
        RecommendationWeights {
            location: self.location,
            skills: self.skills,
            price: self.price,
            rating: self.rating,
            trust: self.trust,
        }
    }
}

/// Apply the conventional DATABASE_URL override
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    // DATABASE_URL first, then WORKMATCH__DATABASE__URL
    let database_url = env::var("DATABASE_URL")
        .or_else(|_| env::var("WORKMATCH__DATABASE__URL"))
        .ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }

    builder.build()
}
