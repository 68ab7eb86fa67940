//! @ai:module:intent Configuration structs for the QA harness
//! @ai:module:layer infrastructure
//! @ai:module:public_api HarnessConfig, ServiceConfig, RunConfig, QualityGateConfig, PathConfig, FilterConfig
//! @ai:module:stateless true

use crate::dataset::ExamVariant;
use crate::runner::ScheduleMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// @ai:intent Main configuration for a harness run
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub gates: QualityGateConfig,
    #[serde(default)]
    pub paths: PathConfig,
}

/// @ai:intent Connection settings for the answering service
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Per-call timeout enforced by the HTTP client
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// @ai:intent Execution settings for a harness run
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub schedule: ScheduleMode,
    /// Outer timeout around each call; `None` derives it from the service timeout, 0 disables it
    #[serde(default)]
    pub guard_timeout_ms: Option<u64>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// @ai:intent Thresholds a run must satisfy to pass the quality gate
/// @ai:effects pure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityGateConfig {
    #[serde(default = "default_min_verified_share")]
    pub min_verified_share: f64,
    #[serde(default = "default_min_verifier_equiv_rate")]
    pub min_verifier_equiv_rate: f64,
    #[serde(default = "default_max_avg_latency_ms")]
    pub max_avg_latency_ms: f64,
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: f64,
}

/// @ai:intent Dataset and output locations
/// @ai:effects pure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_golden_path")]
    pub golden: PathBuf,
    #[serde(default = "default_traps_path")]
    pub traps: PathBuf,
    #[serde(default = "default_report_path")]
    pub report: PathBuf,
}

/// @ai:intent Filter for selecting items by exam variant
/// @ai:effects pure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub variants: Option<Vec<ExamVariant>>,
}

/// @ai:intent Configuration values that cannot drive a meaningful run
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("service timeout must be greater than zero")]
    ZeroTimeout,

    #[error("service endpoint is empty")]
    EmptyEndpoint,

    #[error("gate threshold {name} must lie in [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },

    #[error("gate threshold max_avg_latency_ms must be non-negative, got {0}")]
    NegativeLatency(f64),
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_env: default_token_env(),
            user_id: default_user_id(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            schedule: ScheduleMode::default(),
            guard_timeout_ms: None,
            dry_run: false,
            filter: FilterConfig::default(),
        }
    }
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_verified_share: default_min_verified_share(),
            min_verifier_equiv_rate: default_min_verifier_equiv_rate(),
            max_avg_latency_ms: default_max_avg_latency_ms(),
            max_error_rate: default_max_error_rate(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            golden: default_golden_path(),
            traps: default_traps_path(),
            report: default_report_path(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:54321/functions/v1/coach".to_string()
}

fn default_token_env() -> String {
    "QA_SERVICE_TOKEN".to_string()
}

fn default_user_id() -> String {
    "qa-harness".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_concurrency() -> usize {
    5
}

/// Grace added on top of the service timeout for the outer guard
const GUARD_GRACE_MS: u64 = 1_000;

fn default_min_verified_share() -> f64 {
    0.985
}

fn default_min_verifier_equiv_rate() -> f64 {
    0.99
}

fn default_max_avg_latency_ms() -> f64 {
    5_000.0
}

fn default_max_error_rate() -> f64 {
    0.01
}

fn default_golden_path() -> PathBuf {
    PathBuf::from("datasets/golden.jsonl")
}

fn default_traps_path() -> PathBuf {
    PathBuf::from("datasets/traps.jsonl")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("results/qa-report.txt")
}

impl HarnessConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// @ai:intent Reject settings that would make the run meaningless
    /// @ai:effects pure
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }

        if self.service.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.service.endpoint.trim().is_empty() && !self.run.dry_run {
            return Err(ConfigError::EmptyEndpoint);
        }

        self.gates.validate()
    }
}

impl RunConfig {
    /// @ai:intent Resolve the outer guard timeout for each call
    /// @ai:effects pure
    pub fn guard_timeout(&self, service_timeout_ms: u64) -> Option<Duration> {
        match self.guard_timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(Duration::from_millis(service_timeout_ms + GUARD_GRACE_MS)),
        }
    }
}

impl QualityGateConfig {
    /// @ai:intent Check that thresholds are within their domains
    /// @ai:effects pure
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = [
            ("min_verified_share", self.min_verified_share),
            ("min_verifier_equiv_rate", self.min_verifier_equiv_rate),
            ("max_error_rate", self.max_error_rate),
        ];

        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }

        if self.max_avg_latency_ms.is_nan() || self.max_avg_latency_ms < 0.0 {
            return Err(ConfigError::NegativeLatency(self.max_avg_latency_ms));
        }

        Ok(())
    }
}

impl FilterConfig {
    /// @ai:intent Check if filter matches an item's variant
    /// @ai:effects pure
    pub fn matches(&self, variant: ExamVariant) -> bool {
        self.variants
            .as_ref()
            .map(|v| v.contains(&variant))
            .unwrap_or(true)
    }
}
