//! @ai:module:intent Quality gate evaluation over run statistics
//! @ai:module:layer domain
//! @ai:module:public_api QualityGate, QualityGateTrait, GateVerdict, GateViolation, GateKind
//! @ai:module:stateless true

use crate::config::QualityGateConfig;
use crate::metrics::RunSummary;
use serde::Serialize;

/// @ai:intent Which threshold a violation breached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    VerifiedShare,
    VerifierEquivRate,
    AvgLatency,
    ErrorRate,
}

/// @ai:intent A single breached threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateViolation {
    pub gate: GateKind,
    pub actual: f64,
    pub threshold: f64,
    pub message: String,
}

/// @ai:intent Pass/fail decision with every breached threshold listed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateVerdict {
    pub passed: bool,
    pub violations: Vec<GateViolation>,
}

impl GateVerdict {
    /// @ai:intent Human-readable violation messages in evaluation order
    /// @ai:effects pure
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    /// @ai:intent Process exit status for CI: 0 on pass, 1 on failure
    /// @ai:effects pure
    pub fn exit_code(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }
}

/// @ai:intent Trait for gate evaluation
pub trait QualityGateTrait: Send + Sync {
    /// @ai:intent Compare a summary against thresholds
    fn evaluate(&self, summary: &RunSummary) -> GateVerdict;
}

/// @ai:intent Evaluates run statistics against configured thresholds
pub struct QualityGate {
    config: QualityGateConfig,
}

impl QualityGate {
    /// @ai:intent Create a gate with the given thresholds
    /// @ai:effects pure
    pub fn new(config: QualityGateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityGateConfig {
        &self.config
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(QualityGateConfig::default())
    }
}

impl QualityGateTrait for QualityGate {
    /// @ai:intent Run all four checks unconditionally
    /// @ai:post passed is true iff violations is empty
    /// @ai:effects pure
    fn evaluate(&self, summary: &RunSummary) -> GateVerdict {
        let config = &self.config;
        let mut violations = Vec::new();

        if summary.verified_share < config.min_verified_share {
            violations.push(GateViolation {
                gate: GateKind::VerifiedShare,
                actual: summary.verified_share,
                threshold: config.min_verified_share,
                message: format!(
                    "Verified share {} is below the minimum of {}",
                    percent(summary.verified_share),
                    percent(config.min_verified_share)
                ),
            });
        }

        if summary.verifier_equiv_rate < config.min_verifier_equiv_rate {
            violations.push(GateViolation {
                gate: GateKind::VerifierEquivRate,
                actual: summary.verifier_equiv_rate,
                threshold: config.min_verifier_equiv_rate,
                message: format!(
                    "Verifier equivalence rate {} is below the minimum of {}",
                    percent(summary.verifier_equiv_rate),
                    percent(config.min_verifier_equiv_rate)
                ),
            });
        }

        if summary.avg_latency_ms > config.max_avg_latency_ms {
            violations.push(GateViolation {
                gate: GateKind::AvgLatency,
                actual: summary.avg_latency_ms,
                threshold: config.max_avg_latency_ms,
                message: format!(
                    "Average latency {:.0}ms exceeds the maximum of {:.0}ms",
                    summary.avg_latency_ms, config.max_avg_latency_ms
                ),
            });
        }

        if summary.error_rate > config.max_error_rate {
            violations.push(GateViolation {
                gate: GateKind::ErrorRate,
                actual: summary.error_rate,
                threshold: config.max_error_rate,
                message: format!(
                    "Error rate {} exceeds the maximum of {}",
                    percent(summary.error_rate),
                    percent(config.max_error_rate)
                ),
            });
        }

        GateVerdict {
            passed: violations.is_empty(),
            violations,
        }
    }
}

/// @ai:intent Format a [0, 1] rate as a percentage
/// @ai:effects pure
pub(crate) fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}
