//! @ai:module:intent Metric types for harness results
//! @ai:module:layer domain
//! @ai:module:public_api RunSummary, VariantSummary, FailureBreakdown, FailureCounts, TrapCategoryStats, SuiteReport, HarnessRun
//! @ai:module:stateless true

use crate::dataset::ExamVariant;
use crate::runner::TestResult;
use serde::Serialize;

/// Responses slower than this are listed as slow regardless of correctness
pub const SLOW_RESPONSE_THRESHOLD_MS: u64 = 10_000;

/// @ai:intent Suite-level statistics derived from a result set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_tests: usize,
    pub verified_count: usize,
    pub verifier_equiv_count: usize,
    pub verified_share: f64,
    pub verifier_equiv_rate: f64,
    pub avg_latency_ms: f64,
    pub error_count: usize,
    pub error_rate: f64,
}

/// @ai:intent Statistics restricted to one exam variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantSummary {
    pub exam_variant: ExamVariant,
    #[serde(flatten)]
    pub summary: RunSummary,
}

/// @ai:intent Analytical views of failing results; an item may sit in several
#[derive(Debug, Clone, Default)]
pub struct FailureBreakdown<'a> {
    /// Answered without error but not verified
    pub unverified: Vec<&'a TestResult>,
    /// Verified by the service but rejected by the equivalence check
    pub confident_but_wrong: Vec<&'a TestResult>,
    pub errored: Vec<&'a TestResult>,
    pub slow: Vec<&'a TestResult>,
}

impl FailureBreakdown<'_> {
    /// @ai:intent Size of each view
    /// @ai:effects pure
    pub fn counts(&self) -> FailureCounts {
        FailureCounts {
            unverified: self.unverified.len(),
            confident_but_wrong: self.confident_but_wrong.len(),
            errored: self.errored.len(),
            slow: self.slow.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounts {
    pub unverified: usize,
    pub confident_but_wrong: usize,
    pub errored: usize,
    pub slow: usize,
}

/// @ai:intent Outcome of trap items grouped by the failure mode they target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrapCategoryStats {
    pub category: String,
    pub total: usize,
    /// Not verifier-equivalent, including errored calls
    pub failures: usize,
    /// Service answered with exactly the trap's wrong answer
    pub elicited: usize,
}

/// @ai:intent One suite's results together with the statistics derived from them
/// @ai:invariant summary, breakdowns and counts are computed from `results` at construction
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub(crate) name: String,
    pub(crate) summary: RunSummary,
    pub(crate) by_variant: Vec<VariantSummary>,
    pub(crate) failure_counts: FailureCounts,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) trap_categories: Vec<TrapCategoryStats>,
    pub(crate) results: Vec<TestResult>,
}

impl SuiteReport {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn by_variant(&self) -> &[VariantSummary] {
        &self.by_variant
    }

    pub fn failure_counts(&self) -> FailureCounts {
        self.failure_counts
    }

    pub fn trap_categories(&self) -> &[TrapCategoryStats] {
        &self.trap_categories
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }
}

/// @ai:intent Both suites of one harness run plus their combined summary
#[derive(Debug, Clone, Serialize)]
pub struct HarnessRun {
    pub overall: RunSummary,
    pub golden: SuiteReport,
    pub traps: SuiteReport,
}
