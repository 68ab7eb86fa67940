//! @ai:module:intent Statistical aggregation for harness results
//! @ai:module:layer application
//! @ai:module:public_api MetricsAggregator, MetricsAggregatorTrait
//! @ai:module:stateless true

use crate::dataset::ExamVariant;
use crate::metrics::types::{
    FailureBreakdown, HarnessRun, RunSummary, SuiteReport, TrapCategoryStats, VariantSummary,
    SLOW_RESPONSE_THRESHOLD_MS,
};
use crate::runner::TestResult;
use std::collections::BTreeMap;

/// @ai:intent Trait for metrics aggregation
pub trait MetricsAggregatorTrait: Send + Sync {
    /// @ai:intent Aggregate one suite's results into a report
    fn aggregate(&self, name: &str, results: Vec<TestResult>) -> SuiteReport;

    /// @ai:intent Combine the golden and trap suites into one run
    fn combine(&self, golden: SuiteReport, traps: SuiteReport) -> HarnessRun;
}

/// @ai:intent Aggregates test results into statistical summaries
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// @ai:intent Create a new metrics aggregator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Reduce a result set to suite-level statistics
    /// @ai:post shares and rates lie in [0, 1]; an empty set yields zeros
    /// @ai:effects pure
    pub fn summarize<'a, I>(results: I) -> RunSummary
    where
        I: IntoIterator<Item = &'a TestResult>,
    {
        let mut summary = RunSummary::default();
        let mut latency_sum = 0.0;

        for result in results {
            summary.total_tests += 1;
            summary.verified_count += usize::from(result.is_verified);
            summary.verifier_equiv_count += usize::from(result.verifier_equiv);
            summary.error_count += usize::from(result.is_error());
            latency_sum += result.latency_ms as f64;
        }

        if summary.total_tests == 0 {
            return summary;
        }

        let total = summary.total_tests as f64;
        summary.verified_share = summary.verified_count as f64 / total;
        summary.verifier_equiv_rate = summary.verifier_equiv_count as f64 / total;
        summary.error_rate = summary.error_count as f64 / total;
        summary.avg_latency_ms = latency_sum / total;
        summary
    }

    /// @ai:intent Per-variant statistics, omitting variants with no results
    /// @ai:effects pure
    pub fn summarize_by_variant(results: &[TestResult]) -> Vec<VariantSummary> {
        ExamVariant::ALL
            .iter()
            .filter_map(|variant| {
                let variant_results: Vec<_> =
                    results.iter().filter(|r| r.exam_variant == *variant).collect();

                if variant_results.is_empty() {
                    return None;
                }

                Some(VariantSummary {
                    exam_variant: *variant,
                    summary: Self::summarize(variant_results),
                })
            })
            .collect()
    }

    /// @ai:intent Sort failing results into the four analytical views
    /// @ai:effects pure
    pub fn classify_failures(results: &[TestResult]) -> FailureBreakdown<'_> {
        let mut breakdown = FailureBreakdown::default();

        for result in results {
            if result.is_error() {
                breakdown.errored.push(result);
            } else if !result.is_verified {
                breakdown.unverified.push(result);
            } else if !result.verifier_equiv {
                breakdown.confident_but_wrong.push(result);
            }

            if result.latency_ms > SLOW_RESPONSE_THRESHOLD_MS {
                breakdown.slow.push(result);
            }
        }

        breakdown
    }

    /// @ai:intent Group trap results by category, sorted by category name
    /// @ai:effects pure
    pub fn summarize_trap_categories(results: &[TestResult]) -> Vec<TrapCategoryStats> {
        let mut by_category: BTreeMap<&str, TrapCategoryStats> = BTreeMap::new();

        for result in results {
            let Some(category) = result.trap_category.as_deref() else {
                continue;
            };

            let stats = by_category
                .entry(category)
                .or_insert_with(|| TrapCategoryStats {
                    category: category.to_string(),
                    total: 0,
                    failures: 0,
                    elicited: 0,
                });

            stats.total += 1;
            stats.failures += usize::from(result.is_error() || !result.verifier_equiv);
            stats.elicited += usize::from(result.trap_elicited);
        }

        by_category.into_values().collect()
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregatorTrait for MetricsAggregator {
    /// @ai:intent Aggregate one suite's results into a report
    /// @ai:effects pure
    fn aggregate(&self, name: &str, results: Vec<TestResult>) -> SuiteReport {
        SuiteReport {
            name: name.to_string(),
            summary: Self::summarize(&results),
            by_variant: Self::summarize_by_variant(&results),
            failure_counts: Self::classify_failures(&results).counts(),
            trap_categories: Self::summarize_trap_categories(&results),
            results,
        }
    }

    /// @ai:intent Combine the golden and trap suites into one run
    /// @ai:effects pure
    fn combine(&self, golden: SuiteReport, traps: SuiteReport) -> HarnessRun {
        let overall = Self::summarize(golden.results.iter().chain(traps.results.iter()));

        HarnessRun {
            overall,
            golden,
            traps,
        }
    }
}
