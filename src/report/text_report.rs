//! @ai:module:intent Plain-text report rendering
//! @ai:module:layer infrastructure
//! @ai:module:public_api TextReporter, TextReporterTrait
//! @ai:module:stateless true

use crate::gate::{percent, GateVerdict};
use crate::metrics::{
    FailureCounts, HarnessRun, MetricsAggregator, RunSummary, SuiteReport,
    SLOW_RESPONSE_THRESHOLD_MS,
};
use crate::report::ReportContext;
use crate::runner::TestResult;

/// Itemized samples per failure view
pub const MAX_FAILURE_SAMPLES: usize = 10;
/// Itemized samples for errored calls
pub const MAX_ERROR_SAMPLES: usize = 5;

/// @ai:intent Trait for plain-text report rendering
pub trait TextReporterTrait: Send + Sync {
    /// @ai:intent Render a run and its verdict as text
    fn render(&self, run: &HarnessRun, verdict: &GateVerdict, context: &ReportContext) -> String;
}

/// @ai:intent Renders harness runs as a human-readable text document
pub struct TextReporter;

impl TextReporter {
    /// @ai:intent Create a new text reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Generate report header
    /// @ai:effects pure
    fn generate_header(context: &ReportContext) -> String {
        let mut output = String::new();

        heading(&mut output, "TUTOR QA HARNESS REPORT", '=');
        line(&mut output, format!("Generated: {}", context.generated_at));
        line(&mut output, format!("Run ID:    {}", context.run_id));
        line(&mut output, format!("Service:   {}", context.service));
        line(&mut output, "");

        output
    }

    /// @ai:intent Generate summary lines for a set of statistics
    /// @ai:effects pure
    fn generate_summary_block(summary: &RunSummary) -> String {
        let mut output = String::new();

        line(&mut output, format!("  {:<26}{}", "Total tests:", summary.total_tests));
        line(
            &mut output,
            format!(
                "  {:<26}{} ({})",
                "Verified:",
                summary.verified_count,
                percent(summary.verified_share)
            ),
        );
        line(
            &mut output,
            format!(
                "  {:<26}{} ({})",
                "Verifier equivalent:",
                summary.verifier_equiv_count,
                percent(summary.verifier_equiv_rate)
            ),
        );
        line(
            &mut output,
            format!("  {:<26}{:.0}ms", "Average latency:", summary.avg_latency_ms),
        );
        line(
            &mut output,
            format!(
                "  {:<26}{} ({})",
                "Errors:",
                summary.error_count,
                percent(summary.error_rate)
            ),
        );

        output
    }

    /// @ai:intent Generate gate status and itemized violations
    /// @ai:effects pure
    fn generate_gate_section(verdict: &GateVerdict) -> String {
        let mut output = String::new();
        let status = if verdict.passed { "PASSED" } else { "FAILED" };

        heading(&mut output, &format!("QUALITY GATES: {}", status), '-');

        if verdict.violations.is_empty() {
            line(&mut output, "  All gates passed.");
        }

        for message in verdict.messages() {
            line(&mut output, format!("  - {}", message));
        }

        line(&mut output, "");
        output
    }

    /// @ai:intent Generate the full section for one suite
    /// @ai:effects pure
    fn generate_suite_section(title: &str, suite: &SuiteReport) -> String {
        let mut output = String::new();

        heading(&mut output, title, '-');

        if suite.results().is_empty() {
            line(&mut output, "  No items.");
            line(&mut output, "");
            return output;
        }

        output.push_str(&Self::generate_summary_block(suite.summary()));
        line(&mut output, "");

        line(&mut output, "  By exam variant:");
        for variant in suite.by_variant() {
            let s = &variant.summary;
            line(
                &mut output,
                format!(
                    "    {}: total {} | verified {} ({}) | equivalent {} ({}) | avg {:.0}ms | errors {} ({})",
                    variant.exam_variant,
                    s.total_tests,
                    s.verified_count,
                    percent(s.verified_share),
                    s.verifier_equiv_count,
                    percent(s.verifier_equiv_rate),
                    s.avg_latency_ms,
                    s.error_count,
                    percent(s.error_rate)
                ),
            );
        }
        line(&mut output, "");

        output.push_str(&Self::generate_failure_counts(suite.failure_counts()));

        if !suite.trap_categories().is_empty() {
            line(&mut output, "  Trap categories:");
            for stats in suite.trap_categories() {
                line(
                    &mut output,
                    format!(
                        "    {}: {} items, {} failed, {} elicited the trap answer",
                        stats.category, stats.total, stats.failures, stats.elicited
                    ),
                );
            }
            line(&mut output, "");
        }

        output.push_str(&Self::generate_samples(suite.results()));
        output
    }

    /// @ai:intent Generate failure-category counts
    /// @ai:effects pure
    fn generate_failure_counts(counts: FailureCounts) -> String {
        let mut output = String::new();

        line(&mut output, "  Failure categories:");
        line(&mut output, format!("    {:<26}{}", "Verification failed:", counts.unverified));
        line(
            &mut output,
            format!("    {:<26}{}", "Confident but wrong:", counts.confident_but_wrong),
        );
        line(&mut output, format!("    {:<26}{}", "Errors:", counts.errored));
        line(
            &mut output,
            format!(
                "    {:<26}{}",
                format!("Slow (>{}ms):", SLOW_RESPONSE_THRESHOLD_MS),
                counts.slow
            ),
        );
        line(&mut output, "");

        output
    }

    /// @ai:intent Generate bounded samples of the most informative failures
    /// @ai:effects pure
    fn generate_samples(results: &[TestResult]) -> String {
        let mut output = String::new();
        let breakdown = MetricsAggregator::classify_failures(results);

        sample_list(
            &mut output,
            "Verification failures",
            &breakdown.unverified,
            MAX_FAILURE_SAMPLES,
            answer_lines,
        );
        sample_list(
            &mut output,
            "Confident but wrong",
            &breakdown.confident_but_wrong,
            MAX_FAILURE_SAMPLES,
            answer_lines,
        );
        sample_list(
            &mut output,
            "Errors",
            &breakdown.errored,
            MAX_ERROR_SAMPLES,
            |result| {
                let mut lines = answer_lines(result);
                lines.push(format!(
                    "      Error:    {}",
                    result.error.as_deref().unwrap_or_default()
                ));
                lines
            },
        );
        sample_list(
            &mut output,
            "Slow responses",
            &breakdown.slow,
            MAX_FAILURE_SAMPLES,
            |result| {
                vec![format!(
                    "    - [{}] ({}) {}ms",
                    result.id, result.exam_variant, result.latency_ms
                )]
            },
        );

        output
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextReporterTrait for TextReporter {
    /// @ai:intent Render a run and its verdict as text
    /// @ai:post identical inputs yield byte-identical output
    /// @ai:effects pure
    fn render(&self, run: &HarnessRun, verdict: &GateVerdict, context: &ReportContext) -> String {
        let mut content = String::new();

        content.push_str(&Self::generate_header(context));

        heading(&mut content, "OVERALL SUMMARY", '-');
        content.push_str(&Self::generate_summary_block(&run.overall));
        line(&mut content, "");

        content.push_str(&Self::generate_gate_section(verdict));
        content.push_str(&Self::generate_suite_section("GOLDEN SUITE", &run.golden));
        content.push_str(&Self::generate_suite_section("TRAP SUITE", &run.traps));

        content
    }
}

fn line(output: &mut String, text: impl AsRef<str>) {
    output.push_str(text.as_ref());
    output.push('\n');
}

fn heading(output: &mut String, title: &str, underline: char) {
    line(output, title);
    line(output, underline.to_string().repeat(title.chars().count()));
}

/// Expected vs actual answer lines for one failing item
fn answer_lines(result: &TestResult) -> Vec<String> {
    vec![
        format!("    - [{}] ({})", result.id, result.exam_variant),
        format!("      Question: {}", result.question),
        format!("      Expected: {}", result.expected_answer),
        format!("      Actual:   {}", result.actual_answer),
        format!("      Trust:    {:.2}", result.trust_score),
    ]
}

/// Write at most `limit` items, then an "...and N more" marker for the rest
fn sample_list<F>(output: &mut String, title: &str, items: &[&TestResult], limit: usize, render: F)
where
    F: Fn(&TestResult) -> Vec<String>,
{
    if items.is_empty() {
        return;
    }

    line(
        output,
        format!("  {} (showing {} of {}):", title, items.len().min(limit), items.len()),
    );

    for result in items.iter().take(limit) {
        for text in render(result) {
            line(output, text);
        }
    }

    if items.len() > limit {
        line(output, format!("    ...and {} more", items.len() - limit));
    }

    line(output, "");
}
