//! @ai:module:intent Report generation for harness runs
//! @ai:module:layer infrastructure
//! @ai:module:public_api ReportGenerator, ReportContext, TextReporter, JsonReporter

pub mod json_report;
pub mod text_report;

pub use json_report::{JsonReporter, JsonReporterTrait, ResultsDocument};
pub use text_report::{TextReporter, TextReporterTrait, MAX_ERROR_SAMPLES, MAX_FAILURE_SAMPLES};

use crate::gate::GateVerdict;
use crate::metrics::HarnessRun;
use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// @ai:intent Run metadata supplied by the caller so rendering stays pure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportContext {
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub run_id: String,
    /// Endpoint or "dry-run"
    pub service: String,
}

/// @ai:intent Combined report generator
pub struct ReportGenerator {
    text: TextReporter,
    json: JsonReporter,
}

impl ReportGenerator {
    /// @ai:intent Create a new report generator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            text: TextReporter::new(),
            json: JsonReporter::new(),
        }
    }

    /// @ai:intent Render the text report
    /// @ai:effects pure
    pub fn render(&self, run: &HarnessRun, verdict: &GateVerdict, context: &ReportContext) -> String {
        self.text.render(run, verdict, context)
    }

    /// @ai:intent Write report text, creating missing parent directories
    /// @ai:effects fs:write
    pub fn persist_report(&self, text: &str, path: &Path) -> Result<()> {
        create_parent_dir(path)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        tracing::info!("Report written to {}", path.display());
        Ok(())
    }

    /// @ai:intent Render and persist the text report plus a JSON document beside it
    /// @ai:post returns the rendered text and the JSON path
    /// @ai:effects fs:write
    pub fn generate_all(
        &self,
        run: &HarnessRun,
        verdict: &GateVerdict,
        context: &ReportContext,
        report_path: &Path,
    ) -> Result<(String, PathBuf)> {
        let text = self.render(run, verdict, context);
        self.persist_report(&text, report_path)?;

        let json_path = results_path(report_path);
        let document = ResultsDocument {
            context,
            verdict,
            run,
        };
        self.json
            .generate(&document, &json_path)
            .with_context(|| format!("Failed to write results: {}", json_path.display()))?;

        tracing::info!("Results written to {}", json_path.display());
        Ok((text, json_path))
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// @ai:intent Location of the JSON document written beside a text report
/// @ai:post never equal to `report_path`
/// @ai:effects pure
pub fn results_path(report_path: &Path) -> PathBuf {
    let is_json = report_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if !is_json {
        return report_path.with_extension("json");
    }

    let mut name: OsString = report_path.file_stem().unwrap_or_default().to_os_string();
    name.push(".results.json");
    report_path.with_file_name(name)
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{QualityGate, QualityGateTrait};
    use crate::metrics::{MetricsAggregator, MetricsAggregatorTrait};
    use tempfile::TempDir;

    fn empty_run() -> (HarnessRun, GateVerdict) {
        let aggregator = MetricsAggregator::new();
        let run = aggregator.combine(
            aggregator.aggregate("golden", vec![]),
            aggregator.aggregate("traps", vec![]),
        );
        let verdict = QualityGate::default().evaluate(&run.overall);
        (run, verdict)
    }

    fn context() -> ReportContext {
        ReportContext {
            generated_at: "2026-01-19T00:00:00Z".to_string(),
            run_id: "run-1".to_string(),
            service: "dry-run".to_string(),
        }
    }

    #[test]
    fn test_persist_creates_missing_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("deeper").join("qa-report.txt");

        ReportGenerator::new().persist_report("hello\n", &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_generate_all_writes_text_and_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("results").join("qa-report.txt");
        let (run, verdict) = empty_run();

        let generator = ReportGenerator::new();
        let (text, json_path) = generator
            .generate_all(&run, &verdict, &context(), &path)
            .unwrap();

        assert_eq!(json_path, temp.path().join("results").join("qa-report.json"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
        assert_eq!(text, generator.render(&run, &verdict, &context()));
        assert!(json_path.exists());
    }

    #[test]
    fn test_results_path_never_overwrites_report() {
        assert_eq!(
            results_path(Path::new("results/qa-report.txt")),
            PathBuf::from("results/qa-report.json")
        );
        assert_eq!(
            results_path(Path::new("results/qa-report")),
            PathBuf::from("results/qa-report.json")
        );
        assert_eq!(
            results_path(Path::new("results/qa-report.json")),
            PathBuf::from("results/qa-report.results.json")
        );
        assert_eq!(
            results_path(Path::new("out.JSON")),
            PathBuf::from("out.results.json")
        );
    }

    #[test]
    fn test_generate_all_with_json_report_path_keeps_both_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("qa-report.json");
        let (run, verdict) = empty_run();

        let (text, json_path) = ReportGenerator::new()
            .generate_all(&run, &verdict, &context(), &path)
            .unwrap();

        assert_ne!(json_path, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["context"]["run_id"], "run-1");
    }
}
