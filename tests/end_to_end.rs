use pretty_assertions::assert_eq;
use qa_harness::config::HarnessConfig;
use qa_harness::dataset::{DatasetLoader, DatasetLoaderTrait, GoldenItem, TrapItem};
use qa_harness::gate::GateKind;
use qa_harness::harness::Harness;
use qa_harness::report::{ReportContext, ReportGenerator};
use qa_harness::runner::{AnswerClientTrait, AnswerError, AnswerRequest, AnswerResponse};
use std::sync::Arc;
use tempfile::TempDir;

const GOLDEN: &str = r#"{"id":"g-001","exam_variant":"calc_ab","question":"d/dx x^2","expected_answer":"2x","expected_justification":"power rule","difficulty":"easy","topic":"derivatives"}
{"id":"g-002","exam_variant":"calc_ab","question":"integral of 2x dx","expected_answer":"x^2 + C","expected_justification":"reverse power rule","difficulty":"easy","topic":"integrals"}

{"id":"g-003","exam_variant":"calc_bc","question":"sum of 1/2^n from n=1","expected_answer":"1","expected_justification":"geometric series","difficulty":"medium","topic":"series"}
"#;

/// Answers correctly except for the series question, which times out
struct ScriptedClient;

impl AnswerClientTrait for ScriptedClient {
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
        if request.question.starts_with("sum") {
            return Err(AnswerError::Timeout(30_000));
        }

        Ok(AnswerResponse {
            answer: "ok".to_string(),
            is_verified: true,
            trust_score: 0.95,
            verifier_equiv: true,
        })
    }
}

#[tokio::test]
async fn test_load_execute_aggregate_gate_report() {
    let temp = TempDir::new().unwrap();
    let golden_path = temp.path().join("golden.jsonl");
    let traps_path = temp.path().join("traps.jsonl");
    std::fs::write(&golden_path, GOLDEN).unwrap();
    std::fs::write(&traps_path, "").unwrap();

    let loader = DatasetLoader::new();
    let golden: Vec<GoldenItem> = loader.load(&golden_path).unwrap();
    let traps: Vec<TrapItem> = loader.load(&traps_path).unwrap();
    assert_eq!(golden.len(), 3);
    assert!(traps.is_empty());

    let harness = Harness::new(Arc::new(ScriptedClient), &HarnessConfig::default(), "run-e2e");
    let outcome = harness.run(&golden, &traps).await.unwrap();

    let summary = &outcome.run.overall;
    assert_eq!(summary.total_tests, 3);
    assert_eq!(summary.verified_count, 2);
    assert_eq!(summary.error_count, 1);
    assert!((summary.verifier_equiv_rate - 2.0 / 3.0).abs() < 1e-9);

    let failed = outcome
        .run
        .golden
        .results()
        .iter()
        .find(|r| r.id == "g-003")
        .unwrap();
    assert_eq!(failed.error.as_deref(), Some("request timed out after 30000ms"));
    assert!(!failed.is_verified);

    assert!(!outcome.verdict.passed);
    assert_eq!(outcome.verdict.exit_code(), 1);
    let kinds: Vec<_> = outcome.verdict.violations.iter().map(|v| v.gate).collect();
    assert!(kinds.contains(&GateKind::VerifiedShare));
    assert!(kinds.contains(&GateKind::VerifierEquivRate));
    // 1 of 3 errored also breaches the 1% error ceiling
    assert_eq!(
        kinds,
        vec![
            GateKind::VerifiedShare,
            GateKind::VerifierEquivRate,
            GateKind::ErrorRate
        ]
    );

    let context = ReportContext {
        generated_at: "2026-01-19T00:00:00Z".to_string(),
        run_id: outcome.run_id.clone(),
        service: "scripted".to_string(),
    };
    let report_path = temp.path().join("out").join("qa-report.txt");
    let (text, json_path) = ReportGenerator::new()
        .generate_all(&outcome.run, &outcome.verdict, &context, &report_path)
        .unwrap();

    assert_eq!(std::fs::read_to_string(&report_path).unwrap(), text);
    assert!(text.contains("QUALITY GATES: FAILED"));
    assert!(text.contains("Verified share 66.7% is below the minimum of 98.5%"));
    assert!(text.contains("[g-003] (calc_bc)"));
    assert!(text.contains("Expected: 1\n"));
    assert!(text.contains("Error:    request timed out after 30000ms"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(json["run"]["overall"]["total_tests"], 3);
    assert_eq!(json["context"]["run_id"], "run-e2e");
}

#[tokio::test]
async fn test_invalid_record_aborts_before_any_call() {
    let temp = TempDir::new().unwrap();
    let golden_path = temp.path().join("golden.jsonl");
    std::fs::write(&golden_path, format!("{}{{not json}}\n", GOLDEN)).unwrap();

    let err = DatasetLoader::new()
        .load::<GoldenItem>(&golden_path)
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains(":5:"), "unexpected message: {message}");
    assert!(message.contains("{not json}"));
}
