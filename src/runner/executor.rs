//! @ai:module:intent Bounded-concurrency execution of dataset items
//! @ai:module:layer application
//! @ai:module:public_api BatchExecutor, ExecutionSettings, ExecutionError, ScheduleMode, TestResult
//! @ai:module:stateless false

use crate::config::HarnessConfig;
use crate::dataset::{EvalItem, ExamVariant};
use crate::runner::client::{AnswerClientTrait, AnswerError, AnswerRequest, AnswerResponse};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// @ai:intent How in-flight calls are scheduled under the concurrency ceiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Fixed groups of at most C calls; a group finishes before the next starts
    #[default]
    Batched,
    /// Sliding window of C calls; a new call starts whenever a slot frees
    Pipelined,
}

impl ScheduleMode {
    /// @ai:intent Get string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleMode::Batched => "batched",
            ScheduleMode::Pipelined => "pipelined",
        }
    }
}

/// @ai:intent Outcome of asking the service one item, created once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub exam_variant: ExamVariant,
    pub question: String,
    pub expected_answer: String,
    pub actual_answer: String,
    pub is_verified: bool,
    pub trust_score: f64,
    pub verifier_equiv: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trap_category: Option<String>,
    /// The service produced exactly the wrong answer the trap aims for
    #[serde(default)]
    pub trap_elicited: bool,
}

impl TestResult {
    /// @ai:intent Build a result from a successful service response
    /// @ai:effects pure
    pub fn answered<T: EvalItem + ?Sized>(item: &T, response: AnswerResponse, latency_ms: u64) -> Self {
        let trap_elicited = item
            .trap()
            .map(|(_, wrong)| normalize_answer(&response.answer) == normalize_answer(wrong))
            .unwrap_or(false);

        Self {
            id: item.id().to_string(),
            exam_variant: item.exam_variant(),
            question: item.question().to_string(),
            expected_answer: item.expected_answer().to_string(),
            actual_answer: response.answer,
            is_verified: response.is_verified,
            trust_score: response.trust_score,
            verifier_equiv: response.verifier_equiv,
            latency_ms,
            error: None,
            trap_category: item.trap().map(|(category, _)| category.to_string()),
            trap_elicited,
        }
    }

    /// @ai:intent Build a zero-credit result for a failed call
    /// @ai:effects pure
    pub fn failed<T: EvalItem + ?Sized>(item: &T, error: &AnswerError, latency_ms: u64) -> Self {
        Self {
            id: item.id().to_string(),
            exam_variant: item.exam_variant(),
            question: item.question().to_string(),
            expected_answer: item.expected_answer().to_string(),
            actual_answer: String::new(),
            is_verified: false,
            trust_score: 0.0,
            verifier_equiv: false,
            latency_ms,
            error: Some(error.to_string()),
            trap_category: item.trap().map(|(category, _)| category.to_string()),
            trap_elicited: false,
        }
    }

    /// @ai:intent Whether the call itself failed
    /// @ai:effects pure
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Collapse whitespace and case so formatting noise does not hide an elicited trap
fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// @ai:intent Run-level failure that invalidates the whole run
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(
        "answering service unreachable: {failed} consecutive {suite} calls failed at the transport level \
         after {completed} of {total} completed (last error: {last_error})"
    )]
    ServiceUnreachable {
        suite: String,
        failed: usize,
        completed: usize,
        total: usize,
        last_error: String,
    },
}

/// @ai:intent Settings the executor needs for one run
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub concurrency: usize,
    pub schedule: ScheduleMode,
    /// Outer bound on each call, on top of the client's own timeout
    pub guard_timeout: Option<Duration>,
    pub user_id: String,
    pub run_id: String,
}

impl ExecutionSettings {
    /// @ai:intent Derive execution settings from harness config
    /// @ai:effects pure
    pub fn from_config(config: &HarnessConfig, run_id: &str) -> Self {
        Self {
            concurrency: config.run.concurrency,
            schedule: config.run.schedule,
            guard_timeout: config.run.guard_timeout(config.service.timeout_ms),
            user_id: config.service.user_id.clone(),
            run_id: run_id.to_string(),
        }
    }
}

/// Result of one call plus whether it failed before reaching the service
struct CallOutcome {
    result: TestResult,
    transport_failure: bool,
}

/// @ai:intent Drives items through the answering service under a concurrency ceiling
pub struct BatchExecutor<C: AnswerClientTrait> {
    client: Arc<C>,
    settings: ExecutionSettings,
}

impl<C: AnswerClientTrait> BatchExecutor<C> {
    /// @ai:intent Create a new batch executor
    /// @ai:effects pure
    pub fn new(client: Arc<C>, settings: ExecutionSettings) -> Self {
        Self { client, settings }
    }

    fn limit(&self) -> usize {
        self.settings.concurrency.max(1)
    }

    /// @ai:intent Build the request for an item with its synthetic session
    /// @ai:effects pure
    fn build_request<T: EvalItem>(&self, item: &T) -> AnswerRequest {
        AnswerRequest {
            question: item.question().to_string(),
            exam_variant: item.exam_variant(),
            user_id: self.settings.user_id.clone(),
            session_id: format!("{}-{}", self.settings.run_id, item.id()),
        }
    }

    /// @ai:intent Call the service, bounded by the guard timeout when configured
    /// @ai:effects network
    async fn call_with_guard(&self, request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
        match self.settings.guard_timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.answer(request))
                .await
                .unwrap_or_else(|_| Err(AnswerError::Timeout(limit.as_millis() as u64))),
            None => self.client.answer(request).await,
        }
    }

    /// @ai:intent Execute a single item, converting any failure into a result
    /// @ai:post latency covers the failure path too
    /// @ai:effects network
    async fn execute_one<T: EvalItem>(&self, item: &T) -> CallOutcome {
        let request = self.build_request(item);
        tracing::debug!("Asking {} (session={})", item.id(), request.session_id);

        let start = Instant::now();
        let response = self
            .call_with_guard(&request)
            .await
            .and_then(AnswerResponse::validated);
        let latency_ms = start.elapsed().as_millis() as u64;

        match response {
            Ok(response) => CallOutcome {
                result: TestResult::answered(item, response, latency_ms),
                transport_failure: false,
            },
            Err(err) => {
                tracing::warn!("{} failed after {}ms: {}", item.id(), latency_ms, err);
                CallOutcome {
                    transport_failure: err.is_transport_level(),
                    result: TestResult::failed(item, &err, latency_ms),
                }
            }
        }
    }

    /// @ai:intent Execute every item of a suite, one result per item
    /// @ai:post result count equals item count unless an outage aborts the run
    /// @ai:effects network
    pub async fn execute_all<T: EvalItem>(
        &self,
        suite: &str,
        items: &[T],
    ) -> Result<Vec<TestResult>, ExecutionError> {
        tracing::info!(
            "Running {} {} items (concurrency={}, schedule={})",
            items.len(),
            suite,
            self.limit(),
            self.settings.schedule.as_str()
        );

        match self.settings.schedule {
            ScheduleMode::Batched => self.execute_batched(suite, items).await,
            ScheduleMode::Pipelined => self.execute_pipelined(suite, items).await,
        }
    }

    /// @ai:intent Run consecutive groups, each fully resolved before the next
    /// @ai:effects network
    async fn execute_batched<T: EvalItem>(
        &self,
        suite: &str,
        items: &[T],
    ) -> Result<Vec<TestResult>, ExecutionError> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut watch = OutageWatch::new(self.limit(), total);

        for group in items.chunks(self.limit()) {
            let outcomes =
                futures::future::join_all(group.iter().map(|item| self.execute_one(item))).await;

            for outcome in outcomes {
                if watch.observe(outcome, &mut results) {
                    return Err(watch.outage(suite, results.len(), total));
                }
            }

            tracing::info!(
                "[{}] {} of {} tests completed",
                suite,
                results.len() + watch.held(),
                total
            );
        }

        watch.release(&mut results);
        Ok(results)
    }

    /// @ai:intent Keep up to C calls in flight, refilling as each one settles
    /// @ai:effects network
    async fn execute_pipelined<T: EvalItem>(
        &self,
        suite: &str,
        items: &[T],
    ) -> Result<Vec<TestResult>, ExecutionError> {
        let total = items.len();
        let limit = self.limit();
        let mut results = Vec::with_capacity(total);
        let mut watch = OutageWatch::new(limit, total);

        let mut in_flight = stream::iter(items.iter().map(|item| self.execute_one(item)))
            .buffer_unordered(limit);

        while let Some(outcome) = in_flight.next().await {
            if watch.observe(outcome, &mut results) {
                return Err(watch.outage(suite, results.len(), total));
            }

            let settled = results.len() + watch.held();
            if settled % limit == 0 || settled == total {
                tracing::info!("[{}] {} of {} tests completed", suite, settled, total);
            }
        }

        watch.release(&mut results);
        Ok(results)
    }
}

/// Shortest failure streak treated as an outage when the suite has that many items
const MIN_OUTAGE_STREAK: usize = 3;

/// Streak of consecutive transport failures in completion order, shared by both
/// schedule modes. Held outcomes join the results once a reachable call breaks
/// the streak; a streak of `min(max(C, 3), N)` means the service is down.
struct OutageWatch {
    window: usize,
    streak: Vec<CallOutcome>,
}

impl OutageWatch {
    fn new(limit: usize, total: usize) -> Self {
        Self {
            window: limit.max(MIN_OUTAGE_STREAK).min(total).max(1),
            streak: Vec::new(),
        }
    }

    /// Returns true once the streak reaches the outage window
    fn observe(&mut self, outcome: CallOutcome, results: &mut Vec<TestResult>) -> bool {
        if outcome.transport_failure {
            self.streak.push(outcome);
            return self.streak.len() >= self.window;
        }

        self.release(results);
        results.push(outcome.result);
        false
    }

    fn held(&self) -> usize {
        self.streak.len()
    }

    fn release(&mut self, results: &mut Vec<TestResult>) {
        results.extend(self.streak.drain(..).map(|o| o.result));
    }

    fn outage(&self, suite: &str, completed: usize, total: usize) -> ExecutionError {
        outage(suite, &self.streak, completed, total)
    }
}

fn outage(suite: &str, failures: &[CallOutcome], completed: usize, total: usize) -> ExecutionError {
    let last_error = failures
        .iter()
        .rev()
        .find_map(|o| o.result.error.clone())
        .unwrap_or_default();

    ExecutionError::ServiceUnreachable {
        suite: suite.to_string(),
        failed: failures.len(),
        completed,
        total,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Difficulty, GoldenItem, TrapItem};
    use crate::runner::client::MockAnswerClient;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn golden(id: &str) -> GoldenItem {
        GoldenItem {
            id: id.to_string(),
            exam_variant: ExamVariant::CalcAb,
            question: format!("question {id}"),
            expected_answer: "42".to_string(),
            expected_justification: "by computation".to_string(),
            difficulty: Difficulty::Easy,
            topic: "limits".to_string(),
        }
    }

    fn goldens(n: usize) -> Vec<GoldenItem> {
        (0..n).map(|i| golden(&format!("g-{i:02}"))).collect()
    }

    fn settings(concurrency: usize, schedule: ScheduleMode) -> ExecutionSettings {
        ExecutionSettings {
            concurrency,
            schedule,
            guard_timeout: None,
            user_id: "qa-harness".to_string(),
            run_id: "run-1".to_string(),
        }
    }

    /// Records peak concurrent invocations and start/end events
    #[derive(Default)]
    struct TrackingClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        events: Mutex<Vec<(bool, String)>>,
    }

    impl AnswerClientTrait for TrackingClient {
        async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.events.lock().unwrap().push((true, request.question.clone()));

            // Uneven delays so calls settle out of order
            let delay = 5 + request.question.bytes().last().unwrap_or(0) as u64 % 4 * 7;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.events.lock().unwrap().push((false, request.question.clone()));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(AnswerResponse {
                answer: "42".to_string(),
                is_verified: true,
                trust_score: 0.9,
                verifier_equiv: true,
            })
        }
    }

    /// Fails any question whose text contains one of the given markers
    struct FailingClient {
        fail_on: Vec<&'static str>,
        error: AnswerError,
    }

    impl AnswerClientTrait for FailingClient {
        async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
            if self.fail_on.iter().any(|m| request.question.contains(m)) {
                return Err(self.error.clone());
            }

            Ok(AnswerResponse {
                answer: "42".to_string(),
                is_verified: true,
                trust_score: 0.8,
                verifier_equiv: true,
            })
        }
    }

    struct HangingClient;

    impl AnswerClientTrait for HangingClient {
        async fn answer(&self, _request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_one_result_per_item_with_matching_ids() {
        let client = Arc::new(MockAnswerClient::always_verified("42"));
        let executor = BatchExecutor::new(client, settings(4, ScheduleMode::Batched));
        let items = goldens(10);

        let results = executor.execute_all("golden", &items).await.unwrap();
        assert_eq!(results.len(), items.len());

        let ids: HashSet<_> = results.iter().map(|r| r.id.clone()).collect();
        let expected: HashSet<_> = items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_batched_never_exceeds_concurrency() {
        let client = Arc::new(TrackingClient::default());
        let executor = BatchExecutor::new(client.clone(), settings(3, ScheduleMode::Batched));

        let results = executor.execute_all("golden", &goldens(11)).await.unwrap();
        assert_eq!(results.len(), 11);
        assert_eq!(client.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_pipelined_never_exceeds_concurrency() {
        let client = Arc::new(TrackingClient::default());
        let executor = BatchExecutor::new(client.clone(), settings(3, ScheduleMode::Pipelined));

        let results = executor.execute_all("golden", &goldens(11)).await.unwrap();
        assert_eq!(results.len(), 11);
        assert_eq!(client.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batched_groups_do_not_overlap() {
        let client = Arc::new(TrackingClient::default());
        let executor = BatchExecutor::new(client.clone(), settings(2, ScheduleMode::Batched));
        let items = goldens(6);

        executor.execute_all("golden", &items).await.unwrap();

        let group_of = |question: &str| {
            items
                .iter()
                .position(|i| i.question == question)
                .map(|p| p / 2)
                .unwrap()
        };

        let events = client.events.lock().unwrap().clone();
        let mut ended: Vec<usize> = Vec::new();

        for (is_start, question) in &events {
            let group = group_of(question.as_str());

            if *is_start {
                // Every item of every earlier group must already have settled
                let earlier_settled = ended.iter().filter(|g| **g < group).count();
                assert_eq!(earlier_settled, group * 2, "group {group} started early");
            } else {
                ended.push(group);
            }
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_item() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["g-01"],
            error: AnswerError::Malformed("missing field `answer`".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(3, ScheduleMode::Batched));

        let results = executor.execute_all("golden", &goldens(3)).await.unwrap();
        assert_eq!(results.len(), 3);

        let failed = results.iter().find(|r| r.id == "g-01").unwrap();
        assert!(failed.error.as_deref().unwrap().contains("missing field"));
        assert_eq!(failed.trust_score, 0.0);
        assert_eq!(failed.actual_answer, "");
        assert!(!failed.is_verified);
        assert!(!failed.verifier_equiv);

        let siblings: Vec<_> = results.iter().filter(|r| r.id != "g-01").collect();
        assert_eq!(siblings.len(), 2);
        assert!(siblings.iter().all(|r| r.error.is_none() && r.is_verified));
    }

    #[tokio::test]
    async fn test_whole_group_unreachable_is_fatal() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["question"],
            error: AnswerError::Unreachable("connection refused".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(2, ScheduleMode::Batched));

        let err = executor.execute_all("golden", &goldens(4)).await.unwrap_err();
        let ExecutionError::ServiceUnreachable { failed, completed, .. } = err;
        assert_eq!(failed, 3);
        assert_eq!(completed, 0);
    }

    #[tokio::test]
    async fn test_pipelined_outage_is_fatal() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["question"],
            error: AnswerError::Transport("connection reset".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(3, ScheduleMode::Pipelined));

        let result = executor.execute_all("golden", &goldens(5)).await;
        assert!(matches!(result, Err(ExecutionError::ServiceUnreachable { failed: 3, .. })));
    }

    #[tokio::test]
    async fn test_single_failure_in_short_tail_group_is_not_fatal() {
        for schedule in [ScheduleMode::Batched, ScheduleMode::Pipelined] {
            let client = Arc::new(FailingClient {
                fail_on: vec!["g-04"],
                error: AnswerError::Transport("connection reset".to_string()),
            });
            let executor = BatchExecutor::new(client, settings(2, schedule));

            let results = executor.execute_all("golden", &goldens(5)).await.unwrap();
            assert_eq!(results.len(), 5, "schedule {}", schedule.as_str());

            let failed: Vec<_> = results.iter().filter(|r| r.is_error()).collect();
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].id, "g-04");
        }
    }

    #[tokio::test]
    async fn test_single_transport_failure_with_concurrency_one_is_not_fatal() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["g-01"],
            error: AnswerError::Unreachable("connection refused".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(1, ScheduleMode::Batched));

        let results = executor.execute_all("golden", &goldens(3)).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);
    }

    #[tokio::test]
    async fn test_batched_outage_streak_spans_groups() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["g-01", "g-02", "g-03"],
            error: AnswerError::Transport("connection reset".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(2, ScheduleMode::Batched));

        let err = executor.execute_all("golden", &goldens(5)).await.unwrap_err();
        let ExecutionError::ServiceUnreachable { failed, completed, total, .. } = err;
        assert_eq!(failed, 3);
        assert_eq!(completed, 1);
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_single_item_suite_unreachable_is_fatal() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["question"],
            error: AnswerError::Unreachable("connection refused".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(5, ScheduleMode::Batched));

        let result = executor.execute_all("golden", &goldens(1)).await;
        assert!(matches!(result, Err(ExecutionError::ServiceUnreachable { failed: 1, .. })));
    }

    #[tokio::test]
    async fn test_partial_transport_failure_is_recorded_not_fatal() {
        let client = Arc::new(FailingClient {
            fail_on: vec!["g-00"],
            error: AnswerError::Unreachable("connection refused".to_string()),
        });
        let executor = BatchExecutor::new(client, settings(2, ScheduleMode::Batched));

        let results = executor.execute_all("golden", &goldens(4)).await.unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);
    }

    #[tokio::test]
    async fn test_guard_timeout_stops_hung_call() {
        let mut settings = settings(2, ScheduleMode::Batched);
        settings.guard_timeout = Some(Duration::from_millis(20));
        let executor = BatchExecutor::new(Arc::new(HangingClient), settings);

        let results = executor.execute_all("golden", &goldens(2)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.error.as_deref() == Some("request timed out after 20ms")));
    }

    #[tokio::test]
    async fn test_session_ids_are_scoped_to_run_and_item() {
        let executor = BatchExecutor::new(
            Arc::new(MockAnswerClient::always_verified("42")),
            settings(1, ScheduleMode::Batched),
        );
        let request = executor.build_request(&golden("g-07"));
        assert_eq!(request.session_id, "run-1-g-07");
        assert_eq!(request.user_id, "qa-harness");
    }

    #[test]
    fn test_trap_elicited_ignores_case_and_spacing() {
        let trap = TrapItem {
            id: "t-1".to_string(),
            exam_variant: ExamVariant::CalcBc,
            question: "d/dx cos x".to_string(),
            expected_answer: "-sin x".to_string(),
            trap_category: "sign-flip".to_string(),
            trap_answer: "sin x".to_string(),
            description: "drops the sign".to_string(),
        };
        let response = AnswerResponse {
            answer: "  SIN   x ".to_string(),
            is_verified: true,
            trust_score: 0.95,
            verifier_equiv: false,
        };

        let result = TestResult::answered(&trap, response, 12);
        assert!(result.trap_elicited);
        assert_eq!(result.trap_category.as_deref(), Some("sign-flip"));
    }
}
