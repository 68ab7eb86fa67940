//! @ai:module:intent Orchestrates one harness run: execute both suites, aggregate, gate
//! @ai:module:layer application
//! @ai:module:public_api Harness, HarnessOutcome

use crate::config::HarnessConfig;
use crate::dataset::{GoldenItem, TrapItem};
use crate::gate::{GateVerdict, QualityGate, QualityGateTrait};
use crate::metrics::{HarnessRun, MetricsAggregator, MetricsAggregatorTrait};
use crate::runner::{AnswerClientTrait, BatchExecutor, ExecutionError, ExecutionSettings};
use std::sync::Arc;

pub const GOLDEN_SUITE: &str = "golden";
pub const TRAP_SUITE: &str = "traps";

/// @ai:intent Aggregated run plus its gate verdict
#[derive(Debug, Clone)]
pub struct HarnessOutcome {
    pub run_id: String,
    pub run: HarnessRun,
    pub verdict: GateVerdict,
}

/// @ai:intent Runs the golden suite, then the trap suite, against one client
pub struct Harness<C: AnswerClientTrait> {
    executor: BatchExecutor<C>,
    gate: QualityGate,
    run_id: String,
}

impl<C: AnswerClientTrait> Harness<C> {
    /// @ai:intent Build a harness from config with an explicit run id
    /// @ai:effects pure
    pub fn new(client: Arc<C>, config: &HarnessConfig, run_id: &str) -> Self {
        Self {
            executor: BatchExecutor::new(client, ExecutionSettings::from_config(config, run_id)),
            gate: QualityGate::new(config.gates),
            run_id: run_id.to_string(),
        }
    }

    /// @ai:intent Execute both suites sequentially and evaluate the combined summary
    /// @ai:post on Err no partial results are returned
    /// @ai:effects network
    pub async fn run(
        &self,
        golden: &[GoldenItem],
        traps: &[TrapItem],
    ) -> Result<HarnessOutcome, ExecutionError> {
        let golden_results = self.executor.execute_all(GOLDEN_SUITE, golden).await?;
        let trap_results = self.executor.execute_all(TRAP_SUITE, traps).await?;

        let aggregator = MetricsAggregator::new();
        let run = aggregator.combine(
            aggregator.aggregate(GOLDEN_SUITE, golden_results),
            aggregator.aggregate(TRAP_SUITE, trap_results),
        );

        let verdict = self.gate.evaluate(&run.overall);
        if verdict.passed {
            tracing::info!("Quality gates passed");
        } else {
            for message in verdict.messages() {
                tracing::warn!("Gate violation: {}", message);
            }
        }

        Ok(HarnessOutcome {
            run_id: self.run_id.clone(),
            run,
            verdict,
        })
    }
}
