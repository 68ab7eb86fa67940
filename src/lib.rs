//! @ai:module:intent Tutor QA harness library
//! @ai:module:layer application
//! @ai:module:public_api config, dataset, runner, metrics, gate, report, harness

pub mod config;
pub mod dataset;
pub mod gate;
pub mod harness;
pub mod metrics;
pub mod report;
pub mod runner;

pub use config::{HarnessConfig, QualityGateConfig};
pub use dataset::{DatasetLoader, GoldenItem, TrapItem};
pub use gate::{GateVerdict, QualityGate};
pub use harness::{Harness, HarnessOutcome};
pub use metrics::{MetricsAggregator, RunSummary, SuiteReport};
pub use report::{ReportContext, ReportGenerator};
pub use runner::{AnswerClientTrait, BatchExecutor, HttpAnswerClient, MockAnswerClient, TestResult};
