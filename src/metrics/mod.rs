//! @ai:module:intent Metrics collection and aggregation
//! @ai:module:layer application
//! @ai:module:public_api RunSummary, VariantSummary, FailureBreakdown, SuiteReport, HarnessRun, MetricsAggregator

pub mod aggregator;
pub mod types;

pub use aggregator::{MetricsAggregator, MetricsAggregatorTrait};
pub use types::{
    FailureBreakdown, FailureCounts, HarnessRun, RunSummary, SuiteReport, TrapCategoryStats,
    VariantSummary, SLOW_RESPONSE_THRESHOLD_MS,
};
