//! @ai:module:intent JSON results document for CI tooling
//! @ai:module:layer infrastructure
//! @ai:module:public_api JsonReporter, JsonReporterTrait, ResultsDocument
//! @ai:module:stateless true

use crate::gate::GateVerdict;
use crate::metrics::HarnessRun;
use crate::report::ReportContext;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// @ai:intent Everything a run produced, in machine-readable form
#[derive(Debug, Serialize)]
pub struct ResultsDocument<'a> {
    pub context: &'a ReportContext,
    pub verdict: &'a GateVerdict,
    pub run: &'a HarnessRun,
}

/// @ai:intent Trait for JSON report generation
pub trait JsonReporterTrait: Send + Sync {
    /// @ai:intent Write the results document to a file
    fn generate(&self, document: &ResultsDocument<'_>, output_path: &Path) -> Result<()>;
}

/// @ai:intent Generates JSON documents from harness runs
pub struct JsonReporter;

impl JsonReporter {
    /// @ai:intent Create a new JSON reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporterTrait for JsonReporter {
    /// @ai:intent Generate JSON report to file
    /// @ai:effects fs:write
    fn generate(&self, document: &ResultsDocument<'_>, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(output_path, json)?;
        Ok(())
    }
}
