use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::Summary;
use crate::codebase::Resource;
use crate::error::Result;
use crate::models::{Dependency, Package};
use crate::ScanReport;

pub const TOOL_NAME: &str = "pkgscan";

/// Scan provenance, the first entry of the `headers` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHeader {
    pub tool_name: String,
    pub tool_version: String,
    pub options: Map<String, Value>,
    pub start_timestamp: Option<String>,
    pub end_timestamp: Option<String>,
    pub duration: Option<f64>,
    pub files_count: usize,
    pub packages_count: usize,
    pub errors: Vec<String>,
}

impl ScanHeader {
    pub fn new(options: Map<String, Value>) -> Self {
        Self {
            tool_name: TOOL_NAME.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            options,
            start_timestamp: None,
            end_timestamp: None,
            duration: None,
            files_count: 0,
            packages_count: 0,
            errors: Vec::new(),
        }
    }

    /// Record timing; skipped in test mode so output stays reproducible.
    pub fn set_timing(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.start_timestamp = Some(start.to_rfc3339());
        self.end_timestamp = Some(end.to_rfc3339());
        self.duration = Some((end - start).num_milliseconds() as f64 / 1000.0);
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    headers: [&'a ScanHeader; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a Summary>,
    packages: &'a [Package],
    dependencies: &'a [Dependency],
    files: Vec<&'a Resource>,
}

/// The report as a JSON value.
pub fn to_value(report: &ScanReport) -> Result<Value> {
    let json = JsonReport {
        headers: [&report.header],
        summary: report.summary.as_ref(),
        packages: &report.packages,
        dependencies: &report.dependencies,
        files: report.codebase.resources().collect(),
    };
    Ok(serde_json::to_value(&json)?)
}

/// Render the report as pretty-printed JSON.
pub fn render(report: &ScanReport) -> Result<String> {
    let json = serde_json::to_string_pretty(&to_value(report)?)?;
    Ok(json)
}
