//! Run reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A group of statements executed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Drop and recreate all tables.
    Schema,
    /// Bulk-load the staging tables.
    Staging,
    /// Populate fact and dimension tables from staging.
    Marts,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Schema => "schema",
            Phase::Staging => "staging",
            Phase::Marts => "marts",
        };
        f.write_str(name)
    }
}

/// Outcome of one committed statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub table: String,
    pub rows: u64,
    pub duration_ms: u64,
}

/// Outcome of a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
}

impl PhaseReport {
    /// Total rows affected across the phase.
    pub fn rows(&self) -> u64 {
        self.steps.iter().map(|s| s.rows).sum()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Rows bulk-loaded into staging.
    pub rows_staged: u64,

    /// Rows inserted into fact and dimension tables.
    pub rows_inserted: u64,

    /// Per-phase step details.
    pub phases: Vec<PhaseReport>,
}

impl RunResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Row count of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

/// Connection test outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub target: String,
    pub connected: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_result_json() {
        let now = Utc::now();
        let result = RunResult {
            run_id: "run-1".to_string(),
            status: "completed".to_string(),
            started_at: now,
            completed_at: now,
            duration_seconds: 1.5,
            rows_staged: 8056,
            rows_inserted: 333,
            phases: vec![PhaseReport {
                phase: Phase::Staging,
                steps: vec![StepReport {
                    name: "staging_events_copy".to_string(),
                    table: "staging_events".to_string(),
                    rows: 8056,
                    duration_ms: 900,
                }],
                duration_ms: 900,
            }],
        };

        let json = result.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["phases"][0]["phase"], "staging");
        assert_eq!(value["phases"][0]["steps"][0]["rows"], 8056);
        assert_eq!(value["rows_inserted"], 333);
    }

    #[test]
    fn test_health_check_omits_missing_error() {
        let result = HealthCheckResult {
            target: "u@h:5439/dwh".to_string(),
            connected: true,
            latency_ms: 12,
            error: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("error"));
    }
}
