//! Run summary (run_summary.json)
//!
//! Aggregated outcome of one orchestrated run, written after the last
//! executed step. Steps that never ran because of an earlier failure are
//! recorded as skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Operation, StepKind};

/// Schema version for run_summary.json
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for run_summary.json
pub const SUMMARY_SCHEMA_ID: &str = "stratus/run_summary@1";

/// Final status of a step or run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
    Skipped,
}

/// Outcome of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    /// Step index (0-based)
    pub index: usize,

    /// Kind of step
    pub kind: StepKind,

    /// Final status
    pub status: Status,

    /// Exit code of the external command (None when skipped or spawn failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Wall-clock duration in milliseconds (0 when skipped)
    pub duration_ms: u64,
}

impl StepSummary {
    /// A successful step
    pub fn success(index: usize, kind: StepKind, duration_ms: u64) -> Self {
        Self {
            index,
            kind,
            status: Status::Success,
            exit_code: Some(0),
            duration_ms,
        }
    }

    /// A failed step
    pub fn failure(index: usize, kind: StepKind, exit_code: Option<i32>, duration_ms: u64) -> Self {
        Self {
            index,
            kind,
            status: Status::Failed,
            exit_code,
            duration_ms,
        }
    }

    /// A step skipped due to an earlier failure
    pub fn skipped(index: usize, kind: StepKind) -> Self {
        Self {
            index,
            kind,
            status: Status::Skipped,
            exit_code: None,
            duration_ms: 0,
        }
    }
}

/// Run summary (run_summary.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Run identifier
    pub run_id: String,

    /// Operation the run executed
    pub operation: Operation,

    /// Deployment the run targeted
    pub deployment: String,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Aggregated status (failed if any step failed)
    pub status: Status,

    /// Total steps in the plan
    pub step_count: usize,

    /// Count of steps with status=success
    pub steps_succeeded: usize,

    /// Count of steps with status=failed
    pub steps_failed: usize,

    /// Count of steps skipped due to early abort
    pub steps_skipped: usize,

    /// Per-step outcomes in plan order
    pub steps: Vec<StepSummary>,

    /// Wall-clock duration of the entire run in milliseconds
    pub duration_ms: u64,

    /// Human-readable summary line
    pub human_summary: String,
}

impl RunSummary {
    /// Aggregate step summaries into a run summary
    pub fn from_steps(
        run_id: String,
        operation: Operation,
        deployment: String,
        steps: Vec<StepSummary>,
        duration_ms: u64,
    ) -> Self {
        let steps_succeeded = steps.iter().filter(|s| s.status == Status::Success).count();
        let steps_failed = steps.iter().filter(|s| s.status == Status::Failed).count();
        let steps_skipped = steps.iter().filter(|s| s.status == Status::Skipped).count();

        let status = if steps_failed > 0 {
            Status::Failed
        } else {
            Status::Success
        };

        let human_summary = match status {
            Status::Success => format!(
                "{operation} succeeded: {steps_succeeded}/{} steps",
                steps.len()
            ),
            _ => format!(
                "{operation} failed: {steps_succeeded} succeeded, {steps_failed} failed, {steps_skipped} skipped"
            ),
        };

        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            run_id,
            operation,
            deployment,
            created_at: Utc::now(),
            status,
            step_count: steps.len(),
            steps_succeeded,
            steps_failed,
            steps_skipped,
            steps,
            duration_ms,
            human_summary,
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
