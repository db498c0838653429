//! Run state machine
//!
//! Run states: QUEUED → RUNNING → {SUCCEEDED | FAILED}
//!
//! State snapshots are written atomically (write-then-rename) so a crash
//! mid-write never leaves a truncated run_state.json behind.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Operation, StepKind};

/// Schema version for run_state.json
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const STATE_SCHEMA_ID: &str = "stratus/run_state@1";

/// Run state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Run is queued, waiting to start
    Queued,
    /// Run is actively executing steps
    Running,
    /// Run completed successfully
    Succeeded,
    /// Run failed
    Failed,
}

impl RunState {
    /// Whether this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }

    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: RunState) -> bool {
        match (self, target) {
            (RunState::Queued, RunState::Running) => true,
            (RunState::Queued, RunState::Failed) => true, // Can fail before starting
            (RunState::Running, RunState::Succeeded) => true,
            (RunState::Running, RunState::Failed) => true,
            _ => false,
        }
    }
}

/// Current step information for a running run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStep {
    /// Step index (0-based)
    pub index: usize,

    /// Kind of step being executed
    pub kind: StepKind,
}

/// Run state artifact data (run_state.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStateData {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Run identifier
    pub run_id: String,

    /// Operation being executed
    pub operation: Operation,

    /// Current state
    pub state: RunState,

    /// When the run was created
    pub created_at: DateTime<Utc>,

    /// When the state was last updated
    pub updated_at: DateTime<Utc>,

    /// Current step being executed (None if not running)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<CurrentStep>,
}

/// Errors for run state operations
#[derive(Debug, thiserror::Error)]
pub enum RunStateError {
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: RunState, to: RunState },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunStateData {
    /// Create a new run in QUEUED state
    pub fn new(run_id: String, operation: Operation) -> Self {
        let now = Utc::now();
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            schema_id: STATE_SCHEMA_ID.to_string(),
            run_id,
            operation,
            state: RunState::Queued,
            created_at: now,
            updated_at: now,
            current_step: None,
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: RunState) -> Result<(), RunStateError> {
        if !self.state.can_transition_to(new_state) {
            return Err(RunStateError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        self.state = new_state;
        self.updated_at = Utc::now();

        if new_state.is_terminal() {
            self.current_step = None;
        }

        Ok(())
    }

    /// Start the run (QUEUED → RUNNING)
    pub fn start(&mut self) -> Result<(), RunStateError> {
        self.transition(RunState::Running)
    }

    /// Mark run as succeeded
    pub fn succeed(&mut self) -> Result<(), RunStateError> {
        self.transition(RunState::Succeeded)
    }

    /// Mark run as failed
    pub fn fail(&mut self) -> Result<(), RunStateError> {
        self.transition(RunState::Failed)
    }

    /// Set the current step being executed
    pub fn set_current_step(&mut self, index: usize, kind: StepKind) {
        self.current_step = Some(CurrentStep { index, kind });
        self.updated_at = Utc::now();
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write atomically to run_state.json in the run directory
    pub fn write_to_run_dir(&self, run_dir: &Path) -> Result<(), RunStateError> {
        let path = run_dir.join("run_state.json");
        let json = self.to_json()?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Load from a run directory
    pub fn from_run_dir(run_dir: &Path) -> Result<Self, RunStateError> {
        let json = fs::read_to_string(run_dir.join("run_state.json"))?;
        Ok(Self::from_json(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_run_state() {
        let state = RunStateData::new("run-123".to_string(), Operation::Apply);
        assert_eq!(state.run_id, "run-123");
        assert_eq!(state.operation, Operation::Apply);
        assert_eq!(state.state, RunState::Queued);
        assert!(state.current_step.is_none());
    }

    #[test]
    fn test_valid_transitions() {
        let mut state = RunStateData::new("run-123".to_string(), Operation::Plan);

        assert!(state.start().is_ok());
        assert_eq!(state.state, RunState::Running);

        assert!(state.succeed().is_ok());
        assert_eq!(state.state, RunState::Succeeded);
    }

    #[test]
    fn test_invalid_transition() {
        let mut state = RunStateData::new("run-123".to_string(), Operation::Plan);

        // Cannot go directly from QUEUED to SUCCEEDED
        let result = state.transition(RunState::Succeeded);
        assert!(matches!(result, Err(RunStateError::InvalidTransition { .. })));
    }

    #[test]
    fn test_terminal_state_no_transition() {
        let mut state = RunStateData::new("run-123".to_string(), Operation::Plan);
        state.start().unwrap();
        state.succeed().unwrap();

        assert!(state.transition(RunState::Running).is_err());
        assert!(state.transition(RunState::Failed).is_err());
    }

    #[test]
    fn test_fail_before_start() {
        let mut state = RunStateData::new("run-123".to_string(), Operation::Apply);
        assert!(state.fail().is_ok());
        assert_eq!(state.state, RunState::Failed);
    }

    #[test]
    fn test_terminal_clears_current_step() {
        let mut state = RunStateData::new("run-123".to_string(), Operation::Apply);
        state.start().unwrap();
        state.set_current_step(2, StepKind::EngineApply);
        assert!(state.current_step.is_some());

        state.fail().unwrap();
        assert!(state.current_step.is_none());
    }

    #[test]
    fn test_serialization() {
        let state = RunStateData::new("run-123".to_string(), Operation::AutoApply);
        let json = state.to_json().unwrap();

        assert!(json.contains("\"state\": \"QUEUED\""));
        assert!(json.contains("\"operation\": \"auto_apply\""));

        let parsed = RunStateData::from_json(&json).unwrap();
        assert_eq!(parsed.run_id, state.run_id);
        assert_eq!(parsed.state, state.state);
    }

    #[test]
    fn test_write_and_read_run_dir() {
        let dir = TempDir::new().unwrap();
        let mut state = RunStateData::new("run-123".to_string(), Operation::Apply);
        state.start().unwrap();
        state.write_to_run_dir(dir.path()).unwrap();

        let loaded = RunStateData::from_run_dir(dir.path()).unwrap();
        assert_eq!(loaded.state, RunState::Running);

        // No leftover temp file from the atomic write
        assert!(!dir.path().join("run_state.tmp").exists());
    }
}
