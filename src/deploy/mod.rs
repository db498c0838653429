//! Deployment orchestration
//!
//! Sequences external infrastructure actions against a resolved effective
//! configuration. Operations expand to fixed, ordered step sequences with
//! fail-fast execution: the first failing step aborts the rest, with no
//! rollback or retry.

mod executor;
mod plan;
mod state;
mod summary;

pub use executor::{clean_local_state, DeployError, Executor};
pub use plan::{DeployPlan, PlanStep, PLAN_SCHEMA_ID, PLAN_SCHEMA_VERSION};
pub use state::{CurrentStep, RunState, RunStateData, RunStateError};
pub use summary::{RunSummary, Status, StepSummary, SUMMARY_SCHEMA_ID, SUMMARY_SCHEMA_VERSION};

use serde::{Deserialize, Serialize};

/// Generate a run identifier (lowercase ULID)
pub fn generate_run_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// A named operation on the command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Initialize and validate the infrastructure sources
    Validate,
    /// Validate, then produce an execution plan
    Plan,
    /// Full apply sequence with the engine's interactive approval
    Apply,
    /// Full apply sequence, auto-approved after the warning delay
    AutoApply,
    /// Tear down with the engine's interactive approval
    Destroy,
    /// Tear down, auto-approved after the warning delay
    AutoDestroy,
    /// Remove local engine state and run artifacts
    Clean,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::Validate => "validate",
            Operation::Plan => "plan",
            Operation::Apply => "apply",
            Operation::AutoApply => "auto_apply",
            Operation::Destroy => "destroy",
            Operation::AutoDestroy => "auto_destroy",
            Operation::Clean => "clean",
        })
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(Operation::Validate),
            "plan" => Ok(Operation::Plan),
            "apply" => Ok(Operation::Apply),
            "auto_apply" => Ok(Operation::AutoApply),
            "destroy" => Ok(Operation::Destroy),
            "auto_destroy" => Ok(Operation::AutoDestroy),
            "clean" => Ok(Operation::Clean),
            other => Err(format!("unknown operation: {other}")),
        }
    }
}

impl Operation {
    /// Whether this operation mutates infrastructure
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Operation::Apply | Operation::AutoApply | Operation::Destroy | Operation::AutoDestroy
        )
    }

    /// Whether the engine is invoked with its auto-approval flag
    pub fn auto_approved(&self) -> bool {
        matches!(self, Operation::AutoApply | Operation::AutoDestroy)
    }

    /// The fixed step sequence for this operation.
    ///
    /// Every operation except `clean` starts with engine init + validate.
    /// The apply pre-step (health unlink) always precedes the core apply;
    /// the post-step and dashboard update follow only on success because
    /// execution is fail-fast.
    pub fn steps(&self) -> Vec<StepKind> {
        match self {
            Operation::Validate => vec![StepKind::EngineInit, StepKind::EngineValidate],
            Operation::Plan => vec![
                StepKind::EngineInit,
                StepKind::EngineValidate,
                StepKind::EnginePlan,
            ],
            Operation::Apply | Operation::AutoApply => vec![
                StepKind::EngineInit,
                StepKind::EngineValidate,
                StepKind::HealthUnlink,
                StepKind::EngineApply,
                StepKind::HealthLink,
                StepKind::DashboardUpdate,
            ],
            Operation::Destroy | Operation::AutoDestroy => vec![
                StepKind::EngineInit,
                StepKind::EngineValidate,
                StepKind::HealthUnlink,
                StepKind::EngineDestroy,
            ],
            Operation::Clean => vec![],
        }
    }
}

/// One kind of external step within a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    EngineInit,
    EngineValidate,
    EnginePlan,
    EngineApply,
    EngineDestroy,
    HealthUnlink,
    HealthLink,
    DashboardUpdate,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StepKind::EngineInit => "engine_init",
            StepKind::EngineValidate => "engine_validate",
            StepKind::EnginePlan => "engine_plan",
            StepKind::EngineApply => "engine_apply",
            StepKind::EngineDestroy => "engine_destroy",
            StepKind::HealthUnlink => "health_unlink",
            StepKind::HealthLink => "health_link",
            StepKind::DashboardUpdate => "dashboard_update",
        })
    }
}

impl StepKind {
    /// Short description for plan output
    pub fn description(&self) -> &'static str {
        match self {
            StepKind::EngineInit => "initialize infrastructure sources",
            StepKind::EngineValidate => "validate infrastructure sources",
            StepKind::EnginePlan => "compute execution plan",
            StepKind::EngineApply => "apply infrastructure changes",
            StepKind::EngineDestroy => "destroy infrastructure",
            StepKind::HealthUnlink => "detach health checks",
            StepKind::HealthLink => "reattach health checks",
            StepKind::DashboardUpdate => "update metrics dashboard",
        }
    }
}
