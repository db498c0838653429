//! Deploy plan (deploy_plan.json)
//!
//! The ordered step sequence for one operation, emitted before execution
//! starts. Steps are fixed per operation; there is no branching at run time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{generate_run_id, Operation, StepKind};

/// Schema version for deploy_plan.json
pub const PLAN_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for deploy_plan.json
pub const PLAN_SCHEMA_ID: &str = "stratus/deploy_plan@1";

/// A step in the deploy plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step index (0-based)
    pub index: usize,

    /// Kind of external action
    pub kind: StepKind,

    /// Human-readable description
    pub description: String,
}

/// The deploy plan artifact (deploy_plan.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployPlan {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this plan was created
    pub created_at: DateTime<Utc>,

    /// Run identifier
    pub run_id: String,

    /// Operation this plan executes
    pub operation: Operation,

    /// Deployment the plan targets
    pub deployment: String,

    /// Ordered steps
    pub steps: Vec<PlanStep>,
}

impl DeployPlan {
    /// Build the plan for an operation against a deployment
    pub fn for_operation(operation: Operation, deployment: &str) -> Self {
        let steps = operation
            .steps()
            .into_iter()
            .enumerate()
            .map(|(index, kind)| PlanStep {
                index,
                kind,
                description: kind.description().to_string(),
            })
            .collect();

        Self {
            schema_version: PLAN_SCHEMA_VERSION,
            schema_id: PLAN_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            run_id: generate_run_id(),
            operation,
            deployment: deployment.to_string(),
            steps,
        }
    }

    /// Set a specific run_id (for testing)
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Number of steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl std::fmt::Display for DeployPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Deploy Plan ===")?;
        writeln!(f)?;
        writeln!(f, "Run ID: {}", self.run_id)?;
        writeln!(f, "Operation: {}", self.operation)?;
        writeln!(f, "Deployment: {}", self.deployment)?;
        writeln!(f)?;
        writeln!(f, "Steps ({}):", self.steps.len())?;
        for step in &self.steps {
            writeln!(f, "  [{}] {} - {}", step.index, step.kind, step.description)?;
        }
        Ok(())
    }
}
