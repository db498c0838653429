//! Sequential run execution
//!
//! Executes a deploy plan step by step against a resolved configuration.
//! Execution is single-threaded and fail-fast: each step blocks on its
//! external process, and the first failure aborts the remaining sequence
//! with no rollback. The effective configuration is read-only throughout.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{ConfigError, EffectiveConfig};
use crate::external::{
    DashboardClient, ExternalError, HealthCheckClient, InfraEngine, ProcessRunner,
};
use crate::settings::DeploySettings;

use super::plan::DeployPlan;
use super::state::{RunStateData, RunStateError};
use super::summary::{RunSummary, StepSummary};
use super::{Operation, StepKind};

/// Orchestration errors
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    External(#[from] ExternalError),

    #[error(transparent)]
    State(#[from] RunStateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeployError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::External(ExternalError::Spawn { .. }) => 20,
            DeployError::External(ExternalError::StepFailure { .. }) => 40,
            DeployError::State(_) => 70,
            DeployError::Config(_) => 10,
            DeployError::Io(_) => 1,
            DeployError::Serialization(_) => 1,
        }
    }
}

/// Run executor for one deployment
pub struct Executor {
    settings: DeploySettings,
    config: EffectiveConfig,
    project_root: PathBuf,
    engine: InfraEngine,
    health: HealthCheckClient,
    dashboard: DashboardClient,
    verbose: bool,
}

impl Executor {
    /// Create an executor over the given runner
    pub fn new(
        settings: DeploySettings,
        config: EffectiveConfig,
        project_root: PathBuf,
        runner: Arc<dyn ProcessRunner>,
        verbose: bool,
    ) -> Self {
        let engine_dir = project_root.join(&settings.engine_dir);
        let engine = InfraEngine::new(runner.clone(), settings.engine_binary.clone(), &engine_dir);
        let health = HealthCheckClient::new(runner.clone(), settings.health_check_command.clone());
        let dashboard = DashboardClient::new(runner, settings.dashboard_command.clone());

        Self {
            settings,
            config,
            project_root,
            engine,
            health,
            dashboard,
            verbose,
        }
    }

    /// The resolved configuration this executor runs against
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// Execute an operation's full step sequence.
    ///
    /// Writes deploy_plan.json, effective_config.json, run_state.json and
    /// run_summary.json under the run directory. Returns the summary on
    /// success; a step failure persists state and summary before surfacing.
    pub fn execute(&self, operation: Operation) -> Result<RunSummary, DeployError> {
        let start = Instant::now();
        let plan = DeployPlan::for_operation(operation, &self.config.deployment);

        let run_dir = self
            .project_root
            .join(&self.settings.artifacts_dir)
            .join(&plan.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(run_dir.join("deploy_plan.json"), serde_json::to_string_pretty(&plan)?)?;
        self.config.write_artifact(&run_dir)?;

        let mut run_state = RunStateData::new(plan.run_id.clone(), operation);
        run_state.write_to_run_dir(&run_dir)?;

        if self.verbose {
            eprint!("{plan}");
        }

        // Auto-approved mutations skip the engine's interactive prompt, so
        // the warning delay is the last chance to interrupt.
        if operation.is_mutating() && operation.auto_approved() {
            self.confirmation_gate(operation);
        }

        run_state.start()?;
        run_state.write_to_run_dir(&run_dir)?;

        let mut step_summaries = Vec::with_capacity(plan.steps.len());
        let mut failure: Option<ExternalError> = None;

        for step in &plan.steps {
            if failure.is_some() {
                step_summaries.push(StepSummary::skipped(step.index, step.kind));
                continue;
            }

            run_state.set_current_step(step.index, step.kind);
            run_state.write_to_run_dir(&run_dir)?;

            if self.verbose {
                eprintln!("Step {}: {} ({})", step.index, step.kind, step.description);
            }

            let step_start = Instant::now();
            match self.run_step(step.kind, operation.auto_approved()) {
                Ok(()) => {
                    step_summaries.push(StepSummary::success(
                        step.index,
                        step.kind,
                        step_start.elapsed().as_millis() as u64,
                    ));
                }
                Err(err) => {
                    let exit_code = match &err {
                        ExternalError::StepFailure { exit_code, .. } => Some(*exit_code),
                        ExternalError::Spawn { .. } => None,
                    };
                    eprintln!("Step {} failed: {err}", step.kind);
                    step_summaries.push(StepSummary::failure(
                        step.index,
                        step.kind,
                        exit_code,
                        step_start.elapsed().as_millis() as u64,
                    ));
                    failure = Some(err);
                }
            }
        }

        if failure.is_some() {
            run_state.fail()?;
        } else {
            run_state.succeed()?;
        }
        run_state.write_to_run_dir(&run_dir)?;

        let summary = RunSummary::from_steps(
            plan.run_id.clone(),
            operation,
            self.config.deployment.clone(),
            step_summaries,
            start.elapsed().as_millis() as u64,
        );
        fs::write(run_dir.join("run_summary.json"), summary.to_json()?)?;

        if self.verbose {
            eprintln!("{}", summary.human_summary);
        }

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(summary),
        }
    }

    /// Remove local engine state and run artifacts
    pub fn clean(&self) -> Result<(), DeployError> {
        clean_local_state(&self.settings, &self.project_root, self.verbose)
    }

    /// Warning pause before an auto-approved mutation
    fn confirmation_gate(&self, operation: Operation) {
        let delay = self.settings.confirmation_delay_seconds;
        if delay == 0 {
            return;
        }
        eprintln!(
            "WARNING: {} will modify deployment '{}'. Proceeding in {}s (interrupt to abort).",
            operation, self.config.deployment, delay
        );
        std::thread::sleep(Duration::from_secs(delay));
    }

    /// Dispatch one step to its collaborator
    fn run_step(&self, kind: StepKind, auto_approve: bool) -> Result<(), ExternalError> {
        match kind {
            StepKind::EngineInit => self.engine.init(&self.config),
            StepKind::EngineValidate => self.engine.validate(&self.config),
            StepKind::EnginePlan => self.engine.plan(&self.config),
            StepKind::EngineApply => self.engine.apply(&self.config, auto_approve),
            StepKind::EngineDestroy => self.engine.destroy(&self.config, auto_approve),
            StepKind::HealthUnlink => self.health.unlink(&self.config),
            StepKind::HealthLink => self.health.link(&self.config),
            StepKind::DashboardUpdate => self.dashboard.update(&self.config),
        }
    }
}

/// Remove the engine's local state directory and the run artifacts directory.
///
/// Needs no resolved configuration, so `clean` works even when the
/// deployment environment does not resolve.
pub fn clean_local_state(
    settings: &DeploySettings,
    project_root: &std::path::Path,
    verbose: bool,
) -> Result<(), DeployError> {
    let engine_data = project_root.join(&settings.engine_dir).join(".terraform");
    remove_dir_if_present(&engine_data, verbose)?;

    let artifacts = project_root.join(&settings.artifacts_dir);
    remove_dir_if_present(&artifacts, verbose)?;

    Ok(())
}

fn remove_dir_if_present(path: &std::path::Path, verbose: bool) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            if verbose {
                eprintln!("Removed: {}", path.display());
            }
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
