//! External collaborator invocations
//!
//! Abstracts subprocess execution for testability. Provides:
//! - ProcessRunner trait: interface for running external commands
//! - SystemRunner: real subprocess execution for production
//! - ScriptedRunner: in-process recording double for unit tests
//!
//! Collaborators (infrastructure engine, health-check service, dashboard
//! update) build invocations and report any non-zero exit as a step failure.

mod dashboard;
mod health;
mod terraform;

pub use dashboard::DashboardClient;
pub use health::HealthCheckClient;
pub use terraform::InfraEngine;

use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use crate::config::EffectiveConfig;

/// A single external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
    /// Working directory (inherited when None)
    pub cwd: Option<PathBuf>,
    /// Environment entries injected on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation with no working directory or environment
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Set the working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Inject the resolved configuration into the environment
    pub fn with_config_env(mut self, config: &EffectiveConfig) -> Self {
        self.env = config.all_env();
        self
    }

    /// One-line rendering for logs and test assertions
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Errors from external invocations
#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("step {step} failed with exit status {exit_code}")]
    StepFailure { step: String, exit_code: i32 },
}

/// Runner trait for external command execution
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion and return its exit code
    fn run(&self, invocation: &Invocation) -> Result<i32, ExternalError>;
}

/// Run an invocation and map a non-zero exit to a named step failure
pub fn run_step(
    runner: &dyn ProcessRunner,
    step: &str,
    invocation: &Invocation,
) -> Result<(), ExternalError> {
    let exit_code = runner.run(invocation)?;
    if exit_code != 0 {
        return Err(ExternalError::StepFailure {
            step: step.to_string(),
            exit_code,
        });
    }
    Ok(())
}

/// Real subprocess execution.
///
/// Stdio is inherited so engine output and interactive approval prompts
/// reach the operator directly.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, ExternalError> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);

        if let Some(ref cwd) = invocation.cwd {
            command.current_dir(cwd);
        }
        for (name, value) in &invocation.env {
            command.env(name, value);
        }

        let status = command.status().map_err(|source| ExternalError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(status.code().unwrap_or(-1))
    }
}

/// Recording runner for tests - no subprocess is spawned.
///
/// Invocations are recorded in order; configured failures return the given
/// exit code when the program and first argument match.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    invocations: Mutex<Vec<Invocation>>,
    failures: Mutex<Vec<(String, Option<String>, i32)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make invocations of `program` (optionally with the given first
    /// argument) fail with `exit_code`
    pub fn fail_when(&self, program: &str, first_arg: Option<&str>, exit_code: i32) {
        self.failures.lock().expect("failures lock").push((
            program.to_string(),
            first_arg.map(|a| a.to_string()),
            exit_code,
        ));
    }

    /// All recorded invocations in execution order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("invocations lock").clone()
    }

    /// Recorded invocations rendered as one-line commands
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations().iter().map(|i| i.command_line()).collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<i32, ExternalError> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(invocation.clone());

        let failures = self.failures.lock().expect("failures lock");
        for (program, first_arg, exit_code) in failures.iter() {
            let program_matches = invocation.program.ends_with(program.as_str());
            let arg_matches = match first_arg {
                Some(arg) => invocation.args.first().map(|a| a == arg).unwrap_or(false),
                None => true,
            };
            if program_matches && arg_matches {
                return Ok(*exit_code);
            }
        }

        Ok(0)
    }
}
