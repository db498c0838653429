//! Health-check registration service
//!
//! Health checks are detached before infrastructure mutation and reattached
//! after a successful apply, so monitors do not page for expected downtime.
//! The service is an external command invoked with `--link` or `--unlink`.

use std::sync::Arc;

use crate::config::EffectiveConfig;

use super::{run_step, ExternalError, Invocation, ProcessRunner};

/// Health-check service client
pub struct HealthCheckClient {
    runner: Arc<dyn ProcessRunner>,
    command: String,
}

impl HealthCheckClient {
    /// Create a client invoking the given command
    pub fn new(runner: Arc<dyn ProcessRunner>, command: impl Into<String>) -> Self {
        Self {
            runner,
            command: command.into(),
        }
    }

    /// Attach health checks to the deployment's resources
    pub fn link(&self, config: &EffectiveConfig) -> Result<(), ExternalError> {
        run_step(
            self.runner.as_ref(),
            "health_link",
            &Invocation::new(self.command.clone(), &["--link"]).with_config_env(config),
        )
    }

    /// Detach health checks ahead of a mutation
    pub fn unlink(&self, config: &EffectiveConfig) -> Result<(), ExternalError> {
        run_step(
            self.runner.as_ref(),
            "health_unlink",
            &Invocation::new(self.command.clone(), &["--unlink"]).with_config_env(config),
        )
    }
}
