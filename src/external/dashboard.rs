//! Metrics dashboard update
//!
//! Pushes the deployment's dashboard definition after a successful apply.
//! The update command takes no arguments and is idempotent, so re-running it
//! after an unchanged apply is harmless.

use std::sync::Arc;

use crate::config::EffectiveConfig;

use super::{run_step, ExternalError, Invocation, ProcessRunner};

/// Dashboard update client
pub struct DashboardClient {
    runner: Arc<dyn ProcessRunner>,
    command: String,
}

impl DashboardClient {
    /// Create a client invoking the given command
    pub fn new(runner: Arc<dyn ProcessRunner>, command: impl Into<String>) -> Self {
        Self {
            runner,
            command: command.into(),
        }
    }

    /// Update the dashboard for the resolved deployment
    pub fn update(&self, config: &EffectiveConfig) -> Result<(), ExternalError> {
        run_step(
            self.runner.as_ref(),
            "dashboard_update",
            &Invocation::new(self.command.clone(), &[]).with_config_env(config),
        )
    }
}
