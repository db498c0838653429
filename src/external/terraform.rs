//! Infrastructure engine invocations
//!
//! Wraps the Terraform CLI with init/validate/plan/apply/destroy semantics.
//! Every invocation runs in the engine working directory with the resolved
//! configuration injected into its environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::EffectiveConfig;

use super::{run_step, ExternalError, Invocation, ProcessRunner};

/// Infrastructure engine client
pub struct InfraEngine {
    runner: Arc<dyn ProcessRunner>,
    binary: String,
    working_dir: PathBuf,
}

impl InfraEngine {
    /// Create an engine client for the given binary and working directory
    pub fn new(runner: Arc<dyn ProcessRunner>, binary: impl Into<String>, working_dir: &Path) -> Self {
        Self {
            runner,
            binary: binary.into(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    fn invocation(&self, args: &[&str], config: &EffectiveConfig) -> Invocation {
        Invocation::new(self.binary.clone(), args)
            .in_dir(&self.working_dir)
            .with_config_env(config)
    }

    /// `terraform init`
    pub fn init(&self, config: &EffectiveConfig) -> Result<(), ExternalError> {
        run_step(
            self.runner.as_ref(),
            "engine_init",
            &self.invocation(&["init"], config),
        )
    }

    /// `terraform validate`
    pub fn validate(&self, config: &EffectiveConfig) -> Result<(), ExternalError> {
        run_step(
            self.runner.as_ref(),
            "engine_validate",
            &self.invocation(&["validate"], config),
        )
    }

    /// `terraform plan`
    pub fn plan(&self, config: &EffectiveConfig) -> Result<(), ExternalError> {
        run_step(
            self.runner.as_ref(),
            "engine_plan",
            &self.invocation(&["plan"], config),
        )
    }

    /// `terraform apply`, optionally auto-approved
    pub fn apply(&self, config: &EffectiveConfig, auto_approve: bool) -> Result<(), ExternalError> {
        let invocation = if auto_approve {
            self.invocation(&["apply", "-auto-approve"], config)
        } else {
            self.invocation(&["apply"], config)
        };
        run_step(self.runner.as_ref(), "engine_apply", &invocation)
    }

    /// `terraform destroy`, optionally auto-approved
    pub fn destroy(&self, config: &EffectiveConfig, auto_approve: bool) -> Result<(), ExternalError> {
        let invocation = if auto_approve {
            self.invocation(&["destroy", "-auto-approve"], config)
        } else {
            self.invocation(&["destroy"], config)
        };
        run_step(self.runner.as_ref(), "engine_destroy", &invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EffectiveConfig, Layer, LayerOrigin};
    use crate::external::ScriptedRunner;

    fn test_config() -> EffectiveConfig {
        let layer = Layer {
            origin: LayerOrigin::Deployment,
            path: None,
            digest: None,
            assignments: vec![crate::config::Assignment {
                name: "STRATUS_DOMAIN".to_string(),
                value: "dev.example.org".to_string(),
                form: crate::config::VarForm::Set,
                line: 1,
            }],
        };
        EffectiveConfig::from_layers(vec![layer], "dev").unwrap()
    }

    #[test]
    fn test_invocations_run_in_working_dir_with_env() {
        let runner = Arc::new(ScriptedRunner::new());
        let engine = InfraEngine::new(runner.clone(), "terraform", Path::new("infra"));
        let config = test_config();

        engine.init(&config).unwrap();

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].cwd.as_deref(), Some(Path::new("infra")));
        assert!(invocations[0]
            .env
            .iter()
            .any(|(name, value)| name == "STRATUS_DOMAIN" && value == "dev.example.org"));
    }

    #[test]
    fn test_apply_auto_approve_flag() {
        let runner = Arc::new(ScriptedRunner::new());
        let engine = InfraEngine::new(runner.clone(), "terraform", Path::new("infra"));
        let config = test_config();

        engine.apply(&config, false).unwrap();
        engine.apply(&config, true).unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines[0], "terraform apply");
        assert_eq!(lines[1], "terraform apply -auto-approve");
    }

    #[test]
    fn test_destroy_auto_approve_flag() {
        let runner = Arc::new(ScriptedRunner::new());
        let engine = InfraEngine::new(runner.clone(), "terraform", Path::new("infra"));
        let config = test_config();

        engine.destroy(&config, true).unwrap();

        assert_eq!(runner.command_lines(), vec!["terraform destroy -auto-approve"]);
    }

    #[test]
    fn test_failure_names_step() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.fail_when("terraform", Some("validate"), 1);
        let engine = InfraEngine::new(runner, "terraform", Path::new("infra"));

        let err = engine.validate(&test_config()).unwrap_err();
        assert!(matches!(err, ExternalError::StepFailure { step, .. } if step == "engine_validate"));
    }

}
