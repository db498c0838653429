//! Built-in global defaults (lowest-precedence layer)
//!
//! Hardcoded defaults shared by every deployment. Deployment files and local
//! overrides layer on top of these.

use super::layer::{Assignment, Layer, VarForm};

/// Built-in default variable values
#[derive(Debug, Clone)]
pub struct BuiltinDefaults {
    /// Debug mode flag ("0" off, "1" on)
    pub debug: String,

    /// Health endpoint path probed by the health-check service
    pub health_path: String,

    /// Dashboard folder the metrics update targets
    pub dashboard_folder: String,

    /// Run the infrastructure engine in non-interactive automation mode
    pub tf_in_automation: String,

    /// Disable interactive input prompts in the infrastructure engine
    pub tf_input: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            debug: "0".to_string(),
            health_path: "/health".to_string(),
            dashboard_folder: "deployments".to_string(),
            tf_in_automation: "1".to_string(),
            tf_input: "0".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to a layer for merging
    pub fn to_layer(&self) -> Layer {
        let assignment = |name: &str, value: &str, form: VarForm| Assignment {
            name: name.to_string(),
            value: value.to_string(),
            form,
            line: 0,
        };

        Layer::builtin(vec![
            assignment("STRATUS_DEBUG", &self.debug, VarForm::Set),
            assignment("STRATUS_HEALTH_PATH", &self.health_path, VarForm::Set),
            assignment("STRATUS_DASHBOARD_FOLDER", &self.dashboard_folder, VarForm::Set),
            assignment("TF_IN_AUTOMATION", &self.tf_in_automation, VarForm::Export),
            assignment("TF_INPUT", &self.tf_input, VarForm::Export),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::layer::LayerOrigin;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.debug, "0");
        assert_eq!(defaults.health_path, "/health");
        assert_eq!(defaults.tf_in_automation, "1");
    }

    #[test]
    fn test_to_layer() {
        let layer = BuiltinDefaults::default().to_layer();

        assert_eq!(layer.origin, LayerOrigin::Defaults);
        assert!(layer.path.is_none());
        assert_eq!(layer.len(), 5);

        let debug = layer.assignments.iter().find(|a| a.name == "STRATUS_DEBUG").unwrap();
        assert_eq!(debug.value, "0");
        assert_eq!(debug.form, VarForm::Set);

        let tf_input = layer.assignments.iter().find(|a| a.name == "TF_INPUT").unwrap();
        assert_eq!(tf_input.form, VarForm::Export);
    }
}
