//! Tool settings (.stratus/deploy.toml)
//!
//! Project-level settings for the orchestrator: engine binary and working
//! directory, collaborator commands, artifacts location, and the
//! confirmation delay for auto-approved mutations. The file is optional;
//! every field has a default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default settings file location relative to the project root
pub const SETTINGS_PATH: &str = ".stratus/deploy.toml";

/// Error types for settings operations
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

fn default_engine_binary() -> String {
    "terraform".to_string()
}

fn default_engine_dir() -> PathBuf {
    PathBuf::from("terraform")
}

fn default_health_check_command() -> String {
    "scripts/manage-health-checks".to_string()
}

fn default_dashboard_command() -> String {
    "scripts/update-dashboard".to_string()
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from(".stratus/runs")
}

fn default_confirmation_delay_seconds() -> u64 {
    10
}

/// Deployment tool settings from .stratus/deploy.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Infrastructure engine binary
    #[serde(default = "default_engine_binary")]
    pub engine_binary: String,

    /// Directory containing the engine's source files, relative to the
    /// project root
    #[serde(default = "default_engine_dir")]
    pub engine_dir: PathBuf,

    /// Health-check registration command
    #[serde(default = "default_health_check_command")]
    pub health_check_command: String,

    /// Dashboard update command
    #[serde(default = "default_dashboard_command")]
    pub dashboard_command: String,

    /// Directory for run artifacts, relative to the project root
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Warning delay before auto-approved mutations, in seconds
    #[serde(default = "default_confirmation_delay_seconds")]
    pub confirmation_delay_seconds: u64,

    /// Deployment used when none is given on the command line
    #[serde(default)]
    pub default_deployment: Option<String>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            engine_binary: default_engine_binary(),
            engine_dir: default_engine_dir(),
            health_check_command: default_health_check_command(),
            dashboard_command: default_dashboard_command(),
            artifacts_dir: default_artifacts_dir(),
            confirmation_delay_seconds: default_confirmation_delay_seconds(),
            default_deployment: None,
        }
    }
}

impl DeploySettings {
    /// Load and parse settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse settings from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, SettingsError> {
        let settings: DeploySettings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `.stratus/deploy.toml` under the project root, falling back to
    /// defaults when the file does not exist
    pub fn load_or_default(project_root: &Path) -> Result<Self, SettingsError> {
        let path = project_root.join(SETTINGS_PATH);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        // confirmation_delay_seconds must be in [0, 300]
        if self.confirmation_delay_seconds > 300 {
            return Err(SettingsError::Validation(
                "confirmation_delay_seconds must be in [0, 300]".to_string(),
            ));
        }

        if self.engine_binary.is_empty() {
            return Err(SettingsError::Validation(
                "engine_binary must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = DeploySettings::default();
        assert_eq!(settings.engine_binary, "terraform");
        assert_eq!(settings.engine_dir, PathBuf::from("terraform"));
        assert_eq!(settings.artifacts_dir, PathBuf::from(".stratus/runs"));
        assert_eq!(settings.confirmation_delay_seconds, 10);
        assert!(settings.default_deployment.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings = DeploySettings::from_toml("default_deployment = \"dev\"\n").unwrap();
        assert_eq!(settings.default_deployment.as_deref(), Some("dev"));
        assert_eq!(settings.engine_binary, "terraform");
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
engine_binary = "tofu"
engine_dir = "infra"
health_check_command = "bin/health"
dashboard_command = "bin/dashboard"
artifacts_dir = "runs"
confirmation_delay_seconds = 5
default_deployment = "staging"
"#;
        let settings = DeploySettings::from_toml(toml).unwrap();
        assert_eq!(settings.engine_binary, "tofu");
        assert_eq!(settings.engine_dir, PathBuf::from("infra"));
        assert_eq!(settings.confirmation_delay_seconds, 5);
        assert_eq!(settings.default_deployment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_validation_delay_range() {
        let result = DeploySettings::from_toml("confirmation_delay_seconds = 301\n");
        assert!(matches!(result, Err(SettingsError::Validation(_))));
    }

    #[test]
    fn test_validation_empty_binary() {
        let result = DeploySettings::from_toml("engine_binary = \"\"\n");
        assert!(matches!(result, Err(SettingsError::Validation(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let settings = DeploySettings::load_or_default(dir.path()).unwrap();
        assert_eq!(settings.engine_binary, "terraform");
    }

    #[test]
    fn test_load_or_default_reads_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".stratus")).unwrap();
        let mut file = fs::File::create(dir.path().join(SETTINGS_PATH)).unwrap();
        writeln!(file, "engine_binary = \"tofu\"").unwrap();

        let settings = DeploySettings::load_or_default(dir.path()).unwrap();
        assert_eq!(settings.engine_binary, "tofu");
    }

    #[test]
    fn test_invalid_toml() {
        let result = DeploySettings::from_toml("engine_binary = [");
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }
}
