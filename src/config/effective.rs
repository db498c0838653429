//! Effective configuration with full provenance
//!
//! The effective configuration captures the merged, interpolated variable
//! set plus information about where each value came from. Resolution has no
//! side effects; injecting the result into a process environment is an
//! explicit step performed by the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defaults::BuiltinDefaults;
use super::interpolate::{resolve_all, InterpolateError};
use super::layer::{Layer, LayerError, LayerOrigin, VarForm};
use super::merge::{merge_layers, MergeError};

/// Schema version for effective_config.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "stratus/effective_config@1";

/// Names containing these fragments have their values masked in artifacts
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "credential",
];

/// A contributing layer source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: LayerOrigin,

    /// File path (None for built-in defaults)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for built-in defaults)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// A fully resolved variable with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVar {
    /// Interpolated value
    pub value: String,

    /// Assignment form (`_set` application variable or `export` pass-through)
    pub form: VarForm,

    /// Layer that supplied the winning definition
    pub origin: LayerOrigin,
}

/// Effective configuration (effective_config.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this config was resolved
    pub created_at: DateTime<Utc>,

    /// Deployment name the config was resolved for
    pub deployment: String,

    /// Resolved variables keyed by name
    pub vars: BTreeMap<String, ResolvedVar>,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// Names whose values are masked in this snapshot (empty on a live config)
    pub redactions: Vec<String>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("deployment {name} not found (expected {path})")]
    DeploymentNotFound { name: String, path: PathBuf },

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Interpolate(#[from] InterpolateError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EffectiveConfig {
    /// Build the effective config for a deployment under a project root.
    ///
    /// Layer order: built-in defaults, then `deployments/<name>/environment`
    /// (required), then `deployments/<name>/environment.local` and
    /// `environment.local` at the project root (both optional).
    pub fn build(project_root: &Path, deployment: &str) -> Result<Self, ConfigError> {
        let deployment_dir = project_root.join("deployments").join(deployment);
        let deployment_file = deployment_dir.join("environment");

        if !deployment_file.exists() {
            return Err(ConfigError::DeploymentNotFound {
                name: deployment.to_string(),
                path: deployment_file,
            });
        }

        let mut layers = vec![BuiltinDefaults::default().to_layer()];
        layers.push(Layer::from_file(LayerOrigin::Deployment, &deployment_file)?);

        let deployment_local = deployment_dir.join("environment.local");
        if deployment_local.exists() {
            layers.push(Layer::from_file(LayerOrigin::DeploymentLocal, &deployment_local)?);
        }

        let root_local = project_root.join("environment.local");
        if root_local.exists() {
            layers.push(Layer::from_file(LayerOrigin::RootLocal, &root_local)?);
        }

        Self::from_layers(layers, deployment)
    }

    /// Resolve an explicit ordered layer list (first is base, last wins)
    pub fn from_layers(layers: Vec<Layer>, deployment: &str) -> Result<Self, ConfigError> {
        let sources = layers
            .iter()
            .map(|layer| ConfigSource {
                origin: layer.origin,
                path: layer.path.as_ref().map(|p| p.to_string_lossy().to_string()),
                digest: layer.digest.clone(),
            })
            .collect();

        let merged = merge_layers(&layers)?;
        let resolved = resolve_all(&merged)?;

        let vars = merged
            .into_iter()
            .map(|(name, var)| {
                let value = resolved[&name].clone();
                (
                    name,
                    ResolvedVar {
                        value,
                        form: var.form,
                        origin: var.origin,
                    },
                )
            })
            .collect();

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            deployment: deployment.to_string(),
            vars,
            sources,
            redactions: Vec::new(),
        })
    }

    /// Get a resolved value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|v| v.value.as_str())
    }

    /// Get a resolved value interpreted as a boolean ("1"/"true" are true)
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    /// Pass-through (`export`) variables for subprocess environments
    pub fn process_env(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter(|(_, v)| v.form == VarForm::Export)
            .map(|(name, v)| (name.clone(), v.value.clone()))
            .collect()
    }

    /// Application (`_set`) variables
    pub fn app_vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .filter(|(_, v)| v.form == VarForm::Set)
            .map(|(name, v)| (name.clone(), v.value.clone()))
            .collect()
    }

    /// All resolved variables regardless of form
    pub fn all_env(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(name, v)| (name.clone(), v.value.clone()))
            .collect()
    }

    /// Inject the full resolved set into a subprocess command.
    ///
    /// This is the explicit environment-writing step; resolution itself
    /// never touches the process environment.
    pub fn apply_to_command(&self, command: &mut Command) {
        for (name, value) in self.all_env() {
            command.env(name, value);
        }
    }

    /// A snapshot with secret-looking values masked, for artifacts and display
    pub fn redacted(&self) -> Self {
        let mut snapshot = self.clone();
        let mut redactions = Vec::new();

        for (name, var) in snapshot.vars.iter_mut() {
            let lower = name.to_lowercase();
            if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                var.value = "[REDACTED]".to_string();
                redactions.push(name.clone());
            }
        }

        snapshot.redactions = redactions;
        snapshot
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the redacted snapshot as effective_config.json
    pub fn write_artifact(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        let path = dir.join("effective_config.json");
        let json = self.redacted().to_json()?;
        fs::write(&path, json).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
