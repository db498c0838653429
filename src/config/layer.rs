//! Layer sources and the environment-file statement parser
//!
//! A layer is one ordered source of variable definitions. File layers use a
//! newline-delimited statement format:
//!
//! ```text
//! # comment
//! _set STRATUS_DOMAIN dev.example.org
//! export TF_DATA_DIR=.terraform
//! ```
//!
//! `_set` defines an application variable; `export` defines a process
//! environment variable passed through to subprocesses. Values may contain
//! `$NAME` references resolved after the full layer merge.

use std::fs;
use std::path::{Path, PathBuf};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Origin of a configuration layer, in increasing precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOrigin {
    /// Built-in global defaults
    Defaults,
    /// Deployment-specific environment file
    Deployment,
    /// Deployment-specific local override (optional)
    DeploymentLocal,
    /// Project-root local override (optional)
    RootLocal,
}

impl std::fmt::Display for LayerOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerOrigin::Defaults => write!(f, "defaults"),
            LayerOrigin::Deployment => write!(f, "deployment"),
            LayerOrigin::DeploymentLocal => write!(f, "deployment_local"),
            LayerOrigin::RootLocal => write!(f, "root_local"),
        }
    }
}

/// Assignment form of a variable definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarForm {
    /// `_set NAME VALUE` - application variable
    Set,
    /// `export NAME=VALUE` - process environment variable
    Export,
}

impl VarForm {
    /// The statement keyword for this form
    pub fn keyword(&self) -> &'static str {
        match self {
            VarForm::Set => "_set",
            VarForm::Export => "export",
        }
    }
}

/// A single variable definition within a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Variable name
    pub name: String,
    /// Raw (uninterpolated) value
    pub value: String,
    /// Assignment form used
    pub form: VarForm,
    /// 1-based line number in the source file (0 for built-in defaults)
    pub line: usize,
}

/// A parsed configuration layer
#[derive(Debug, Clone)]
pub struct Layer {
    /// Origin of this layer
    pub origin: LayerOrigin,
    /// File path (None for built-in defaults)
    pub path: Option<PathBuf>,
    /// SHA-256 digest of the raw file bytes (None for built-in defaults)
    pub digest: Option<String>,
    /// Definitions in file order
    pub assignments: Vec<Assignment>,
}

/// Errors while loading or parsing a layer
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed statement: {text}")]
    MalformedStatement {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("{path}:{line}: invalid variable name: {name}")]
    InvalidName {
        path: PathBuf,
        line: usize,
        name: String,
    },
}

fn set_pattern() -> Regex {
    Regex::new(r"^_set\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+(.*))?$").expect("static pattern")
}

fn export_pattern() -> Regex {
    Regex::new(r"^export\s+([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("static pattern")
}

impl Layer {
    /// Build the built-in defaults layer from pre-parsed assignments
    pub fn builtin(assignments: Vec<Assignment>) -> Self {
        Self {
            origin: LayerOrigin::Defaults,
            path: None,
            digest: None,
            assignments,
        }
    }

    /// Load and parse a layer file
    pub fn from_file(origin: LayerOrigin, path: &Path) -> Result<Self, LayerError> {
        let bytes = fs::read(path).map_err(|source| LayerError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8_lossy(&bytes);
        let assignments = parse_statements(&contents, path)?;

        Ok(Self {
            origin,
            path: Some(path.to_path_buf()),
            digest: Some(digest),
            assignments,
        })
    }

    /// Number of definitions in this layer
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether this layer defines no variables
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Parse the statement body of a layer file
fn parse_statements(contents: &str, path: &Path) -> Result<Vec<Assignment>, LayerError> {
    let set_re = set_pattern();
    let export_re = export_pattern();

    let mut assignments = Vec::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(caps) = set_re.captures(line) {
            assignments.push(Assignment {
                name: caps[1].to_string(),
                value: caps.get(2).map(|m| m.as_str().trim()).unwrap_or("").to_string(),
                form: VarForm::Set,
                line: line_no,
            });
        } else if let Some(caps) = export_re.captures(line) {
            assignments.push(Assignment {
                name: caps[1].to_string(),
                value: caps[2].trim().to_string(),
                form: VarForm::Export,
                line: line_no,
            });
        } else if line.starts_with("_set") || line.starts_with("export") {
            // Keyword present but the name is not a valid identifier
            let name = line
                .split_whitespace()
                .nth(1)
                .unwrap_or("")
                .split('=')
                .next()
                .unwrap_or("")
                .to_string();
            return Err(LayerError::InvalidName {
                path: path.to_path_buf(),
                line: line_no,
                name,
            });
        } else {
            return Err(LayerError::MalformedStatement {
                path: path.to_path_buf(),
                line: line_no,
                text: line.to_string(),
            });
        }
    }

    Ok(assignments)
}
