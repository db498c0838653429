//! Stratus - deployment environment resolver and infrastructure orchestrator
//!
//! This crate resolves a layered, shell-style environment configuration
//! (global defaults, deployment file, optional local overrides) into a single
//! effective variable set, and sequences external infrastructure actions
//! (validate, plan, apply, destroy) against it with fixed pre/post steps.

pub mod config;
pub mod deploy;
pub mod external;
pub mod settings;

pub use config::{ConfigError, EffectiveConfig, Layer, LayerOrigin, VarForm};
pub use deploy::{DeployError, DeployPlan, Executor, Operation, RunSummary};
pub use external::{ProcessRunner, ScriptedRunner, SystemRunner};
pub use settings::DeploySettings;
