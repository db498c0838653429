//! Layered environment configuration
//!
//! Implements the 4-layer resolution:
//! 1. Built-in global defaults
//! 2. Deployment file (deployments/<name>/environment)
//! 3. Deployment local override (deployments/<name>/environment.local)
//! 4. Project-root local override (environment.local)
//!
//! Layers merge last-defined-wins per variable; `$NAME` references are
//! resolved afterwards against the effective set.

mod defaults;
mod effective;
mod interpolate;
mod layer;
mod merge;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigSource, EffectiveConfig, ResolvedVar, SCHEMA_ID, SCHEMA_VERSION};
pub use interpolate::{resolve_all, InterpolateError};
pub use layer::{Assignment, Layer, LayerError, LayerOrigin, VarForm};
pub use merge::{merge_layers, MergeError, MergedVar};
