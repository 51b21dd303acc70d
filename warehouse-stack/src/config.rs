//! Runtime configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Synthesizer configuration sourced from the process environment.
///
/// The deployment identity itself is parsed separately, see
/// [`warehouse_core::context::DeployContext::from_env`].
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Optional path to a YAML pipelines manifest; the built-in sample
    /// wiring is used when unset.
    #[serde(default)]
    pub pipelines_file: Option<PathBuf>,
}

impl Config {
    /// Create a new config instance from the runtime environment.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }
}
