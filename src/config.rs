use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::grading::cohort::{COMPENSATED_CREDITS, CompensationPolicy};

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "DEGREE_CALC_CONFIG";

/// Calculator settings.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "compensated_policy": "ask",
///   "compensated_credits": 20
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    /// How zero-credit modules are resolved: `ask`, `include` or `exclude`.
    pub compensated_policy: CompensationPolicy,
    /// Credits given to an included compensated module.
    pub compensated_credits: f64,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            compensated_policy: CompensationPolicy::Ask,
            compensated_credits: COMPENSATED_CREDITS,
        }
    }
}

impl CalculatorConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Loads from `path`, else from [`CONFIG_ENV`], else returns defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(value) if !value.is_empty() => Self::load(Path::new(&value)),
            _ => Ok(Self::default()),
        }
    }
}
