use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// How the invoice-pair checks report failures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Stop at the first failing check and report only that one.
    #[default]
    FirstMatch,
    /// Report every failing check once the pair and its agreement are known.
    Collect,
}

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Compare-and-swap rounds before a write gives up with contention.
    pub max_write_attempts: u32,
    pub validation_mode: ValidationMode,
    /// Inclusive lower bound on an agreement's charge tolerance (percent).
    pub min_tolerance: Decimal,
    /// Inclusive upper bound on an agreement's charge tolerance (percent).
    pub max_tolerance: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: 16,
            validation_mode: ValidationMode::FirstMatch,
            min_tolerance: Decimal::ZERO,
            max_tolerance: Decimal::TEN,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LedgerError::Config(e.to_string()))?;
        if config.min_tolerance > config.max_tolerance {
            return Err(LedgerError::Config(format!(
                "min_tolerance {} exceeds max_tolerance {}",
                config.min_tolerance, config.max_tolerance
            )));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> LedgerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
