//! Runtime configuration for the payment core
//!
//! Loaded from JSON by the embedding application. Every field has a
//! default, so an empty object is a valid configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::crypto::merkle::DEFAULT_ROOT_HISTORY;

/// Practical upper bound for balance proofs (10^15 base units)
pub const DEFAULT_BALANCE_CEILING: u64 = 1_000_000_000_000_000;
pub const DEFAULT_FEE: u64 = 1_000;
pub const DEFAULT_PROOF_ID_PREFIX: &str = "sp_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Upper bound used when a balance proof only shows `total >= min`
    pub balance_ceiling: u64,
    /// Fee applied when `create_payment_with_change` gets none
    pub default_fee: u64,
    /// Cap on scanner threads; `None` uses every core
    pub scan_workers: Option<usize>,
    /// How many recent accumulator roots verifiers accept
    pub root_history_len: usize,
    pub proof_id_prefix: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            balance_ceiling: DEFAULT_BALANCE_CEILING,
            default_fee: DEFAULT_FEE,
            scan_workers: None,
            root_history_len: DEFAULT_ROOT_HISTORY,
            proof_id_prefix: DEFAULT_PROOF_ID_PREFIX.to_string(),
        }
    }
}

impl CoreConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse core config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.balance_ceiling == 0 {
            bail!("balance_ceiling must be positive");
        }
        if self.root_history_len == 0 {
            bail!("root_history_len must be positive");
        }
        if self.scan_workers == Some(0) {
            bail!("scan_workers must be at least 1 when set");
        }
        Ok(())
    }
}
