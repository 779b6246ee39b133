use serde::{Deserialize, Serialize};
use tel_block::{ReadOptions, DEFAULT_MAX_DEPTH};
use tel_crypto::algorithms;

use crate::error::{LedgerError, LedgerResult};

/// Settings shared by evaluators and builders.
///
/// The algorithm identifiers are the defaults written into new genesis
/// policies; an existing ledger always uses the algorithms its own policy
/// declares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Maximum block nesting accepted by the reader, outermost block included.
    pub max_block_depth: usize,
    /// Hash algorithm for new ledgers.
    pub hashing_algorithm: String,
    /// Signature algorithm for new ledgers.
    pub signing_algorithm: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_block_depth: DEFAULT_MAX_DEPTH,
            hashing_algorithm: algorithms::BLAKE3_LEDGER_KEYED.to_string(),
            signing_algorithm: algorithms::ED25519.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.max_block_depth == 0 {
            return Err(LedgerError::Config(
                "max_block_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            max_depth: self.max_block_depth,
        }
    }
}
