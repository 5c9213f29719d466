//! Governance runtime configuration.
//!
//! Weight caps bound what a single voter can contribute under the stake and
//! rarity policies. The backend timeout bounds every call to the external
//! prover/verifier.

use std::time::Duration;

/// Runtime knobs for the governance services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernanceConfig {
    /// Upper clamp for a stake-weighted vote.
    pub stake_weight_cap: u64,
    /// Upper clamp for a rarity-weighted vote.
    pub rarity_weight_cap: u64,
    /// Deadline for a single `prove()` or `verify_bytes()` call.
    pub backend_timeout: Duration,
    /// Whether accepted mutations are forwarded to the ledger sink.
    pub submit_to_ledger: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            stake_weight_cap: 1000,
            rarity_weight_cap: 10,
            backend_timeout: Duration::from_millis(30_000),
            submit_to_ledger: true,
        }
    }
}

impl GovernanceConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AGOV_STAKE_WEIGHT_CAP` (default: 1000)
    /// - `AGOV_RARITY_WEIGHT_CAP` (default: 10)
    /// - `AGOV_BACKEND_TIMEOUT_MS` (default: 30000)
    /// - `AGOV_SUBMIT_TO_LEDGER` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            stake_weight_cap: positive_u64(
                &lookup,
                "AGOV_STAKE_WEIGHT_CAP",
                defaults.stake_weight_cap,
            )?,
            rarity_weight_cap: positive_u64(
                &lookup,
                "AGOV_RARITY_WEIGHT_CAP",
                defaults.rarity_weight_cap,
            )?,
            backend_timeout: Duration::from_millis(positive_u64(
                &lookup,
                "AGOV_BACKEND_TIMEOUT_MS",
                defaults.backend_timeout.as_millis() as u64,
            )?),
            submit_to_ledger: match lookup("AGOV_SUBMIT_TO_LEDGER") {
                None => defaults.submit_to_ledger,
                Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                    var: "AGOV_SUBMIT_TO_LEDGER".to_string(),
                    value: raw,
                })?,
            },
        })
    }
}

fn positive_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: String, value: String },
}
