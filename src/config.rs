use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{LedgerError, Result};

/// how the calculator treats a missing predecessor period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarryForwardPolicy {
    /// only read the immediate predecessor; a missing one carries nothing
    Sequential,
    /// compute every missing period since the last persisted one before the target
    FillGaps,
    /// refuse to compute a period whose predecessor was skipped
    Strict,
}

/// what recording a payment does to the installment it lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRecompute {
    /// add to paid and rederive outstanding from the stored total and discount
    Partial,
    /// partial update followed by a full recalculation of the installment's period
    Full,
}

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub carry_forward: CarryForwardPolicy,
    /// upper bound on periods computed on demand under `FillGaps`
    pub max_gap_periods: u32,
    pub payment_recompute: PaymentRecompute,
    /// keep an in-memory audit trail of ledger events
    pub record_events: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            carry_forward: CarryForwardPolicy::FillGaps,
            max_gap_periods: 24,
            payment_recompute: PaymentRecompute::Partial,
            record_events: true,
        }
    }
}

impl LedgerConfig {
    /// behaviour matching a ledger that never backfills and never recomputes on payment
    pub fn sequential() -> Self {
        Self {
            carry_forward: CarryForwardPolicy::Sequential,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// load from a json file, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "ledger config not found, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.carry_forward == CarryForwardPolicy::FillGaps && self.max_gap_periods == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "max_gap_periods must be at least 1 when filling gaps".to_string(),
            });
        }
        Ok(())
    }
}
