//! Fixed per-deployment configuration.

use serde::{Deserialize, Serialize};

use crate::{EscrowError, PartyId, Result};

/// Platform fee in basis points (1%).
pub const DEFAULT_FEE_RATE_BPS: u16 = 100;

/// Inactivity window applied when a room is opened without an explicit one.
pub const DEFAULT_TIME_LIMIT_SECS: i64 = 300;

/// Deployment-wide escrow parameters.
///
/// Supplied once at startup; each record copies the values it needs at
/// creation time and never reads the config again, so changing the config
/// only affects rooms opened afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscrowConfig {
    /// Fee taken from every settled pot, in basis points.
    pub fee_rate_bps: u16,
    /// Destination of the platform fee and of draw rounding dust.
    pub fee_collector: PartyId,
    /// Inclusive per-player stake bounds.
    pub min_stake: u64,
    pub max_stake: u64,
    /// Fallback inactivity window for rooms opened without one.
    pub default_time_limit: i64,
}

impl EscrowConfig {
    /// Config with default fee rate, unbounded stakes, and the default
    /// inactivity window.
    pub fn new(fee_collector: PartyId) -> Self {
        Self {
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            fee_collector,
            min_stake: 1,
            max_stake: u64::MAX,
            default_time_limit: DEFAULT_TIME_LIMIT_SECS,
        }
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeeRate` for a rate above 100%, `InvalidStakeAmount`
    /// for an empty stake range, and `InvalidTimeLimit` for a non-positive
    /// default window.
    pub fn validate(&self) -> Result<()> {
        if self.fee_rate_bps > 10_000 {
            return Err(EscrowError::InvalidFeeRate(self.fee_rate_bps));
        }
        if self.min_stake == 0 || self.min_stake > self.max_stake {
            return Err(EscrowError::InvalidStakeAmount(self.min_stake));
        }
        if self.default_time_limit <= 0 {
            return Err(EscrowError::InvalidTimeLimit(self.default_time_limit));
        }
        Ok(())
    }

    /// Whether `stake` falls within the configured bounds.
    pub fn stake_in_bounds(&self, stake: u64) -> bool {
        stake >= self.min_stake && stake <= self.max_stake
    }
}
