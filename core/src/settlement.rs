//! Fee computation and payout distribution.

use serde::{Deserialize, Serialize};

use crate::escrow::Outcome;
use crate::{EscrowError, PartyId, Result, Transfer};

/// Distribution plan for a settled pot.
///
/// Computed in full before any balance moves, so a rejected settlement
/// leaves no partial state. The plan conserves value exactly:
/// `fee + payout_a + payout_b + dust == pot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: Outcome,
    /// Platform fee, floor of `pot * fee_rate_bps / 10_000`.
    pub fee: u64,
    pub payout_a: u64,
    pub payout_b: u64,
    /// Rounding remainder of an odd draw split. Credited to the fee
    /// collector rather than silently dropped; zero in all other cases.
    pub dust: u64,
}

impl Settlement {
    /// Computes the distribution of `pot` for `outcome`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeeRate` for a rate above 100% and `InvalidOutcome`
    /// for [`Outcome::Undetermined`].
    pub fn compute(pot: u64, fee_rate_bps: u16, outcome: Outcome) -> Result<Self> {
        if fee_rate_bps > 10_000 {
            return Err(EscrowError::InvalidFeeRate(fee_rate_bps));
        }
        // widened so the fee cannot overflow for any u64 pot
        let fee = (u128::from(pot) * u128::from(fee_rate_bps) / 10_000) as u64;
        let remainder = pot - fee;

        let (payout_a, payout_b, dust) = match outcome {
            Outcome::Undetermined => return Err(EscrowError::InvalidOutcome),
            Outcome::WinnerA => (remainder, 0, 0),
            Outcome::WinnerB => (0, remainder, 0),
            Outcome::Draw => {
                let half = remainder / 2;
                (half, half, remainder - half * 2)
            }
        };

        Ok(Self {
            outcome,
            fee,
            payout_a,
            payout_b,
            dust,
        })
    }

    /// Sum of all planned credits; always equals the settled pot.
    pub fn total(&self) -> u64 {
        self.fee + self.payout_a + self.payout_b + self.dust
    }

    /// Renders the plan as payout instructions. Zero-amount transfers are
    /// omitted; fee and dust are merged into one credit to the collector.
    pub fn transfers(
        &self,
        participant_a: PartyId,
        participant_b: PartyId,
        fee_collector: PartyId,
    ) -> Vec<Transfer> {
        let mut out = Vec::with_capacity(3);
        if self.payout_a > 0 {
            out.push(Transfer {
                to: participant_a,
                amount: self.payout_a,
            });
        }
        if self.payout_b > 0 {
            out.push(Transfer {
                to: participant_b,
                amount: self.payout_b,
            });
        }
        let collected = self.fee + self.dust;
        if collected > 0 {
            out.push(Transfer {
                to: fee_collector,
                amount: collected,
            });
        }
        out
    }
}
