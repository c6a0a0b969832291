//! Custodial balance holding the staked funds of one match.

use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;
use sha2::{Digest, Sha256};

use crate::{EscrowError, PartyId, Result};

/// Custodial vault, associated 1:1 with an escrow record.
///
/// Holds exactly the total deposited while the match is live and reaches
/// zero in the same operation that settles or cancels the match.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    #[serde_as(as = "Hex")]
    address: [u8; 32],
    balance: u64,
}

impl Vault {
    /// Creates the empty vault for `room_id` at its deterministic address.
    pub fn for_room(room_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"vault");
        hasher.update(room_id.as_bytes());
        Self {
            address: hasher.finalize().into(),
            balance: 0,
        }
    }

    /// Stable address derived from the room id.
    pub const fn address(&self) -> &[u8; 32] {
        &self.address
    }

    pub const fn balance(&self) -> u64 {
        self.balance
    }

    /// Adds `amount` to the custodied balance.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if the balance would exceed `u64::MAX`.
    pub fn credit(&mut self, amount: u64) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(EscrowError::AmountOverflow)?;
        Ok(())
    }

    /// Empties the vault, returning the full custodied balance.
    pub fn drain(&mut self) -> u64 {
        std::mem::take(&mut self.balance)
    }
}

/// A payout instruction for the host's payment layer.
///
/// The core never moves real funds; settlement and cancellation return the
/// transfers the host must execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: PartyId,
    pub amount: u64,
}
