//! Append-only audit events.
//!
//! The record keeps only the counters needed for authorization; the full
//! history, including every accepted move, lives on this event stream.

use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;

use crate::escrow::{EndReason, Outcome};
use crate::PartyId;

/// One entry on an escrow's audit stream.
///
/// Exactly one event is emitted per accepted operation, except for the
/// deposit that starts the match, which also emits [`Started`].
///
/// [`Started`]: EscrowEvent::Started
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEvent {
    Created {
        room_id: String,
        participant_a: PartyId,
        stake_amount: u64,
        created_time: i64,
    },
    Joined {
        room_id: String,
        participant_b: PartyId,
        joined_time: i64,
    },
    Deposited {
        room_id: String,
        participant: PartyId,
        amount: u64,
    },
    Started {
        room_id: String,
        started_time: i64,
    },
    MoveRecorded {
        room_id: String,
        mover: PartyId,
        /// Value of the record's counter after this move.
        move_count: u32,
        label: String,
        #[serde_as(as = "Hex")]
        fingerprint: [u8; 32],
        timestamp: i64,
    },
    Settled {
        room_id: String,
        outcome: Outcome,
        reason: EndReason,
        settled_time: i64,
    },
    Cancelled {
        room_id: String,
        cancelled_by: PartyId,
    },
}

impl EscrowEvent {
    /// Room the event belongs to.
    pub fn room_id(&self) -> &str {
        match self {
            Self::Created { room_id, .. }
            | Self::Joined { room_id, .. }
            | Self::Deposited { room_id, .. }
            | Self::Started { room_id, .. }
            | Self::MoveRecorded { room_id, .. }
            | Self::Settled { room_id, .. }
            | Self::Cancelled { room_id, .. } => room_id,
        }
    }
}

impl std::fmt::Display for EscrowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}
