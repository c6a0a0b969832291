//! Keyed registry of escrows with per-room serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::escrow::{EndReason, Escrow, Outcome, Receipt};
use crate::event::EscrowEvent;
use crate::{EscrowConfig, EscrowError, PartyId, Result};

/// All escrows of one deployment, addressable by room id.
///
/// The outer lock covers only map lookup and insertion; every room carries
/// its own mutex and operations on different rooms never contend. Within a
/// room each operation runs to completion under the lock, which rules out
/// check-then-act races on the deposit flags, phase, and turn counter.
pub struct EscrowLedger {
    config: EscrowConfig,
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

struct Room {
    escrow: Escrow,
    /// Append-only audit stream for this room.
    audit: Vec<EscrowEvent>,
}

/// Serializable state of one room: the escrow and its audit stream.
///
/// Produced by [`EscrowLedger::snapshot`] and accepted by
/// [`EscrowLedger::restore`]; the file half of the flow lives in
/// [`interface`](crate::interface).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub escrow: Escrow,
    pub audit: Vec<EscrowEvent>,
}

impl EscrowLedger {
    /// # Errors
    ///
    /// Rejects an inconsistent [`EscrowConfig`].
    pub fn new(config: EscrowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rooms: RwLock::new(HashMap::new()),
        })
    }

    /// Opens a new room with the caller as participant A.
    ///
    /// # Errors
    ///
    /// `RoomAlreadyExists`, or any input-validation error from
    /// [`Escrow::open`].
    pub fn open(
        &self,
        caller: PartyId,
        room_id: &str,
        stake_amount: u64,
        time_limit: Option<i64>,
        now: i64,
    ) -> Result<Receipt> {
        let (escrow, receipt) =
            Escrow::open(&self.config, room_id, caller, stake_amount, time_limit, now)?;

        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if rooms.contains_key(room_id) {
            return Err(EscrowError::RoomAlreadyExists(room_id.to_string()));
        }
        rooms.insert(
            room_id.to_string(),
            Arc::new(Mutex::new(Room {
                escrow,
                audit: receipt.events.clone(),
            })),
        );
        info!(room_id, stake_amount, "room opened");
        Ok(receipt)
    }

    pub fn join(&self, room_id: &str, caller: PartyId, now: i64) -> Result<Receipt> {
        self.apply(room_id, |escrow| escrow.join(caller, now))
    }

    pub fn deposit(&self, room_id: &str, caller: PartyId, now: i64) -> Result<Receipt> {
        self.apply(room_id, |escrow| escrow.deposit(caller, now))
    }

    pub fn record_move(
        &self,
        room_id: &str,
        caller: PartyId,
        label: &str,
        fingerprint: [u8; 32],
        now: i64,
    ) -> Result<Receipt> {
        self.apply(room_id, |escrow| {
            escrow.record_move(caller, label, fingerprint, now)
        })
    }

    pub fn declare_result(
        &self,
        room_id: &str,
        caller: PartyId,
        outcome: Outcome,
        reason: EndReason,
        now: i64,
    ) -> Result<Receipt> {
        self.apply(room_id, |escrow| {
            escrow.declare_result(caller, outcome, reason, now)
        })
    }

    /// Callable by anyone; no caller identity is required.
    pub fn force_timeout(&self, room_id: &str, now: i64) -> Result<Receipt> {
        self.apply(room_id, |escrow| escrow.force_timeout(now))
    }

    pub fn cancel(&self, room_id: &str, caller: PartyId) -> Result<Receipt> {
        self.apply(room_id, |escrow| escrow.cancel(caller))
    }

    /// Snapshot of a room's escrow.
    pub fn escrow(&self, room_id: &str) -> Result<Escrow> {
        self.with_room(room_id, |room| Ok(room.escrow.clone()))
    }

    /// Copy of a room's audit stream, in emission order.
    pub fn audit(&self, room_id: &str) -> Result<Vec<EscrowEvent>> {
        self.with_room(room_id, |room| Ok(room.audit.clone()))
    }

    /// Serializable copy of a room for host persistence.
    pub fn snapshot(&self, room_id: &str) -> Result<RoomSnapshot> {
        self.with_room(room_id, |room| {
            Ok(RoomSnapshot {
                escrow: room.escrow.clone(),
                audit: room.audit.clone(),
            })
        })
    }

    /// Re-registers a room from a snapshot, e.g. when the host restarts.
    ///
    /// # Errors
    ///
    /// `RoomAlreadyExists` if the room id is already registered.
    pub fn restore(&self, snapshot: RoomSnapshot) -> Result<()> {
        let room_id = snapshot.escrow.record.room_id.clone();
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if rooms.contains_key(&room_id) {
            return Err(EscrowError::RoomAlreadyExists(room_id));
        }
        info!(%room_id, "room restored");
        rooms.insert(
            room_id,
            Arc::new(Mutex::new(Room {
                escrow: snapshot.escrow,
                audit: snapshot.audit,
            })),
        );
        Ok(())
    }

    fn apply(
        &self,
        room_id: &str,
        op: impl FnOnce(&mut Escrow) -> Result<Receipt>,
    ) -> Result<Receipt> {
        self.with_room(room_id, |room| {
            let receipt = op(&mut room.escrow)?;
            room.audit.extend(receipt.events.iter().cloned());
            debug!(
                room_id,
                events = receipt.events.len(),
                transfers = receipt.transfers.len(),
                "operation accepted"
            );
            Ok(receipt)
        })
    }

    fn with_room<T>(&self, room_id: &str, f: impl FnOnce(&mut Room) -> Result<T>) -> Result<T> {
        let room = {
            let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
            rooms
                .get(room_id)
                .cloned()
                .ok_or_else(|| EscrowError::RoomNotFound(room_id.to_string()))?
        };
        let mut guard = room.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
