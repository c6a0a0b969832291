//! Escrow record model and lifecycle state machine.

use serde::{Deserialize, Serialize};

use crate::config::EscrowConfig;
use crate::event::EscrowEvent;
use crate::settlement::Settlement;
use crate::{EscrowError, PartyId, Result, Transfer, Vault};

/// Maximum length of a room identifier.
pub const MAX_ROOM_ID_BYTES: usize = 32;

/// Maximum length of a move label.
pub const MAX_MOVE_LABEL_BYTES: usize = 10;

/// Lifecycle phase of an escrow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Room opened by participant A; waiting for an opponent.
    AwaitingOpponent,
    /// Both participants known; waiting for both stakes.
    AwaitingDeposits,
    /// Both stakes custodied; moves are being recorded.
    Active,
    /// Funds distributed. Terminal.
    Settled,
    /// Deposits refunded before the match started. Terminal.
    Cancelled,
}

impl Phase {
    /// Terminal phases admit no further operations.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

/// Resolution of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Undetermined,
    WinnerA,
    WinnerB,
    Draw,
}

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Checkmate,
    Resignation,
    Timeout,
    Agreement,
    Stalemate,
    Abandonment,
}

/// Seat a caller occupies in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    A,
    B,
}

/// Authoritative state for one match's stakes and lifecycle.
///
/// Deliberately small: moves are not stored here, only the counter and
/// timestamp that turn authorization and timeout attribution need. Full
/// move detail goes to the audit stream as [`EscrowEvent::MoveRecorded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub room_id: String,
    pub participant_a: PartyId,
    /// Absent until an opponent joins.
    pub participant_b: Option<PartyId>,
    /// Per-player stake, fixed at creation.
    pub stake_amount: u64,
    /// Running sum of confirmed deposits: 0, stake, or 2x stake.
    pub total_deposited: u64,
    pub phase: Phase,
    pub outcome: Outcome,
    pub deposited_a: bool,
    pub deposited_b: bool,
    /// Also encodes whose turn it is: even means A to move, odd means B.
    pub move_count: u32,
    pub created_time: i64,
    pub started_time: i64,
    pub settled_time: i64,
    pub last_activity_time: i64,
    /// Maximum inactivity before anyone may force a timeout settlement.
    pub time_limit: i64,
    pub fee_rate_bps: u16,
    pub fee_collector: PartyId,
}

impl EscrowRecord {
    fn side_of(&self, caller: PartyId) -> Option<Side> {
        if caller == self.participant_a {
            Some(Side::A)
        } else if self.participant_b == Some(caller) {
            Some(Side::B)
        } else {
            None
        }
    }

    fn side_to_move(&self) -> Side {
        if self.move_count % 2 == 0 {
            Side::A
        } else {
            Side::B
        }
    }

    /// Participant expected to move next, once the match is active.
    pub fn expected_mover(&self) -> Option<PartyId> {
        if self.phase != Phase::Active {
            return None;
        }
        match self.side_to_move() {
            Side::A => Some(self.participant_a),
            Side::B => self.participant_b,
        }
    }
}

/// Outputs of an accepted operation: audit events for the append-only log
/// and payout instructions for the host's payment layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub events: Vec<EscrowEvent>,
    pub transfers: Vec<Transfer>,
}

impl Receipt {
    fn events(events: Vec<EscrowEvent>) -> Self {
        Self {
            events,
            transfers: Vec::new(),
        }
    }
}

/// One match's escrow: the authoritative record plus its custodial vault.
///
/// Every mutating operation validates caller, phase, and inputs before
/// touching any state, so a returned error implies nothing changed. The
/// caller supplies `now`; the core never reads a clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub record: EscrowRecord,
    pub vault: Vault,
}

impl Escrow {
    /// Opens a new room with participant A as creator.
    ///
    /// `time_limit` falls back to the configured default when `None`.
    ///
    /// # Errors
    ///
    /// `RoomIdTooLong`, `InvalidStakeAmount` (zero or out of the configured
    /// bounds), or `InvalidTimeLimit`.
    pub fn open(
        config: &EscrowConfig,
        room_id: impl Into<String>,
        participant_a: PartyId,
        stake_amount: u64,
        time_limit: Option<i64>,
        now: i64,
    ) -> Result<(Self, Receipt)> {
        config.validate()?;

        let room_id = room_id.into();
        if room_id.len() > MAX_ROOM_ID_BYTES {
            return Err(EscrowError::RoomIdTooLong(room_id.len()));
        }
        if stake_amount == 0 || !config.stake_in_bounds(stake_amount) {
            return Err(EscrowError::InvalidStakeAmount(stake_amount));
        }
        let time_limit = time_limit.unwrap_or(config.default_time_limit);
        if time_limit <= 0 {
            return Err(EscrowError::InvalidTimeLimit(time_limit));
        }

        let vault = Vault::for_room(&room_id);
        let record = EscrowRecord {
            room_id: room_id.clone(),
            participant_a,
            participant_b: None,
            stake_amount,
            total_deposited: 0,
            phase: Phase::AwaitingOpponent,
            outcome: Outcome::Undetermined,
            deposited_a: false,
            deposited_b: false,
            move_count: 0,
            created_time: now,
            started_time: 0,
            settled_time: 0,
            last_activity_time: 0,
            time_limit,
            fee_rate_bps: config.fee_rate_bps,
            fee_collector: config.fee_collector,
        };
        let receipt = Receipt::events(vec![EscrowEvent::Created {
            room_id,
            participant_a,
            stake_amount,
            created_time: now,
        }]);
        Ok((Self { record, vault }, receipt))
    }

    /// Seats the caller as participant B.
    ///
    /// # Errors
    ///
    /// `GameNotWaitingForPlayers` outside [`Phase::AwaitingOpponent`],
    /// `CannotPlayAgainstSelf` if the creator joins their own room.
    pub fn join(&mut self, caller: PartyId, now: i64) -> Result<Receipt> {
        let record = &mut self.record;
        if record.phase != Phase::AwaitingOpponent {
            return Err(EscrowError::GameNotWaitingForPlayers);
        }
        if caller == record.participant_a {
            return Err(EscrowError::CannotPlayAgainstSelf);
        }

        record.participant_b = Some(caller);
        record.phase = Phase::AwaitingDeposits;
        Ok(Receipt::events(vec![EscrowEvent::Joined {
            room_id: record.room_id.clone(),
            participant_b: caller,
            joined_time: now,
        }]))
    }

    /// Custodies the caller's stake. The second stake in starts the match.
    ///
    /// The creator may deposit before an opponent has joined.
    ///
    /// # Errors
    ///
    /// `InvalidPhaseForDeposit` once the match has started or ended,
    /// `UnauthorizedParticipant` for a third party, `AlreadyDeposited` on a
    /// repeat deposit.
    pub fn deposit(&mut self, caller: PartyId, now: i64) -> Result<Receipt> {
        let record = &mut self.record;
        match record.phase {
            Phase::AwaitingOpponent | Phase::AwaitingDeposits => {}
            _ => return Err(EscrowError::InvalidPhaseForDeposit),
        }
        let side = record
            .side_of(caller)
            .ok_or(EscrowError::UnauthorizedParticipant)?;
        let already = match side {
            Side::A => record.deposited_a,
            Side::B => record.deposited_b,
        };
        if already {
            return Err(EscrowError::AlreadyDeposited);
        }
        let new_total = record
            .total_deposited
            .checked_add(record.stake_amount)
            .ok_or(EscrowError::AmountOverflow)?;

        self.vault.credit(record.stake_amount)?;
        record.total_deposited = new_total;
        match side {
            Side::A => record.deposited_a = true,
            Side::B => record.deposited_b = true,
        }

        let mut events = vec![EscrowEvent::Deposited {
            room_id: record.room_id.clone(),
            participant: caller,
            amount: record.stake_amount,
        }];
        if record.deposited_a && record.deposited_b {
            record.phase = Phase::Active;
            record.started_time = now;
            record.last_activity_time = now;
            events.push(EscrowEvent::Started {
                room_id: record.room_id.clone(),
                started_time: now,
            });
        }
        Ok(Receipt::events(events))
    }

    /// Records an externally-validated move: advances the turn counter and
    /// emits the full move tuple to the audit stream.
    ///
    /// The label and fingerprint are opaque here; legality is the rules
    /// engine's job.
    ///
    /// # Errors
    ///
    /// `GameNotActive`, `UnauthorizedParticipant`, `NotYourTurn`,
    /// `MoveLabelTooLong`, or `MoveTimeExceeded` once the inactivity
    /// window has lapsed.
    pub fn record_move(
        &mut self,
        caller: PartyId,
        label: &str,
        fingerprint: [u8; 32],
        now: i64,
    ) -> Result<Receipt> {
        let record = &mut self.record;
        if record.phase != Phase::Active {
            return Err(EscrowError::GameNotActive);
        }
        let side = record
            .side_of(caller)
            .ok_or(EscrowError::UnauthorizedParticipant)?;
        if side != record.side_to_move() {
            return Err(EscrowError::NotYourTurn);
        }
        if label.len() > MAX_MOVE_LABEL_BYTES {
            return Err(EscrowError::MoveLabelTooLong(label.len()));
        }
        if now - record.last_activity_time > record.time_limit {
            return Err(EscrowError::MoveTimeExceeded);
        }

        record.move_count += 1;
        record.last_activity_time = now;
        Ok(Receipt::events(vec![EscrowEvent::MoveRecorded {
            room_id: record.room_id.clone(),
            mover: caller,
            move_count: record.move_count,
            label: label.to_string(),
            fingerprint,
            timestamp: now,
        }]))
    }

    /// Declares the result and distributes the pot.
    ///
    /// A winner may only be declared by the resigning opponent or by the
    /// winner claiming on time; a draw requires agreement or stalemate.
    ///
    /// # Errors
    ///
    /// `GameNotActive`, `UnauthorizedParticipant`, or `InvalidOutcome`
    /// when the (outcome, reason, declarer) triple is inconsistent.
    pub fn declare_result(
        &mut self,
        caller: PartyId,
        outcome: Outcome,
        reason: EndReason,
        now: i64,
    ) -> Result<Receipt> {
        if self.record.phase != Phase::Active {
            return Err(EscrowError::GameNotActive);
        }
        let declarer = self
            .record
            .side_of(caller)
            .ok_or(EscrowError::UnauthorizedParticipant)?;
        validate_declaration(declarer, outcome, reason)?;
        self.settle(outcome, reason, now)
    }

    /// Settles an abandoned match. Callable by anyone once the inactivity
    /// window has lapsed; the party on turn forfeits.
    ///
    /// The winner is computed from the turn parity, never taken from the
    /// caller.
    ///
    /// # Errors
    ///
    /// `GameNotActive`, or `TimeNotExceeded` while the window is still
    /// open (retryable later).
    pub fn force_timeout(&mut self, now: i64) -> Result<Receipt> {
        if self.record.phase != Phase::Active {
            return Err(EscrowError::GameNotActive);
        }
        if now - self.record.last_activity_time <= self.record.time_limit {
            return Err(EscrowError::TimeNotExceeded);
        }
        let outcome = match self.record.side_to_move() {
            Side::A => Outcome::WinnerB,
            Side::B => Outcome::WinnerA,
        };
        self.settle(outcome, EndReason::Timeout, now)
    }

    /// Cancels an unstarted match and refunds whoever deposited.
    ///
    /// # Errors
    ///
    /// `CannotCancelStartedGame` once active or ended,
    /// `UnauthorizedParticipant` for a third party.
    pub fn cancel(&mut self, caller: PartyId) -> Result<Receipt> {
        let record = &mut self.record;
        match record.phase {
            Phase::AwaitingOpponent | Phase::AwaitingDeposits => {}
            _ => return Err(EscrowError::CannotCancelStartedGame),
        }
        record
            .side_of(caller)
            .ok_or(EscrowError::UnauthorizedParticipant)?;

        let mut refunds = Vec::new();
        if record.deposited_a {
            refunds.push(Transfer {
                to: record.participant_a,
                amount: record.stake_amount,
            });
        }
        if record.deposited_b {
            if let Some(participant_b) = record.participant_b {
                refunds.push(Transfer {
                    to: participant_b,
                    amount: record.stake_amount,
                });
            }
        }

        self.vault.drain();
        record.phase = Phase::Cancelled;
        Ok(Receipt {
            events: vec![EscrowEvent::Cancelled {
                room_id: record.room_id.clone(),
                cancelled_by: caller,
            }],
            transfers: refunds,
        })
    }

    // Shared by `declare_result` and `force_timeout`. The plan is computed
    // before any mutation; the vault drain and the phase flip then happen
    // together.
    fn settle(&mut self, outcome: Outcome, reason: EndReason, now: i64) -> Result<Receipt> {
        let plan = Settlement::compute(self.vault.balance(), self.record.fee_rate_bps, outcome)?;
        let record = &mut self.record;
        let participant_b = record.participant_b.ok_or(EscrowError::GameNotActive)?;
        let transfers = plan.transfers(record.participant_a, participant_b, record.fee_collector);

        self.vault.drain();
        record.outcome = outcome;
        record.phase = Phase::Settled;
        record.settled_time = now;
        Ok(Receipt {
            events: vec![EscrowEvent::Settled {
                room_id: record.room_id.clone(),
                outcome,
                reason,
                settled_time: now,
            }],
            transfers,
        })
    }
}

fn validate_declaration(declarer: Side, outcome: Outcome, reason: EndReason) -> Result<()> {
    let valid = match outcome {
        Outcome::Undetermined => false,
        Outcome::WinnerA => matches!(
            (reason, declarer),
            (EndReason::Resignation, Side::B) | (EndReason::Timeout, Side::A)
        ),
        Outcome::WinnerB => matches!(
            (reason, declarer),
            (EndReason::Resignation, Side::A) | (EndReason::Timeout, Side::B)
        ),
        Outcome::Draw => matches!(reason, EndReason::Agreement | EndReason::Stalemate),
    };
    if valid {
        Ok(())
    } else {
        Err(EscrowError::InvalidOutcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_err;

    fn alice() -> PartyId {
        PartyId::from_seed("alice")
    }

    fn bob() -> PartyId {
        PartyId::from_seed("bob")
    }

    fn config() -> EscrowConfig {
        EscrowConfig::new(PartyId::from_seed("collector"))
    }

    fn active_escrow() -> Escrow {
        let (mut escrow, _) = Escrow::open(&config(), "R1", alice(), 100, Some(300), 0).unwrap();
        escrow.join(bob(), 1).unwrap();
        escrow.deposit(alice(), 2).unwrap();
        escrow.deposit(bob(), 3).unwrap();
        escrow
    }

    #[test]
    fn open_validates_inputs() {
        let long_id = "x".repeat(33);
        assert_err(
            Escrow::open(&config(), long_id, alice(), 100, None, 0),
            EscrowError::RoomIdTooLong(33),
        );
        assert_err(
            Escrow::open(&config(), "R1", alice(), 0, None, 0),
            EscrowError::InvalidStakeAmount(0),
        );
        assert_err(
            Escrow::open(&config(), "R1", alice(), 100, Some(0), 0),
            EscrowError::InvalidTimeLimit(0),
        );
    }

    #[test]
    fn stake_bounds_enforced() {
        let cfg = EscrowConfig {
            min_stake: 50,
            max_stake: 500,
            ..config()
        };
        assert_err(
            Escrow::open(&cfg, "R1", alice(), 49, None, 0),
            EscrowError::InvalidStakeAmount(49),
        );
        assert!(Escrow::open(&cfg, "R1", alice(), 500, None, 0).is_ok());
    }

    #[test]
    fn creator_cannot_join_own_room() {
        let (mut escrow, _) = Escrow::open(&config(), "R1", alice(), 100, None, 0).unwrap();
        assert_err(escrow.join(alice(), 1), EscrowError::CannotPlayAgainstSelf);
    }

    #[test]
    fn creator_may_deposit_before_join() {
        let (mut escrow, _) = Escrow::open(&config(), "R1", alice(), 100, None, 0).unwrap();
        escrow.deposit(alice(), 1).unwrap();
        assert_eq!(escrow.record.phase, Phase::AwaitingOpponent);
        assert_eq!(escrow.vault.balance(), 100);

        escrow.join(bob(), 2).unwrap();
        escrow.deposit(bob(), 3).unwrap();
        assert_eq!(escrow.record.phase, Phase::Active);
        assert_eq!(escrow.vault.balance(), 200);
    }

    #[test]
    fn double_deposit_rejected_without_balance_change() {
        let (mut escrow, _) = Escrow::open(&config(), "R1", alice(), 100, None, 0).unwrap();
        escrow.join(bob(), 1).unwrap();
        escrow.deposit(alice(), 2).unwrap();
        assert_err(escrow.deposit(alice(), 3), EscrowError::AlreadyDeposited);
        assert_eq!(escrow.vault.balance(), 100);
        assert_eq!(escrow.record.total_deposited, 100);
    }

    #[test]
    fn outsider_cannot_deposit() {
        let (mut escrow, _) = Escrow::open(&config(), "R1", alice(), 100, None, 0).unwrap();
        escrow.join(bob(), 1).unwrap();
        assert_err(
            escrow.deposit(PartyId::from_seed("mallory"), 2),
            EscrowError::UnauthorizedParticipant,
        );
    }

    #[test]
    fn turn_order_follows_parity() {
        let mut escrow = active_escrow();
        assert_eq!(escrow.record.expected_mover(), Some(alice()));

        escrow.record_move(alice(), "e4", [1; 32], 4).unwrap();
        assert_eq!(escrow.record.expected_mover(), Some(bob()));
        assert_err(
            escrow.record_move(alice(), "d4", [2; 32], 5),
            EscrowError::NotYourTurn,
        );

        escrow.record_move(bob(), "e5", [3; 32], 5).unwrap();
        assert_eq!(escrow.record.move_count, 2);
        assert_eq!(escrow.record.expected_mover(), Some(alice()));
    }

    #[test]
    fn move_label_limit() {
        let mut escrow = active_escrow();
        assert_err(
            escrow.record_move(alice(), "a-very-long-label", [0; 32], 4),
            EscrowError::MoveLabelTooLong(17),
        );
        assert_eq!(escrow.record.move_count, 0);
    }

    #[test]
    fn move_after_window_rejected() {
        let mut escrow = active_escrow();
        // started at t=3, limit 300
        assert_err(
            escrow.record_move(alice(), "e4", [0; 32], 304),
            EscrowError::MoveTimeExceeded,
        );
        assert!(escrow.record_move(alice(), "e4", [0; 32], 303).is_ok());
    }

    #[test]
    fn declarer_rules() {
        // winner declared by the resigning opponent
        let mut escrow = active_escrow();
        assert_err(
            escrow.declare_result(alice(), Outcome::WinnerA, EndReason::Resignation, 4),
            EscrowError::InvalidOutcome,
        );
        assert_eq!(escrow.record.phase, Phase::Active);
        escrow
            .declare_result(bob(), Outcome::WinnerA, EndReason::Resignation, 4)
            .unwrap();

        // or by the winner claiming on time
        let mut escrow = active_escrow();
        escrow
            .declare_result(alice(), Outcome::WinnerA, EndReason::Timeout, 4)
            .unwrap();

        // draw requires agreement or stalemate
        let mut escrow = active_escrow();
        assert_err(
            escrow.declare_result(alice(), Outcome::Draw, EndReason::Resignation, 4),
            EscrowError::InvalidOutcome,
        );
        escrow
            .declare_result(alice(), Outcome::Draw, EndReason::Agreement, 4)
            .unwrap();

        // undetermined is never declarable
        let mut escrow = active_escrow();
        assert_err(
            escrow.declare_result(alice(), Outcome::Undetermined, EndReason::Agreement, 4),
            EscrowError::InvalidOutcome,
        );
    }

    #[test]
    fn timeout_forfeits_party_on_turn() {
        // move_count 0: A to move, so A forfeits
        let mut escrow = active_escrow();
        assert_err(escrow.force_timeout(300), EscrowError::TimeNotExceeded);
        let receipt = escrow.force_timeout(304).unwrap();
        assert_eq!(escrow.record.outcome, Outcome::WinnerB);
        assert_eq!(escrow.vault.balance(), 0);
        assert!(receipt.transfers.iter().any(|t| t.to == bob()));

        // after one move B is on turn, so A wins
        let mut escrow = active_escrow();
        escrow.record_move(alice(), "e4", [1; 32], 10).unwrap();
        escrow.force_timeout(311).unwrap();
        assert_eq!(escrow.record.outcome, Outcome::WinnerA);
    }

    #[test]
    fn terminal_phases_are_immutable() {
        let mut escrow = active_escrow();
        escrow
            .declare_result(bob(), Outcome::WinnerA, EndReason::Resignation, 4)
            .unwrap();
        let settled = escrow.clone();

        assert_err(
            escrow.join(PartyId::from_seed("eve"), 5),
            EscrowError::GameNotWaitingForPlayers,
        );
        assert_err(escrow.deposit(alice(), 5), EscrowError::InvalidPhaseForDeposit);
        assert_err(
            escrow.record_move(alice(), "e4", [0; 32], 5),
            EscrowError::GameNotActive,
        );
        assert_err(
            escrow.declare_result(alice(), Outcome::WinnerB, EndReason::Resignation, 5),
            EscrowError::GameNotActive,
        );
        assert_err(escrow.force_timeout(1_000), EscrowError::GameNotActive);
        assert_err(escrow.cancel(alice()), EscrowError::CannotCancelStartedGame);

        // nothing moved
        assert_eq!(escrow, settled);
    }

    #[test]
    fn cancel_refunds_only_depositors() {
        let (mut escrow, _) = Escrow::open(&config(), "R1", alice(), 100, None, 0).unwrap();
        escrow.join(bob(), 1).unwrap();
        escrow.deposit(alice(), 2).unwrap();

        let receipt = escrow.cancel(bob()).unwrap();
        assert_eq!(escrow.record.phase, Phase::Cancelled);
        assert_eq!(escrow.vault.balance(), 0);
        assert_eq!(
            receipt.transfers,
            vec![Transfer {
                to: alice(),
                amount: 100
            }]
        );
    }

    #[test]
    fn cancel_rejected_once_active() {
        let mut escrow = active_escrow();
        assert_err(escrow.cancel(alice()), EscrowError::CannotCancelStartedGame);
        assert_eq!(escrow.vault.balance(), 200);
    }
}
