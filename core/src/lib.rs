//! Escrowed stakes and atomic settlement for two-party wagered matches.
//!
//! Each room pairs an [`EscrowRecord`] with a custodial [`Vault`]; the
//! record's lifecycle state machine decides who may move funds and when,
//! and every accepted operation lands on an append-only audit stream.
//! Move legality, identity verification, and real fund movement belong to
//! the host; the core validates phases, turns, and amounts, and hands back
//! [`Transfer`] instructions.

/// Fixed per-deployment configuration
pub mod config;
/// Escrow record model and lifecycle state machine
pub mod escrow;
/// Append-only audit events, including the externalized move log
pub mod event;
/// Identities of participants and the fee collector
pub mod identity;
/// Validated config loading and room snapshot files
pub mod interface;
/// Keyed registry of escrows with per-room serialization
pub mod ledger;
/// Fee computation and payout distribution
pub mod settlement;
/// Test-support assertions
pub mod utils;
/// Custodial balances and payout instructions
pub mod vault;

pub mod error;
pub use error::{EscrowError, IdentityError};

pub use config::{EscrowConfig, DEFAULT_FEE_RATE_BPS, DEFAULT_TIME_LIMIT_SECS};
pub use escrow::{
    EndReason, Escrow, EscrowRecord, Outcome, Phase, Receipt, MAX_MOVE_LABEL_BYTES,
    MAX_ROOM_ID_BYTES,
};
pub use event::EscrowEvent;
pub use identity::PartyId;
pub use ledger::{EscrowLedger, RoomSnapshot};
pub use settlement::Settlement;
pub use vault::{Transfer, Vault};

pub type Result<T> = std::result::Result<T, EscrowError>;
