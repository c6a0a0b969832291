use thiserror::Error;

/// Escrow-related errors.
///
/// Every variant is rejected before any state mutation; an operation that
/// returns an error has changed nothing.
#[derive(Debug, Error, PartialEq)]
pub enum EscrowError {
    /// Room identifier exceeds the 32-byte limit.
    #[error("room id too long: {0} bytes (max 32)")]
    RoomIdTooLong(usize),

    /// Stake is zero or outside the configured bounds.
    #[error("invalid stake amount: {0}")]
    InvalidStakeAmount(u64),

    /// Time limit must be strictly positive.
    #[error("invalid time limit: {0}")]
    InvalidTimeLimit(i64),

    /// Fee rate above 100%.
    #[error("invalid fee rate: {0} bps")]
    InvalidFeeRate(u16),

    /// Move label exceeds the 10-byte limit.
    #[error("move label too long: {0} bytes (max 10)")]
    MoveLabelTooLong(usize),

    /// Caller is neither participant of the match.
    #[error("caller is not a participant")]
    UnauthorizedParticipant,

    /// The creator attempted to join their own room.
    #[error("cannot play against yourself")]
    CannotPlayAgainstSelf,

    /// Caller is a participant but it is the other side's turn.
    #[error("not the caller's turn")]
    NotYourTurn,

    /// Join attempted on a room that already has two participants
    /// or is past the pairing phase.
    #[error("match is not waiting for an opponent")]
    GameNotWaitingForPlayers,

    /// Deposit attempted once the match has started or ended.
    #[error("invalid phase for deposit")]
    InvalidPhaseForDeposit,

    /// This participant's stake is already in the vault.
    #[error("stake already deposited")]
    AlreadyDeposited,

    /// Operation requires an active match.
    #[error("match is not active")]
    GameNotActive,

    /// Cancellation is only valid before the match starts.
    #[error("cannot cancel a started match")]
    CannotCancelStartedGame,

    /// Inactivity window has not elapsed yet; retryable later.
    #[error("time limit not exceeded")]
    TimeNotExceeded,

    /// The mover let the inactivity window lapse; the move is refused
    /// and the match is now eligible for a forced timeout.
    #[error("move time limit exceeded")]
    MoveTimeExceeded,

    /// Declared outcome is absent or inconsistent with the declarer
    /// and end reason.
    #[error("invalid outcome declaration")]
    InvalidOutcome,

    /// Checked arithmetic overflowed while handling funds.
    #[error("amount overflow")]
    AmountOverflow,

    /// No escrow registered under this room id.
    #[error("unknown room: {0}")]
    RoomNotFound(String),

    /// An escrow already exists under this room id.
    #[error("room already exists: {0}")]
    RoomAlreadyExists(String),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

/// Errors that might occur while parsing a [`PartyId`](crate::PartyId).
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid base58: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot parse identity from empty string")]
    EmptyIdentity,

    #[error("identity must be 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("unsupported identity format")]
    UnsupportedFormat,
}
