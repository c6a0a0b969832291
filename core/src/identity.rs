//! Identities of parties participating in an escrow.

use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;
use sha2::{Digest, Sha256};

use crate::error::IdentityError;

/// Verified identity of an escrow participant or fee collector.
///
/// The identity/signing layer resolves every caller to a `PartyId` before an
/// operation reaches the core; the core never verifies signatures itself and
/// only compares identities for equality.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartyId(#[serde_as(as = "Hex")] [u8; 32]);

impl PartyId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derives an identity hash from arbitrary seed material.
    pub fn from_seed(seed: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(seed.as_ref()).into())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::str::FromStr for PartyId {
    type Err = IdentityError;

    /// Parses an identity from hex (with or without `0x`), base58, or
    /// base64. The decoded value must be exactly 32 bytes.
    ///
    /// # Errors
    ///
    /// Returns an `IdentityError` on empty input, undecodable input, or a
    /// decoded length other than 32 bytes.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        use base64::Engine as _;

        if s.is_empty() {
            return Err(IdentityError::EmptyIdentity);
        }

        let bytes = if let Some(stripped) = s.strip_prefix("0x") {
            hex::decode(stripped)?
        } else if s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            hex::decode(s)?
        } else if let Ok(decoded) = bs58::decode(s).into_vec() {
            decoded
        } else if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(s) {
            decoded
        } else {
            return Err(IdentityError::UnsupportedFormat);
        };

        let len = bytes.len();
        let id: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength(len))?;
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr as _;

    use super::*;

    #[test]
    fn parse_hex() {
        let id = PartyId::from_seed("alice");
        let parsed = PartyId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);

        let prefixed = format!("0x{}", id);
        assert_eq!(PartyId::from_str(&prefixed).unwrap(), id);
    }

    #[test]
    fn parse_base58_and_base64() {
        use base64::Engine as _;

        let id = PartyId::from_seed("bob");
        let b58 = bs58::encode(id.as_bytes()).into_string();
        assert_eq!(PartyId::from_str(&b58).unwrap(), id);

        let b64 = base64::engine::general_purpose::STANDARD.encode(id.as_bytes());
        assert_eq!(PartyId::from_str(&b64).unwrap(), id);
    }

    #[test]
    fn reject_bad_input() {
        assert_eq!(
            PartyId::from_str("").unwrap_err(),
            IdentityError::EmptyIdentity
        );
        // valid hex, wrong length
        assert_eq!(
            PartyId::from_str("0xdeadbeef").unwrap_err(),
            IdentityError::InvalidLength(4)
        );
    }

    #[test]
    fn json_round_trip() {
        let id = PartyId::from_seed("carol");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: PartyId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
