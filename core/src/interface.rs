//! File interface for hosts: validated configuration loading and room
//! snapshots persisted across restarts.

use std::fs::File;
use std::path::Path;

use anyhow::Context;

use crate::ledger::RoomSnapshot;
use crate::EscrowConfig;

/// Reads an [`EscrowConfig`] from a JSON file and validates it.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be read or parsed, or if
/// the config fails [`EscrowConfig::validate`].
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<EscrowConfig> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading escrow config {path:?}"))?;
    let config: EscrowConfig =
        serde_json::from_str(&content).with_context(|| format!("parsing escrow config {path:?}"))?;
    config
        .validate()
        .with_context(|| format!("invalid escrow config in {path:?}"))?;
    Ok(config)
}

/// Writes a room snapshot as pretty-printed JSON.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or the snapshot
/// cannot be serialized.
pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &RoomSnapshot) -> anyhow::Result<()> {
    let path = path.as_ref();
    let room_id = &snapshot.escrow.record.room_id;
    let file = File::create(path).with_context(|| format!("creating snapshot file {path:?}"))?;
    serde_json::to_writer_pretty(file, snapshot)
        .with_context(|| format!("serializing room {room_id} to {path:?}"))
}

/// Reads a room snapshot back, ready for
/// [`EscrowLedger::restore`](crate::EscrowLedger::restore).
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be read or parsed.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> anyhow::Result<RoomSnapshot> {
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading snapshot {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("parsing snapshot {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EscrowConfig, EscrowLedger, PartyId};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("wagerlock-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn loaded_config_is_validated_and_usable() {
        let path = temp_path("config");
        let config = EscrowConfig::new(PartyId::from_seed("collector"));
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, config);
        EscrowLedger::new(loaded).unwrap();

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn inconsistent_config_rejected_at_load() {
        let path = temp_path("bad-config");
        let config = EscrowConfig {
            fee_rate_bps: 10_001,
            ..EscrowConfig::new(PartyId::from_seed("collector"))
        };
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert!(load_config(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(temp_path("missing")).is_err());
        assert!(load_snapshot(temp_path("missing")).is_err());
    }
}
