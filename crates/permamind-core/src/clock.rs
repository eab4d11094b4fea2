use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::MemoryError;
use crate::types::{EpochSeconds, Timestamp};

/// The current instant as a fixed-width RFC3339 UTC string (whole seconds,
/// `Z` suffix) — the calendar representation `Fact.created`/`last_confirmed`
/// and `Shard.timestamp` carry (§3). Fixed width keeps lexicographic string
/// ordering equivalent to chronological ordering.
pub fn now() -> Timestamp {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Converts a calendar timestamp to the decimal-epoch-seconds form the
/// ledger's `Timestamp` tag carries (§6). Only upload-time tagging needs
/// this conversion — everywhere else in the data model the calendar string
/// is the timestamp.
pub fn to_epoch_seconds(ts: &str) -> Result<EpochSeconds, MemoryError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.timestamp())
        .map_err(|e| MemoryError::Other(format!("invalid calendar timestamp {ts:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_round_trips_through_epoch_seconds() {
        let ts = now();
        assert!(ts.ends_with('Z'));
        assert!(to_epoch_seconds(&ts).unwrap() > 0);
    }

    #[test]
    fn known_instant_converts_to_known_epoch() {
        assert_eq!(to_epoch_seconds("2023-11-14T22:13:20Z").unwrap(), 1_700_000_000);
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        assert!(to_epoch_seconds("not-a-date").is_err());
    }
}
