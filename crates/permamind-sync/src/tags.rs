use permamind_core::clock::to_epoch_seconds;
use permamind_core::constants::*;
use permamind_core::error::MemoryError;
use permamind_core::types::{EpochSeconds, Tag, Timestamp, WalletId};

/// Tags common to every upload (§6): `App-Name`, `Wallet`, `Content-Type`,
/// `Timestamp`, `Signature`. The `Timestamp` tag is the decimal-epoch-seconds
/// form of `timestamp`, derived here — the only place a calendar timestamp
/// is turned into the ledger's integer representation.
pub fn common_tags(app_name: &str, wallet: &WalletId, timestamp: &Timestamp, signature_hex: &str) -> Result<Vec<Tag>, MemoryError> {
    Ok(vec![
        Tag::new(TAG_APP_NAME, app_name),
        Tag::new(TAG_WALLET, wallet.to_hex()),
        Tag::new(TAG_CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM),
        Tag::new(TAG_TIMESTAMP, to_epoch_seconds(timestamp)?.to_string()),
        Tag::new(TAG_SIGNATURE, signature_hex),
    ])
}

pub fn parse_u64_tag(tags: &[Tag], name: &str) -> Option<u64> {
    tags.iter().find(|t| t.name == name)?.value.parse().ok()
}

pub fn parse_i64_tag(tags: &[Tag], name: &str) -> Option<EpochSeconds> {
    tags.iter().find(|t| t.name == name)?.value.parse().ok()
}

pub fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter().find(|t| t.name == name).map(|t| t.value.as_str())
}

/// Parses a `Chunk` tag value of the form `<i>/<N>`.
pub fn parse_chunk_tag(value: &str) -> Option<(u64, u64)> {
    let (i, n) = value.split_once('/')?;
    Some((i.parse().ok()?, n.parse().ok()?))
}
