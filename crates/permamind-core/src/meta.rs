//! Well-known `meta` table keys (§3, §4.5). Kept as plain string constants and
//! a tiny builder for the per-source conversation cursor key, rather than an
//! enum, since the table itself is an open-ended key/value store.

pub const META_CURRENT_VERSION: &str = "current_version";
pub const META_LAST_PUSHED_VERSION: &str = "last_pushed_version";
pub const META_WALLET_ADDRESS: &str = "wallet_address";
pub const META_IDENTITY_PUSHED: &str = "identity_pushed";

/// Builds the `conversation_offset:<client>:<session>` meta key for a watched
/// transcript source (§3).
pub fn conversation_offset_key(client: &str, session: &str) -> String {
    format!("conversation_offset:{client}:{session}")
}
