use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::WALLET_ID_LEN;
use crate::error::MemoryError;

/// A fixed-width RFC3339 UTC calendar string (§3), e.g. `2023-11-14T22:13:20Z`.
/// This is the representation every `Fact`/`Shard`/conversation timestamp
/// uses; the ledger's decimal `Timestamp` tag is derived from it at upload
/// time only (see [`crate::clock::to_epoch_seconds`]).
pub type Timestamp = String;

/// Seconds since the Unix epoch, decimal-encoded. Used solely for the
/// ledger's `Timestamp` tag and for sorting by it — never stored on a
/// `Fact`, `Shard`, or conversation value.
pub type EpochSeconds = i64;

/// Monotonically increasing shard sequence number, starting at 1.
pub type ShardVersion = u64;

// ── WalletId ─────────────────────────────────────────────────────────────────

/// 20-byte wallet identifier: `last_20_bytes(keccak256(pubkey.x || pubkey.y))`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletId(pub [u8; WALLET_ID_LEN]);

impl WalletId {
    pub fn from_bytes(b: [u8; WALLET_ID_LEN]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; WALLET_ID_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex, as required by the `Wallet` tag (§6).
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, MemoryError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| MemoryError::Other(format!("invalid wallet id hex: {e}")))?;
        if bytes.len() != WALLET_ID_LEN {
            return Err(MemoryError::Other(format!(
                "invalid wallet id length: expected {WALLET_ID_LEN}, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; WALLET_ID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Case-insensitive comparison against the expected identifier, as used
    /// during signature verification (§4.3).
    pub fn eq_ignore_case(&self, other: &WalletId) -> bool {
        self.0 == other.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletId({})", self.to_hex())
    }
}

// ── RecoverableSignature ─────────────────────────────────────────────────────

/// 65-byte recoverable ECDSA signature (`r || s || recovery_id`), hex-encoded
/// with a `0x` prefix at the wire boundary.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, MemoryError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| MemoryError::Other(format!("invalid signature hex: {e}")))?;
        if bytes.len() != 65 {
            return Err(MemoryError::Other(format!(
                "invalid signature length: expected 65, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 65];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({}…)", &self.to_hex()[..10])
    }
}

// ── Fact ──────────────────────────────────────────────────────────────────────

/// A single piece of structured memory (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub scope: String,
    pub key: String,
    pub value: String,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub source_session: Option<String>,
    pub created: Timestamp,
    pub last_confirmed: Timestamp,
    pub access_count: u64,
    /// Local-only: true when not yet persisted to the ledger in this form.
    /// Never serialized into a shard operation — see [`fact_to_upsert_op`] in
    /// the shard crate, which strips it.
    #[serde(default)]
    pub dirty: bool,
}

/// A tombstone recording that a present fact was deleted (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingDeletion {
    pub key: String,
    pub deleted_at: Timestamp,
}

// ── Shard operations ──────────────────────────────────────────────────────────

/// One mutation carried inside a shard (§3). Closed, tagged variants per the
/// Design Notes guidance against dynamic JSON shapes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ShardOperation {
    Upsert {
        key: String,
        value: String,
        tags: Vec<String>,
        scope: String,
        confidence: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        fact_id: Option<String>,
    },
    Delete {
        key: String,
    },
}

impl ShardOperation {
    pub fn key(&self) -> &str {
        match self {
            ShardOperation::Upsert { key, .. } => key,
            ShardOperation::Delete { key } => key,
        }
    }
}

/// An immutable, versioned batch of operations (§3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    pub shard_version: ShardVersion,
    pub timestamp: Timestamp,
    pub session_id: String,
    pub operations: Vec<ShardOperation>,
}

/// Which ledger `Type` tag a data shard was uploaded under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShardKind {
    Delta,
    Snapshot,
}

impl ShardKind {
    pub fn as_tag_value(&self) -> &'static str {
        match self {
            ShardKind::Delta => crate::constants::TYPE_DELTA,
            ShardKind::Snapshot => crate::constants::TYPE_SNAPSHOT,
        }
    }
}

// ── Identity record ───────────────────────────────────────────────────────────

/// The once-uploaded identity payload (§3). `encrypted_private_key` is the
/// `nonce || ciphertext || tag` cipher output; `salt` and `signature` travel
/// as ledger tags rather than inside the blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub encrypted_private_key: Vec<u8>,
    pub salt: [u8; crate::constants::SALT_LEN],
    pub signature: RecoverableSignature,
}

// ── Conversation model ────────────────────────────────────────────────────────

/// Which external transcript source a conversation came from (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Client {
    Cursor,
    ClaudeCode,
}

impl Client {
    pub fn as_tag_value(&self) -> &'static str {
        match self {
            Client::Cursor => crate::constants::CLIENT_CURSOR,
            Client::ClaudeCode => crate::constants::CLIENT_CLAUDE_CODE,
        }
    }
}

/// A single transcript message. The shape is intentionally minimal — the core
/// treats message bodies as opaque text; format-specific parsing is an
/// external collaborator's concern (§1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// An offset-tagged slice of a transcript, chunked into 1..N pieces at upload
/// (§3, §4.8.4).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationSegment {
    pub id: String,
    pub client: Client,
    pub project: String,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
    pub offset: u64,
    pub count: u64,
    pub messages: Vec<Message>,
}

/// A fully stitched conversation, assembled from one or more segments on pull
/// (§4.8.6).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub client: Client,
    pub project: String,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
    pub messages: Vec<Message>,
}

// ── Ledger-facing types ───────────────────────────────────────────────────────

/// A single `(name, value)` tag attached to an upload (§6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ledger transaction id, opaque to the core beyond round-tripping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata about a transaction discovered via `query_by_tags` (§4.7): enough
/// to decide fetch order without yet paying for the blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxMeta {
    pub tx_id: TxId,
    pub tags: Vec<Tag>,
}

impl TxMeta {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// Result of `balance()` (§4.7).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub human_readable: String,
    pub estimated_uploads_remaining: u64,
}
