//! ─── Protocol constants ──────────────────────────────────────────────────────
//!
//! Bit-exact values named by the sync protocol: key-derivation domain strings,
//! tag names, and the defaults backing `SyncConfig` (see `config.rs` for the
//! overridable surface — these are the shipped defaults, not hard limits).

/// HKDF salt for deriving the secp256k1 private key from a recovery phrase.
pub const IDENTITY_HKDF_SALT: &str = "permamind-identity-v1";

/// HKDF info string for the same derivation.
pub const IDENTITY_HKDF_INFO: &str = "secp256k1-private-key";

/// Length in bytes of the derived secp256k1 private key.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length in bytes of the wallet identifier (before hex encoding).
pub const WALLET_ID_LEN: usize = 20;

/// Length in bytes of the random salt consumed by the password-hash KDF.
pub const SALT_LEN: usize = 16;

/// Length in bytes of the AEAD nonce.
pub const NONCE_LEN: usize = 12;

/// Length in bytes of the AEAD authentication tag.
pub const TAG_LEN: usize = 16;

/// Constant per-message overhead of the cipher: nonce + tag.
pub const CIPHER_OVERHEAD_BYTES: usize = NONCE_LEN + TAG_LEN;

/// Length in bytes of a recoverable ECDSA signature (r || s || recovery_id).
pub const SIGNATURE_LEN: usize = 65;

/// Number of words in the recovery phrase.
pub const PHRASE_WORD_COUNT: usize = 12;

/// Size of the fixed English wordlist the phrase is drawn from.
pub const WORDLIST_SIZE: usize = 2048;

/// Entropy bits drawn per phrase (before the checksum is appended).
pub const PHRASE_ENTROPY_BITS: usize = 128;

/// Checksum bits appended to the entropy before slicing into word indices.
pub const PHRASE_CHECKSUM_BITS: usize = 4;

// ── Ledger tag names (bit-exact, see SPEC_FULL §6) ───────────────────────────

pub const TAG_APP_NAME: &str = "App-Name";
pub const TAG_WALLET: &str = "Wallet";
pub const TAG_CONTENT_TYPE: &str = "Content-Type";
pub const TAG_TIMESTAMP: &str = "Timestamp";
pub const TAG_SIGNATURE: &str = "Signature";
pub const TAG_TYPE: &str = "Type";
pub const TAG_VERSION: &str = "Version";
pub const TAG_SALT: &str = "Salt";
pub const TAG_CLIENT: &str = "Client";
pub const TAG_PROJECT: &str = "Project";
pub const TAG_SESSION: &str = "Session";
pub const TAG_OFFSET: &str = "Offset";
pub const TAG_COUNT: &str = "Count";
pub const TAG_CHUNK: &str = "Chunk";

pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

pub const TYPE_DELTA: &str = "delta";
pub const TYPE_SNAPSHOT: &str = "snapshot";
pub const TYPE_IDENTITY: &str = "identity";
pub const TYPE_CONVERSATION: &str = "conversation";

pub const CLIENT_CURSOR: &str = "cursor";
pub const CLIENT_CLAUDE_CODE: &str = "claude-code";

// ── On-disk file names (relative to the application home directory) ────────

pub const SALT_FILE_NAME: &str = "salt";
pub const IDENTITY_FILE_NAME: &str = "identity.enc";

// ── SyncConfig defaults ───────────────────────────────────────────────────────

/// Free-upload budget: 90 KiB. Open question in the Design Notes resolved by
/// making this a `SyncConfig` field rather than a literal baked into the
/// chunker; this is the shipped default.
pub const DEFAULT_FREE_UPLOAD_BUDGET_BYTES: usize = 92_160;

/// Pull-side defensive cap on a single data shard fetch: 100 KiB.
pub const DEFAULT_DATA_SHARD_MAX_BYTES: usize = 102_400;

/// Pull-side defensive cap on an identity record fetch: 16 KiB.
pub const DEFAULT_IDENTITY_MAX_BYTES: usize = 16_384;

/// Fact-sync ticker period (seconds).
pub const DEFAULT_FACT_SYNC_PERIOD_SECS: u64 = 60;

/// Conversation watcher ticker period (seconds).
pub const DEFAULT_CONVERSATION_WATCH_PERIOD_SECS: u64 = 30;

/// Memory-hard password hash parameters (Argon2): time cost (passes).
pub const DEFAULT_KDF_TIME_COST: u32 = 3;

/// Memory-hard password hash parameters: memory cost in KiB (~64 MiB).
pub const DEFAULT_KDF_MEMORY_KIB: u32 = 65_536;

/// Memory-hard password hash parameters: degree of parallelism.
pub const DEFAULT_KDF_PARALLELISM: u32 = 1;

/// Output key length of the memory-hard password hash (bytes).
pub const DEFAULT_KDF_OUTPUT_LEN: usize = 32;

/// Default `App-Name` tag value.
pub const DEFAULT_APP_NAME: &str = "permamind";
