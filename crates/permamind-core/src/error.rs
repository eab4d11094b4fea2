use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    // ── Lifecycle ────────────────────────────────────────────────────────────
    #[error("local state is absent; call init first")]
    Uninitialized,

    #[error("init attempted on an already-populated home directory")]
    AlreadyInitialized,

    // ── Phrase / identity ────────────────────────────────────────────────────
    #[error("bad recovery phrase: {0}")]
    BadPhrase(String),

    #[error("decryption of the identity payload failed (wrong passphrase)")]
    BadPassphrase,

    #[error("no identity record found for this wallet")]
    IdentityMissing,

    #[error("derived private key does not match the recovered identity record")]
    IdentityMismatch,

    #[error("no shard survived verification and decryption during recovery")]
    NoRecoverableShards,

    // ── Cipher / signatures ──────────────────────────────────────────────────
    #[error("authenticated decryption failed: ciphertext or tag does not match the key")]
    CipherTampered,

    #[error("operation of {size} bytes exceeds the free-upload budget of {budget} bytes")]
    ShardTooLarge { size: usize, budget: usize },

    // ── Ledger adapter ───────────────────────────────────────────────────────
    #[error("network error talking to the ledger adapter: {0}")]
    NetworkError(String),

    #[error("ledger rejected the request (quota, auth, or policy): {0}")]
    LedgerRejected(String),

    // ── Ambient leaves ───────────────────────────────────────────────────────
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for MemoryError {
    fn from(e: std::io::Error) -> Self {
        MemoryError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(e: serde_json::Error) -> Self {
        MemoryError::Serialization(e.to_string())
    }
}
