pub mod memory;

use async_trait::async_trait;
use permamind_core::error::MemoryError;
use permamind_core::types::{Balance, Tag, TxId, TxMeta};

pub use memory::MemoryLedger;

/// Abstraction over a content-addressed permanent ledger (§4.7). The actual
/// transport client — signing and submitting transactions to a running
/// network — is a concrete collaborator outside this system's scope; this
/// trait only describes the shape every such client must expose.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Uploads `data` tagged with `tags`, returning the resulting transaction
    /// id once it is confirmed.
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<TxId, MemoryError>;

    /// Returns the wallet's spendable balance, human-readable plus an
    /// estimate of how many more free-budget uploads it can still fund.
    async fn balance(&self, wallet: &str) -> Result<Balance, MemoryError>;

    /// Returns transaction metadata (id plus tags) for every upload matching
    /// all of `tags`, newest first.
    async fn query_by_tags(&self, tags: Vec<Tag>) -> Result<Vec<TxMeta>, MemoryError>;

    /// Fetches the raw blob for a previously uploaded transaction.
    async fn fetch_blob(&self, tx_id: &TxId) -> Result<Vec<u8>, MemoryError>;
}
