use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use permamind_core::error::MemoryError;
use permamind_core::types::{Balance, Tag, TxId, TxMeta};

use crate::LedgerAdapter;

struct Entry {
    meta: TxMeta,
    blob: Vec<u8>,
}

/// In-process [`LedgerAdapter`] fixture for tests: holds uploads in memory,
/// assigns deterministic sequential tx ids, and answers tag queries by linear
/// scan. Never persists anything and is not meant for production use (§4.13).
pub struct MemoryLedger {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerAdapter for MemoryLedger {
    async fn upload(&self, data: Vec<u8>, tags: Vec<Tag>) -> Result<TxId, MemoryError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let tx_id = TxId(format!("mem-tx-{n:08}"));
        let meta = TxMeta {
            tx_id: tx_id.clone(),
            tags,
        };
        self.entries.lock().unwrap().push(Entry { meta, blob: data });
        Ok(tx_id)
    }

    async fn balance(&self, _wallet: &str) -> Result<Balance, MemoryError> {
        Ok(Balance {
            human_readable: "1.0".to_string(),
            estimated_uploads_remaining: 1_000,
        })
    }

    async fn query_by_tags(&self, tags: Vec<Tag>) -> Result<Vec<TxMeta>, MemoryError> {
        let entries = self.entries.lock().unwrap();
        let mut matches: Vec<TxMeta> = entries
            .iter()
            .filter(|e| {
                tags.iter()
                    .all(|want| e.meta.tags.iter().any(|have| have == want))
            })
            .map(|e| e.meta.clone())
            .collect();
        matches.reverse();
        Ok(matches)
    }

    async fn fetch_blob(&self, tx_id: &TxId) -> Result<Vec<u8>, MemoryError> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .find(|e| &e.meta.tx_id == tx_id)
            .map(|e| e.blob.clone())
            .ok_or_else(|| MemoryError::NetworkError(format!("no such tx: {tx_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_fetch_round_trip() {
        let ledger = MemoryLedger::new();
        let tags = vec![Tag::new("App-Name", "permamind")];
        let tx_id = ledger.upload(b"hello".to_vec(), tags).await.unwrap();
        let blob = ledger.fetch_blob(&tx_id).await.unwrap();
        assert_eq!(blob, b"hello");
    }

    #[tokio::test]
    async fn query_by_tags_matches_all_given_tags() {
        let ledger = MemoryLedger::new();
        ledger
            .upload(
                b"a".to_vec(),
                vec![Tag::new("Type", "delta"), Tag::new("Wallet", "0xabc")],
            )
            .await
            .unwrap();
        ledger
            .upload(b"b".to_vec(), vec![Tag::new("Type", "identity")])
            .await
            .unwrap();

        let found = ledger
            .query_by_tags(vec![Tag::new("Type", "delta")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn query_returns_newest_first() {
        let ledger = MemoryLedger::new();
        let tag = Tag::new("Type", "delta");
        let first = ledger.upload(b"1".to_vec(), vec![tag.clone()]).await.unwrap();
        let second = ledger.upload(b"2".to_vec(), vec![tag.clone()]).await.unwrap();

        let found = ledger.query_by_tags(vec![tag]).await.unwrap();
        assert_eq!(found[0].tx_id, second);
        assert_eq!(found[1].tx_id, first);
    }

    #[tokio::test]
    async fn fetch_unknown_tx_id_errors() {
        let ledger = MemoryLedger::new();
        let result = ledger.fetch_blob(&TxId("no-such-tx".to_string())).await;
        assert!(matches!(result, Err(MemoryError::NetworkError(_))));
    }
}
