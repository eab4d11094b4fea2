use std::path::Path;

use sled::transaction::{ConflictableTransactionResult, TransactionError};
use tracing::debug;

use permamind_core::error::MemoryError;
use permamind_core::types::{Fact, PendingDeletion, Timestamp};

fn storage_err(e: impl std::fmt::Display) -> MemoryError {
    MemoryError::Storage(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> MemoryError {
    MemoryError::Serialization(e.to_string())
}

/// Embedded single-file transactional store (§4.5). Named trees:
///
///   facts           — key utf8 bytes → json(Fact), unique on `key`
///   pending_deletes — key utf8 bytes → json(PendingDeletion)
///   meta            — utf8 key bytes → raw bytes
///
/// Every mutating method below is a single sled transaction, matching the
/// ordering guarantee in SPEC_FULL §5 that `upsert`/`delete`/`set_meta`/
/// `clear_dirty` are each one atomic unit.
pub struct LocalStore {
    db: sled::Db,
    facts: sled::Tree,
    pending_deletes: sled::Tree,
    meta: sled::Tree,
}

impl LocalStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MemoryError> {
        let db = sled::open(path).map_err(storage_err)?;
        let facts = db.open_tree("facts").map_err(storage_err)?;
        let pending_deletes = db.open_tree("pending_deletes").map_err(storage_err)?;
        let meta = db.open_tree("meta").map_err(storage_err)?;
        Ok(Self {
            db,
            facts,
            pending_deletes,
            meta,
        })
    }

    pub fn flush(&self) -> Result<(), MemoryError> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }

    // ── Facts ────────────────────────────────────────────────────────────────

    /// Inserts or overwrites a fact, forcing `dirty = true`, and atomically
    /// removes any tombstone for the same key (§4.5).
    pub fn upsert_fact(&self, mut fact: Fact) -> Result<(), MemoryError> {
        fact.dirty = true;
        let key = fact.key.clone();
        let bytes = serde_json::to_vec(&fact).map_err(ser_err)?;

        (&self.facts, &self.pending_deletes)
            .transaction(|(facts, pending)| -> ConflictableTransactionResult<(), MemoryError> {
                facts.insert(key.as_bytes(), bytes.clone())?;
                pending.remove(key.as_bytes())?;
                Ok(())
            })
            .map_err(tx_err)
    }

    /// Removes the row for `key` and inserts a tombstone, but only if the row
    /// existed (§4.5, §8 boundary: delete of a non-existent key is a no-op).
    pub fn delete_fact(&self, key: &str, deleted_at: Timestamp) -> Result<(), MemoryError> {
        let tombstone = PendingDeletion {
            key: key.to_string(),
            deleted_at,
        };
        let bytes = serde_json::to_vec(&tombstone).map_err(ser_err)?;

        (&self.facts, &self.pending_deletes)
            .transaction(|(facts, pending)| -> ConflictableTransactionResult<(), MemoryError> {
                if facts.remove(key.as_bytes())?.is_some() {
                    pending.insert(key.as_bytes(), bytes.clone())?;
                } else {
                    debug!(key, "delete_fact: no such key, tombstone not created");
                }
                Ok(())
            })
            .map_err(tx_err)
    }

    pub fn get_fact(&self, key: &str) -> Result<Option<Fact>, MemoryError> {
        match self.facts.get(key.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    /// All facts, sorted by `last_confirmed` descending for determinism
    /// (§4.5).
    pub fn list_all(&self) -> Result<Vec<Fact>, MemoryError> {
        let mut facts = self.collect_facts()?;
        facts.sort_by(|a, b| b.last_confirmed.cmp(&a.last_confirmed));
        Ok(facts)
    }

    /// Facts where `scope == s` or `scope == "global"`, same ordering as
    /// [`list_all`].
    pub fn list_by_scope(&self, scope: &str) -> Result<Vec<Fact>, MemoryError> {
        let mut facts: Vec<Fact> = self
            .collect_facts()?
            .into_iter()
            .filter(|f| f.scope == scope || f.scope == "global")
            .collect();
        facts.sort_by(|a, b| b.last_confirmed.cmp(&a.last_confirmed));
        Ok(facts)
    }

    /// All facts with `dirty = true`.
    pub fn get_dirty(&self) -> Result<Vec<Fact>, MemoryError> {
        Ok(self
            .collect_facts()?
            .into_iter()
            .filter(|f| f.dirty)
            .collect())
    }

    pub fn get_pending_deletes(&self) -> Result<Vec<PendingDeletion>, MemoryError> {
        let mut out = Vec::new();
        for item in self.pending_deletes.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(serde_json::from_slice(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    /// Sets `dirty = false` on every fact and empties `pending_deletes`.
    /// Called once a push has fully succeeded (§4.8.2 step 5).
    pub fn clear_dirty(&self) -> Result<(), MemoryError> {
        let dirty_keys: Vec<(String, Vec<u8>)> = self
            .collect_facts()?
            .into_iter()
            .filter(|f| f.dirty)
            .map(|mut f| {
                f.dirty = false;
                let key = f.key.clone();
                let bytes = serde_json::to_vec(&f).expect("Fact serialization is infallible");
                (key, bytes)
            })
            .collect();

        (&self.facts, &self.pending_deletes)
            .transaction(|(facts, pending)| -> ConflictableTransactionResult<(), MemoryError> {
                for (key, bytes) in &dirty_keys {
                    facts.insert(key.as_bytes(), bytes.clone())?;
                }
                pending.clear()?;
                Ok(())
            })
            .map_err(tx_err)
    }

    pub fn increment_access_count(&self, key: &str) -> Result<(), MemoryError> {
        let Some(mut fact) = self.get_fact(key)? else {
            return Ok(());
        };
        fact.access_count += 1;
        let bytes = serde_json::to_vec(&fact).map_err(ser_err)?;
        self.facts
            .insert(key.as_bytes(), bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    fn collect_facts(&self) -> Result<Vec<Fact>, MemoryError> {
        let mut out = Vec::new();
        for item in self.facts.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(serde_json::from_slice(&bytes).map_err(ser_err)?);
        }
        Ok(out)
    }

    // ── Meta ──────────────────────────────────────────────────────────────────

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), MemoryError> {
        self.meta
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>, MemoryError> {
        match self.meta.get(key.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(
                String::from_utf8(bytes.to_vec()).map_err(|e| MemoryError::Other(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    pub fn get_meta_u64(&self, key: &str) -> Result<Option<u64>, MemoryError> {
        match self.get_meta(key)? {
            Some(s) => Ok(Some(
                s.parse().map_err(|e: std::num::ParseIntError| MemoryError::Other(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    pub fn set_meta_u64(&self, key: &str, value: u64) -> Result<(), MemoryError> {
        self.set_meta(key, &value.to_string())
    }
}

fn tx_err(e: TransactionError<MemoryError>) -> MemoryError {
    match e {
        TransactionError::Abort(inner) => inner,
        TransactionError::Storage(e) => storage_err(e),
    }
}
