use std::sync::Arc;

use rand::RngCore;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use permamind_core::config::SyncConfig;
use permamind_core::constants::*;
use permamind_core::error::MemoryError;
use permamind_core::meta::{conversation_offset_key, META_CURRENT_VERSION, META_IDENTITY_PUSHED, META_LAST_PUSHED_VERSION};
use permamind_core::types::{Conversation, ConversationSegment, Shard, ShardKind, ShardVersion, Tag, Timestamp};
use permamind_crypto::cipher::encrypt;
use permamind_crypto::keymaterial::KeyMaterial;
use permamind_crypto::signatures::sign;
use permamind_ledger::LedgerAdapter;
use permamind_shard::{chunk_operations, fact_to_upsert_op, pending_deletion_to_op, serialize_shard};
use permamind_store::LocalStore;

use crate::tags::common_tags;

/// Coordinates pushing local mutations to the ledger and pulling/reconstructing
/// state from it (§4.8). Holds the derived key material and symmetric key for
/// the lifetime of one sync session; never a global singleton (§4.10).
pub struct SyncEngine<L: LedgerAdapter> {
    pub(crate) store: Arc<LocalStore>,
    pub(crate) ledger: Arc<L>,
    pub(crate) config: SyncConfig,
    pub(crate) key_material: KeyMaterial,
    pub(crate) sym_key: Zeroizing<[u8; 32]>,
    pub(crate) salt: [u8; SALT_LEN],
}

impl<L: LedgerAdapter> SyncEngine<L> {
    pub fn new(
        store: Arc<LocalStore>,
        ledger: Arc<L>,
        config: SyncConfig,
        key_material: KeyMaterial,
        sym_key: Zeroizing<[u8; 32]>,
        salt: [u8; SALT_LEN],
    ) -> Self {
        Self {
            store,
            ledger,
            config,
            key_material,
            sym_key,
            salt,
        }
    }

    /// The backing local store, for collaborators (e.g. the background loop)
    /// that need to track bookkeeping alongside the engine's own state.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn wallet_id(&self) -> permamind_core::types::WalletId {
        self.key_material.wallet_id()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    fn session_id(&self) -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn now(&self) -> Timestamp {
        permamind_core::clock::now()
    }

    /// §4.8.2: reads dirty facts and pending deletes, chunks and uploads them
    /// as signed, encrypted shards, and advances local version/dirty state
    /// only once the whole batch has landed on the ledger.
    pub async fn push_facts(&self) -> Result<(), MemoryError> {
        let dirty = self.store.get_dirty()?;
        let pending = self.store.get_pending_deletes()?;
        if dirty.is_empty() && pending.is_empty() {
            debug!("push_facts: nothing dirty, no-op");
            return Ok(());
        }

        let mut ops: Vec<_> = dirty.iter().map(fact_to_upsert_op).collect();
        ops.extend(pending.iter().map(pending_deletion_to_op));

        let current_version = self.store.get_meta_u64(META_CURRENT_VERSION)?.unwrap_or(0);
        let start_version = current_version + 1;
        let session_id = self.session_id();
        let timestamp = self.now();

        let shards = chunk_operations(
            &ops,
            start_version,
            &session_id,
            &timestamp,
            self.config.free_upload_budget_bytes,
        )?;

        info!(shard_count = shards.len(), start_version, "push_facts: uploading shards");

        let mut last_uploaded_version: Option<ShardVersion> = None;
        for shard in &shards {
            match self.upload_shard(shard, ShardKind::Delta).await {
                Ok(()) => {
                    self.store.set_meta_u64(META_LAST_PUSHED_VERSION, shard.shard_version)?;
                    last_uploaded_version = Some(shard.shard_version);
                }
                Err(e) => {
                    warn!(version = shard.shard_version, error = %e, "push_facts: shard upload failed, aborting batch");
                    return Err(e);
                }
            }
        }

        if let Some(final_version) = last_uploaded_version {
            self.store.clear_dirty()?;
            self.store.set_meta_u64(META_CURRENT_VERSION, final_version)?;
            info!(version = final_version, "push_facts: batch complete");
        }

        Ok(())
    }

    async fn upload_shard(&self, shard: &Shard, kind: ShardKind) -> Result<(), MemoryError> {
        let plaintext = serialize_shard(shard)?;
        let ciphertext = encrypt(&self.sym_key, &plaintext);
        let signature = sign(&self.key_material, &ciphertext)?;

        let mut tags = common_tags(
            &self.config.app_name,
            &self.key_material.wallet_id(),
            &shard.timestamp,
            &signature.to_hex(),
        )?;
        tags.push(Tag::new(TAG_TYPE, kind.as_tag_value()));
        tags.push(Tag::new(TAG_VERSION, shard.shard_version.to_string()));

        let tx_id = self.ledger.upload(ciphertext, tags).await?;
        debug!(tx_id = %tx_id, version = shard.shard_version, "push_facts: shard uploaded");
        Ok(())
    }

    /// §4.8.3: runs once, the first time `meta.identity_pushed` is unset.
    pub async fn push_identity(&self) -> Result<(), MemoryError> {
        if self.store.get_meta(META_IDENTITY_PUSHED)?.is_some() {
            debug!("push_identity: already pushed, no-op");
            return Ok(());
        }

        let private_key_bytes = self.key_material.private_key_bytes();
        let encrypted = encrypt(&self.sym_key, &*private_key_bytes);
        let signature = sign(&self.key_material, &encrypted)?;

        let mut tags = common_tags(
            &self.config.app_name,
            &self.key_material.wallet_id(),
            &self.now(),
            &signature.to_hex(),
        )?;
        tags.push(Tag::new(TAG_TYPE, TYPE_IDENTITY));
        tags.push(Tag::new(TAG_SALT, hex::encode(self.salt)));

        let tx_id = self.ledger.upload(encrypted, tags).await?;
        self.store.set_meta(META_IDENTITY_PUSHED, &tx_id.0)?;
        info!(tx_id = %tx_id, "push_identity: identity record uploaded");
        Ok(())
    }

    /// §4.8.4: pushes the unsynced tail of `conversation`'s messages, chunking
    /// the *ciphertext* (not the JSON) into pieces of at most the free-upload
    /// budget. The per-source cursor only advances once every chunk lands.
    pub async fn push_conversation_delta(&self, conversation: &Conversation) -> Result<(), MemoryError> {
        let cursor_key = conversation_offset_key(conversation.client.as_tag_value(), &conversation.id);
        let last_synced_count = self.store.get_meta_u64(&cursor_key)?.unwrap_or(0) as usize;
        let safe_offset = last_synced_count.min(conversation.messages.len());
        let delta = &conversation.messages[safe_offset..];

        if delta.is_empty() {
            debug!(session = %conversation.id, "push_conversation_delta: nothing new, no-op");
            return Ok(());
        }

        let timestamp = self.now();
        let segment = ConversationSegment {
            id: conversation.id.clone(),
            client: conversation.client,
            project: conversation.project.clone(),
            started_at: conversation.started_at.clone(),
            updated_at: conversation.updated_at.clone(),
            offset: safe_offset as u64,
            count: delta.len() as u64,
            messages: delta.to_vec(),
        };

        let plaintext = serde_json::to_vec(&segment)?;
        let ciphertext = encrypt(&self.sym_key, &plaintext);

        let budget = self.config.free_upload_budget_bytes;
        let chunks: Vec<&[u8]> = ciphertext.chunks(budget).collect();
        let total = chunks.len() as u64;

        for (idx, chunk) in chunks.iter().enumerate() {
            let i = idx as u64 + 1;
            let signature = sign(&self.key_material, chunk)?;
            let mut tags = common_tags(&self.config.app_name, &self.key_material.wallet_id(), &timestamp, &signature.to_hex())?;
            tags.push(Tag::new(TAG_TYPE, TYPE_CONVERSATION));
            tags.push(Tag::new(TAG_CLIENT, conversation.client.as_tag_value()));
            tags.push(Tag::new(TAG_PROJECT, conversation.project.clone()));
            tags.push(Tag::new(TAG_SESSION, conversation.id.clone()));
            tags.push(Tag::new(TAG_OFFSET, safe_offset.to_string()));
            tags.push(Tag::new(TAG_COUNT, delta.len().to_string()));
            tags.push(Tag::new(TAG_CHUNK, format!("{i}/{total}")));

            if let Err(e) = self.ledger.upload(chunk.to_vec(), tags).await {
                warn!(session = %conversation.id, chunk = i, error = %e, "push_conversation_delta: chunk upload failed, cursor not advanced");
                return Err(e);
            }
        }

        self.store.set_meta_u64(&cursor_key, conversation.messages.len() as u64)?;
        info!(session = %conversation.id, count = delta.len(), "push_conversation_delta: delta pushed");
        Ok(())
    }

    /// §4.8.7: the highest `Version` tag currently visible for this wallet's
    /// data shards, without fetching or decrypting anything. `0` if none.
    pub async fn check_remote_version(&self) -> Result<ShardVersion, MemoryError> {
        let wallet_hex = self.key_material.wallet_id().to_hex();
        let mut max_version: ShardVersion = 0;

        for kind in [TYPE_DELTA, TYPE_SNAPSHOT] {
            let tags = vec![
                Tag::new(TAG_APP_NAME, self.config.app_name.clone()),
                Tag::new(TAG_WALLET, wallet_hex.clone()),
                Tag::new(TAG_TYPE, kind),
            ];
            let metas = self.ledger.query_by_tags(tags).await?;
            for meta in metas {
                if let Some(v) = crate::tags::parse_u64_tag(&meta.tags, TAG_VERSION) {
                    max_version = max_version.max(v);
                }
            }
        }

        Ok(max_version)
    }
}
