use std::path::Path;

use tracing::{info, warn};

use permamind_core::config::SyncConfig;
use permamind_core::constants::*;
use permamind_core::error::MemoryError;
use permamind_core::meta::{META_CURRENT_VERSION, META_WALLET_ADDRESS};
use permamind_core::types::{Shard, ShardVersion, Tag};
use permamind_crypto::cipher::decrypt;
use permamind_crypto::keymaterial::{derive_symmetric_key, KeyMaterial};
use permamind_crypto::phrase::normalize_phrase;
use permamind_crypto::signatures::verify;
use permamind_ledger::LedgerAdapter;
use permamind_shard::{deserialize_shard, replay};
use permamind_store::LocalStore;

use crate::tags::parse_u64_tag;

/// §4.8.5: full restore from the ledger into a fresh local store. Precondition
/// is that no local state exists yet at `db_path`. Any fatal error from step 2
/// onward tears down whatever partial store directory this attempt created.
pub async fn pull_and_reconstruct<L: LedgerAdapter>(
    ledger: &L,
    phrase: &str,
    db_path: impl AsRef<Path>,
    config: &SyncConfig,
) -> Result<LocalStore, MemoryError> {
    let path = db_path.as_ref();
    match inner(ledger, phrase, path, config).await {
        Ok(store) => Ok(store),
        Err(e) => {
            if path.exists() {
                let _ = std::fs::remove_dir_all(path);
            }
            Err(e)
        }
    }
}

async fn inner<L: LedgerAdapter>(
    ledger: &L,
    phrase: &str,
    path: &Path,
    config: &SyncConfig,
) -> Result<LocalStore, MemoryError> {
    let normalized = normalize_phrase(phrase);
    let key_material = KeyMaterial::derive(&normalized)?;
    let wallet_hex = key_material.wallet_id().to_hex();

    // Step 1: identity record.
    let identity_tags = vec![
        Tag::new(TAG_APP_NAME, config.app_name.clone()),
        Tag::new(TAG_WALLET, wallet_hex.clone()),
        Tag::new(TAG_TYPE, TYPE_IDENTITY),
    ];
    let identity_metas = ledger.query_by_tags(identity_tags).await?;
    let identity_meta = identity_metas.first().ok_or(MemoryError::IdentityMissing)?;

    let salt_hex = crate::tags::find_tag(&identity_meta.tags, TAG_SALT).ok_or(MemoryError::IdentityMissing)?;
    let salt = hex::decode(salt_hex).map_err(|e| MemoryError::Other(format!("invalid salt hex: {e}")))?;

    let encrypted_private_key = ledger.fetch_blob(&identity_meta.tx_id).await?;
    if encrypted_private_key.len() > config.identity_max_bytes {
        return Err(MemoryError::LedgerRejected(format!(
            "identity record of {} bytes exceeds the {}-byte pull cap",
            encrypted_private_key.len(),
            config.identity_max_bytes
        )));
    }
    info!(wallet = %wallet_hex, "pull_and_reconstruct: identity record fetched");

    // Step 2: derive symmetric key, decrypt.
    let sym_key = derive_symmetric_key(&normalized, &salt, &config.kdf_params)?;
    let decrypted = decrypt(&sym_key, &encrypted_private_key).map_err(|_| MemoryError::BadPassphrase)?;

    // Step 3: bit-for-bit confirmation.
    if decrypted.as_slice() != &*key_material.private_key_bytes() {
        return Err(MemoryError::IdentityMismatch);
    }

    // Step 4: query all data shards.
    let mut all_metas = Vec::new();
    for kind in [TYPE_DELTA, TYPE_SNAPSHOT] {
        let tags = vec![
            Tag::new(TAG_APP_NAME, config.app_name.clone()),
            Tag::new(TAG_WALLET, wallet_hex.clone()),
            Tag::new(TAG_TYPE, kind),
        ];
        all_metas.extend(ledger.query_by_tags(tags).await?);
    }

    // Step 5: empty wallet.
    if all_metas.is_empty() {
        let store = LocalStore::open(path)?;
        store.set_meta_u64(META_CURRENT_VERSION, 0)?;
        store.set_meta(META_WALLET_ADDRESS, &wallet_hex)?;
        info!(wallet = %wallet_hex, "pull_and_reconstruct: no remote shards, empty store created");
        return Ok(store);
    }

    let max_version_all: ShardVersion = all_metas
        .iter()
        .filter_map(|m| parse_u64_tag(&m.tags, TAG_VERSION))
        .max()
        .unwrap_or(0);

    // Step 6: choose the starting point.
    let snapshot_version: Option<ShardVersion> = all_metas
        .iter()
        .filter(|m| crate::tags::find_tag(&m.tags, TAG_TYPE) == Some(TYPE_SNAPSHOT))
        .filter_map(|m| parse_u64_tag(&m.tags, TAG_VERSION))
        .max();

    let selected: Vec<_> = all_metas
        .iter()
        .filter(|m| match snapshot_version {
            Some(sv) => parse_u64_tag(&m.tags, TAG_VERSION).map(|v| v >= sv).unwrap_or(false),
            None => true,
        })
        .collect();

    // Step 7: fetch, verify, decrypt, deserialize each selected shard.
    let mut survivors: Vec<Shard> = Vec::new();
    for meta in &selected {
        let version = parse_u64_tag(&meta.tags, TAG_VERSION);
        let signature_hex = crate::tags::find_tag(&meta.tags, TAG_SIGNATURE);

        let blob = match ledger.fetch_blob(&meta.tx_id).await {
            Ok(b) => b,
            Err(e) => {
                warn!(tx_id = %meta.tx_id, error = %e, "pull_and_reconstruct: shard fetch failed, skipping");
                continue;
            }
        };
        if blob.len() > config.data_shard_max_bytes {
            warn!(tx_id = %meta.tx_id, size = blob.len(), "pull_and_reconstruct: shard exceeds pull cap, skipping");
            continue;
        }

        let Some(sig_hex) = signature_hex else {
            warn!(tx_id = %meta.tx_id, "pull_and_reconstruct: shard missing signature tag, skipping");
            continue;
        };
        let Ok(signature) = permamind_core::types::RecoverableSignature::from_hex(sig_hex) else {
            warn!(tx_id = %meta.tx_id, "pull_and_reconstruct: shard signature malformed, skipping");
            continue;
        };
        if !verify(&blob, &signature, &key_material.wallet_id()) {
            warn!(tx_id = %meta.tx_id, "pull_and_reconstruct: shard signature invalid, skipping");
            continue;
        }

        let plaintext = match decrypt(&sym_key, &blob) {
            Ok(p) => p,
            Err(_) => {
                warn!(tx_id = %meta.tx_id, "pull_and_reconstruct: shard decryption failed, skipping");
                continue;
            }
        };
        let shard = match deserialize_shard(&plaintext) {
            Ok(s) => s,
            Err(e) => {
                warn!(tx_id = %meta.tx_id, error = %e, "pull_and_reconstruct: shard deserialization failed, skipping");
                continue;
            }
        };

        debug_assert!(version.is_none() || version == Some(shard.shard_version));
        survivors.push(shard);
    }

    // Step 8.
    if survivors.is_empty() {
        return Err(MemoryError::NoRecoverableShards);
    }

    // Step 9.
    survivors.sort_by_key(|s| s.shard_version);
    let facts = replay(&survivors);

    let store = LocalStore::open(path)?;
    for fact in facts {
        store.upsert_fact(fact)?;
    }
    store.clear_dirty()?;
    store.set_meta_u64(META_CURRENT_VERSION, max_version_all)?;
    store.set_meta(META_WALLET_ADDRESS, &wallet_hex)?;

    info!(
        wallet = %wallet_hex,
        shard_count = survivors.len(),
        current_version = max_version_all,
        "pull_and_reconstruct: restore complete"
    );

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permamind_core::types::Fact;
    use permamind_crypto::cipher::encrypt;
    use permamind_crypto::signatures::sign;
    use permamind_ledger::MemoryLedger;
    use permamind_shard::{create_shard, fact_to_upsert_op, serialize_shard};
    use tempfile::tempdir;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn make_fact(key: &str, value: &str) -> Fact {
        Fact {
            id: format!("id-{key}"),
            scope: "global".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            tags: vec![],
            confidence: 1.0,
            source_session: None,
            created: "2023-11-14T22:13:20Z".to_string(),
            last_confirmed: "2023-11-14T22:13:20Z".to_string(),
            access_count: 0,
            dirty: false,
        }
    }

    async fn upload_identity(ledger: &MemoryLedger, config: &SyncConfig, key_material: &KeyMaterial, salt: &[u8]) {
        let sym_key = derive_symmetric_key(PHRASE, salt, &config.kdf_params).unwrap();
        let encrypted = encrypt(&sym_key, &*key_material.private_key_bytes());
        let signature = sign(key_material, &encrypted).unwrap();
        let tags = vec![
            Tag::new(TAG_APP_NAME, config.app_name.clone()),
            Tag::new(TAG_WALLET, key_material.wallet_id().to_hex()),
            Tag::new(TAG_TYPE, TYPE_IDENTITY),
            Tag::new(TAG_SALT, hex::encode(salt)),
            Tag::new(TAG_SIGNATURE, signature.to_hex()),
        ];
        ledger.upload(encrypted, tags).await.unwrap();
    }

    #[tokio::test]
    async fn missing_identity_is_identity_missing() {
        let ledger = MemoryLedger::new();
        let config = SyncConfig::default();
        let dir = tempdir().unwrap();
        let result = pull_and_reconstruct(&ledger, PHRASE, dir.path().join("store.sled"), &config).await;
        assert!(matches!(result, Err(MemoryError::IdentityMissing)));
        assert!(!dir.path().join("store.sled").exists());
    }

    #[tokio::test]
    async fn identity_only_with_no_shards_creates_empty_store() {
        let ledger = MemoryLedger::new();
        let config = SyncConfig::default();
        let key_material = KeyMaterial::derive(PHRASE).unwrap();
        let salt = [4u8; SALT_LEN];
        upload_identity(&ledger, &config, &key_material, &salt).await;

        let dir = tempdir().unwrap();
        let store = pull_and_reconstruct(&ledger, PHRASE, dir.path().join("store.sled"), &config)
            .await
            .unwrap();
        assert_eq!(store.get_meta_u64(META_CURRENT_VERSION).unwrap(), Some(0));
        assert!(store.list_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn full_restore_replays_facts_from_uploaded_shard() {
        let ledger = MemoryLedger::new();
        let config = SyncConfig::default();
        let key_material = KeyMaterial::derive(PHRASE).unwrap();
        let salt = [4u8; SALT_LEN];
        upload_identity(&ledger, &config, &key_material, &salt).await;

        let sym_key = derive_symmetric_key(PHRASE, &salt, &config.kdf_params).unwrap();
        let shard = create_shard(vec![fact_to_upsert_op(&make_fact("a", "1"))], 1, "sess", "2023-11-14T22:13:20Z".to_string());
        let plaintext = serialize_shard(&shard).unwrap();
        let ciphertext = encrypt(&sym_key, &plaintext);
        let signature = sign(&key_material, &ciphertext).unwrap();
        let tags = vec![
            Tag::new(TAG_APP_NAME, config.app_name.clone()),
            Tag::new(TAG_WALLET, key_material.wallet_id().to_hex()),
            Tag::new(TAG_TYPE, TYPE_DELTA),
            Tag::new(TAG_VERSION, "1"),
            Tag::new(TAG_SIGNATURE, signature.to_hex()),
        ];
        ledger.upload(ciphertext, tags).await.unwrap();

        let dir = tempdir().unwrap();
        let store = pull_and_reconstruct(&ledger, PHRASE, dir.path().join("store.sled"), &config)
            .await
            .unwrap();

        let fact = store.get_fact("a").unwrap().unwrap();
        assert_eq!(fact.value, "1");
        assert_eq!(fact.created, "2023-11-14T22:13:20Z");
        assert_eq!(fact.last_confirmed, "2023-11-14T22:13:20Z");
        assert_eq!(store.get_meta_u64(META_CURRENT_VERSION).unwrap(), Some(1));
    }

    #[tokio::test]
    async fn wrong_phrase_after_correct_identity_is_bad_passphrase() {
        let ledger = MemoryLedger::new();
        let config = SyncConfig::default();
        let key_material = KeyMaterial::derive(PHRASE).unwrap();
        let salt = [4u8; SALT_LEN];
        upload_identity(&ledger, &config, &key_material, &salt).await;

        let dir = tempdir().unwrap();
        let other_phrase = "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong";
        let result = pull_and_reconstruct(&ledger, other_phrase, dir.path().join("store.sled"), &config).await;
        assert!(matches!(result, Err(MemoryError::BadPassphrase)));
        assert!(!dir.path().join("store.sled").exists());
    }

    #[tokio::test]
    async fn shards_with_no_surviving_signature_fail_no_recoverable_shards() {
        let ledger = MemoryLedger::new();
        let config = SyncConfig::default();
        let key_material = KeyMaterial::derive(PHRASE).unwrap();
        let salt = [4u8; SALT_LEN];
        upload_identity(&ledger, &config, &key_material, &salt).await;

        let sym_key = derive_symmetric_key(PHRASE, &salt, &config.kdf_params).unwrap();
        let shard = create_shard(vec![fact_to_upsert_op(&make_fact("a", "1"))], 1, "sess", "2023-11-14T22:13:20Z".to_string());
        let ciphertext = encrypt(&sym_key, &serialize_shard(&shard).unwrap());
        // No Signature tag at all — must be skipped, not trusted.
        let tags = vec![
            Tag::new(TAG_APP_NAME, config.app_name.clone()),
            Tag::new(TAG_WALLET, key_material.wallet_id().to_hex()),
            Tag::new(TAG_TYPE, TYPE_DELTA),
            Tag::new(TAG_VERSION, "1"),
        ];
        ledger.upload(ciphertext, tags).await.unwrap();

        let dir = tempdir().unwrap();
        let result = pull_and_reconstruct(&ledger, PHRASE, dir.path().join("store.sled"), &config).await;
        assert!(matches!(result, Err(MemoryError::NoRecoverableShards)));
        assert!(!dir.path().join("store.sled").exists());
    }
}
