use permamind_core::types::{Fact, PendingDeletion, Shard, ShardOperation, ShardVersion, Timestamp};

/// Strips local-only fields (`id`-as-row-identity, `dirty`, timestamps,
/// `access_count`) and carries only what a replayer needs (§4.6).
pub fn fact_to_upsert_op(fact: &Fact) -> ShardOperation {
    ShardOperation::Upsert {
        key: fact.key.clone(),
        value: fact.value.clone(),
        tags: fact.tags.clone(),
        scope: fact.scope.clone(),
        confidence: fact.confidence,
        fact_id: Some(fact.id.clone()),
    }
}

pub fn pending_deletion_to_op(pending: &PendingDeletion) -> ShardOperation {
    ShardOperation::Delete {
        key: pending.key.clone(),
    }
}

/// Builds a single shard from a caller-provided operation list, with no size
/// checking — use [`crate::chunk::chunk_operations`] when the list might
/// exceed the free-upload budget (§4.6).
pub fn create_shard(
    operations: Vec<ShardOperation>,
    version: ShardVersion,
    session_id: impl Into<String>,
    timestamp: Timestamp,
) -> Shard {
    Shard {
        shard_version: version,
        timestamp,
        session_id: session_id.into(),
        operations,
    }
}

/// Deterministic text encoding (JSON over UTF-8) — the same `Shard` value
/// serializes to the same bytes regardless of which machine encodes it,
/// since struct field order is fixed by the type definition (§4.6).
pub fn serialize_shard(shard: &Shard) -> Result<Vec<u8>, permamind_core::error::MemoryError> {
    Ok(serde_json::to_vec(shard)?)
}

pub fn deserialize_shard(bytes: &[u8]) -> Result<Shard, permamind_core::error::MemoryError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_to_upsert_strips_local_only_fields() {
        let fact = Fact {
            id: "f1".into(),
            scope: "global".into(),
            key: "pref:editor".into(),
            value: "vim".into(),
            tags: vec!["editor".into()],
            confidence: 0.9,
            source_session: Some("sess-1".into()),
            created: "2023-11-14T22:13:20Z".into(),
            last_confirmed: "2023-11-14T22:14:00Z".into(),
            access_count: 3,
            dirty: true,
        };
        let op = fact_to_upsert_op(&fact);
        match op {
            ShardOperation::Upsert {
                key,
                value,
                fact_id,
                ..
            } => {
                assert_eq!(key, "pref:editor");
                assert_eq!(value, "vim");
                assert_eq!(fact_id, Some("f1".to_string()));
            }
            ShardOperation::Delete { .. } => panic!("expected upsert"),
        }
    }

    #[test]
    fn serialize_round_trip_is_byte_identical() {
        let shard = create_shard(
            vec![ShardOperation::Delete {
                key: "k".to_string(),
            }],
            1,
            "session-a",
            "2023-11-14T22:13:20Z".to_string(),
        );
        let bytes = serialize_shard(&shard).unwrap();
        let back = deserialize_shard(&bytes).unwrap();
        let bytes2 = serialize_shard(&back).unwrap();
        assert_eq!(bytes, bytes2);
        assert_eq!(shard, back);
    }
}
