use permamind_core::constants::CIPHER_OVERHEAD_BYTES;
use permamind_core::error::MemoryError;
use permamind_core::types::{Shard, ShardOperation, ShardVersion};

/// Encodes an empty-operations shard with the real `session_id` and
/// `timestamp` to measure the wrapper's actual byte size — the wrapper size
/// varies with timestamp and session id width, so it is never a precomputed
/// constant (SPEC_FULL §9).
fn wrapper_size(session_id: &str, timestamp: &str) -> Result<usize, MemoryError> {
    let empty = Shard {
        shard_version: 1,
        timestamp: timestamp.to_string(),
        session_id: session_id.to_string(),
        operations: vec![],
    };
    Ok(serde_json::to_vec(&empty)?.len())
}

fn encoded_total(wrapper: usize, ops_bytes: usize, op_count: usize) -> usize {
    // `op_count - 1` one-byte separators between operations, plus the
    // constant cipher overhead that will be added once the shard is encrypted.
    wrapper + ops_bytes + op_count.saturating_sub(1) + CIPHER_OVERHEAD_BYTES
}

/// Returns `Err(ShardTooLarge)` if `op`, placed alone in its own shard, would
/// still exceed `budget_bytes`. Callers are expected to reject oversized
/// individual fact values before they ever reach the chunker (§4.6); this is
/// a diagnostic check, not something the chunker itself enforces by dropping
/// data.
pub fn check_operation_fits_alone(
    op: &ShardOperation,
    session_id: &str,
    timestamp: &str,
    budget_bytes: usize,
) -> Result<(), MemoryError> {
    let wrapper = wrapper_size(session_id, timestamp)?;
    let op_size = serde_json::to_vec(op)?.len();
    let total = encoded_total(wrapper, op_size, 1);
    if total > budget_bytes {
        return Err(MemoryError::ShardTooLarge {
            size: total,
            budget: budget_bytes,
        });
    }
    Ok(())
}

/// Splits `ops` into a sequence of shards with consecutive versions starting
/// at `start_version`, such that each shard's actual encoded-then-encrypted
/// size does not exceed `budget_bytes` (§4.6). A single operation that alone
/// exceeds the budget still goes out as its own shard — the chunker never
/// discards data, it only reports the condition via
/// [`check_operation_fits_alone`] for callers that want to reject it upstream.
pub fn chunk_operations(
    ops: &[ShardOperation],
    start_version: ShardVersion,
    session_id: &str,
    timestamp: &str,
    budget_bytes: usize,
) -> Result<Vec<Shard>, MemoryError> {
    if ops.is_empty() {
        return Ok(Vec::new());
    }

    let wrapper = wrapper_size(session_id, timestamp)?;
    let mut shards = Vec::new();
    let mut current: Vec<ShardOperation> = Vec::new();
    let mut current_ops_bytes = 0usize;
    let mut version = start_version;

    for op in ops {
        let op_bytes = serde_json::to_vec(op)?.len();

        if !current.is_empty() {
            let projected = encoded_total(
                wrapper,
                current_ops_bytes + op_bytes,
                current.len() + 1,
            );
            if projected > budget_bytes {
                shards.push(Shard {
                    shard_version: version,
                    timestamp: timestamp.to_string(),
                    session_id: session_id.to_string(),
                    operations: std::mem::take(&mut current),
                });
                version += 1;
                current_ops_bytes = 0;
            }
        }

        current.push(op.clone());
        current_ops_bytes += op_bytes;
    }

    if !current.is_empty() {
        shards.push(Shard {
            shard_version: version,
            timestamp: timestamp.to_string(),
            session_id: session_id.to_string(),
            operations: current,
        });
    }

    Ok(shards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(key: &str, value: &str) -> ShardOperation {
        ShardOperation::Upsert {
            key: key.to_string(),
            value: value.to_string(),
            tags: vec![],
            scope: "global".to_string(),
            confidence: 1.0,
            fact_id: None,
        }
    }

    #[test]
    fn empty_ops_produce_no_shards() {
        let shards = chunk_operations(&[], 1, "s", "2023-11-14T22:13:20Z", 92_160).unwrap();
        assert!(shards.is_empty());
    }

    #[test]
    fn large_budget_produces_single_shard() {
        let ops: Vec<_> = (0..15)
            .map(|i| upsert(&format!("k{i}"), &"x".repeat(300)))
            .collect();
        let shards = chunk_operations(&ops, 1, "s", "2023-11-14T22:13:20Z", 1_000_000).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].operations.len(), 15);
    }

    #[test]
    fn tight_budget_splits_into_multiple_shards_without_losing_ops() {
        let ops: Vec<_> = (0..15)
            .map(|i| upsert(&format!("k{i}"), &"x".repeat(300)))
            .collect();
        let shards = chunk_operations(&ops, 1, "s", "2023-11-14T22:13:20Z", 500).unwrap();
        assert!(shards.len() >= 2);

        let total_ops: usize = shards.iter().map(|s| s.operations.len()).sum();
        assert_eq!(total_ops, ops.len());

        let mut seen_keys = Vec::new();
        for shard in &shards {
            for op in &shard.operations {
                seen_keys.push(op.key().to_string());
            }
        }
        let expected: Vec<String> = ops.iter().map(|o| o.key().to_string()).collect();
        assert_eq!(seen_keys, expected);
    }

    #[test]
    fn versions_are_consecutive_starting_at_start_version() {
        let ops: Vec<_> = (0..15)
            .map(|i| upsert(&format!("k{i}"), &"x".repeat(300)))
            .collect();
        let shards = chunk_operations(&ops, 5, "s", "2023-11-14T22:13:20Z", 500).unwrap();
        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(shard.shard_version, 5 + i as u64);
        }
    }

    #[test]
    fn oversized_single_operation_still_goes_out_alone() {
        let huge = upsert("k", &"x".repeat(10_000));
        let shards = chunk_operations(&[huge], 1, "s", "2023-11-14T22:13:20Z", 500).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].operations.len(), 1);
        assert!(check_operation_fits_alone(&shards[0].operations[0], "s", "2023-11-14T22:13:20Z", 500).is_err());
    }

    #[test]
    fn small_operation_fits_alone_under_default_budget() {
        let op = upsert("k", "v");
        assert!(check_operation_fits_alone(&op, "s", "2023-11-14T22:13:20Z", 92_160).is_ok());
    }
}
