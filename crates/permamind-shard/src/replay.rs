use std::collections::HashMap;

use permamind_core::types::{Fact, Shard, ShardOperation, Timestamp};

/// Current value plus whatever local metadata (`created`, `last_confirmed`)
/// survives a replay. A delete-then-upsert of the same key resurrects it
/// with a fresh `created` timestamp rather than the original one (§4.6).
#[derive(Debug, Clone)]
struct ReplayedFact {
    value: String,
    tags: Vec<String>,
    scope: String,
    confidence: f64,
    fact_id: Option<String>,
    created: Timestamp,
    last_confirmed: Timestamp,
}

/// Folds a sequence of shards (already ordered by ascending `shard_version`)
/// into final key state.
///
/// Modeled after a JS `Map`: an upsert of a currently-present key overwrites
/// its value without moving its position in insertion order, and sets
/// `last_confirmed` to the writing shard's timestamp while leaving `created`
/// untouched; a delete removes the key entirely; an upsert of a key not
/// currently present — whether truly new or resurrected after a prior
/// delete — appends it at the end of the order list with both `created` and
/// `last_confirmed` set to the writing shard's timestamp.
pub fn replay(shards: &[Shard]) -> Vec<Fact> {
    let mut order: Vec<String> = Vec::new();
    let mut state: HashMap<String, ReplayedFact> = HashMap::new();

    for shard in shards {
        for op in &shard.operations {
            match op {
                ShardOperation::Upsert {
                    key,
                    value,
                    tags,
                    scope,
                    confidence,
                    fact_id,
                } => {
                    if let Some(existing) = state.get_mut(key) {
                        existing.value = value.clone();
                        existing.tags = tags.clone();
                        existing.scope = scope.clone();
                        existing.confidence = *confidence;
                        existing.fact_id = fact_id.clone();
                        existing.last_confirmed = shard.timestamp.clone();
                    } else {
                        order.push(key.clone());
                        state.insert(
                            key.clone(),
                            ReplayedFact {
                                value: value.clone(),
                                tags: tags.clone(),
                                scope: scope.clone(),
                                confidence: *confidence,
                                fact_id: fact_id.clone(),
                                created: shard.timestamp.clone(),
                                last_confirmed: shard.timestamp.clone(),
                            },
                        );
                    }
                }
                ShardOperation::Delete { key } => {
                    if state.remove(key).is_some() {
                        order.retain(|k| k != key);
                    }
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            state.remove(&key).map(|replayed| Fact {
                id: replayed
                    .fact_id
                    .clone()
                    .unwrap_or_else(|| key.clone()),
                scope: replayed.scope,
                key,
                value: replayed.value,
                tags: replayed.tags,
                confidence: replayed.confidence,
                source_session: None,
                created: replayed.created,
                last_confirmed: replayed.last_confirmed,
                access_count: 0,
                dirty: false,
            })
        })
        .collect()
}
