use std::collections::BTreeMap;

use tracing::warn;

use permamind_core::constants::*;
use permamind_core::error::MemoryError;
use permamind_core::types::{Conversation, ConversationSegment, Tag, TxMeta};
use permamind_crypto::cipher::decrypt;
use permamind_crypto::signatures::verify;
use permamind_ledger::LedgerAdapter;

use crate::engine::SyncEngine;
use crate::tags::{find_tag, parse_chunk_tag, parse_i64_tag, parse_u64_tag};

struct ParsedSegment {
    session: String,
    offset: u64,
    timestamp: i64,
    segment: ConversationSegment,
}

impl<L: LedgerAdapter> SyncEngine<L> {
    /// §4.8.6: fetches and stitches every conversation segment uploaded for
    /// this wallet into complete, ordered `Conversation`s.
    pub async fn pull_conversations(&self) -> Result<Vec<Conversation>, MemoryError> {
        let wallet_hex = self.key_material.wallet_id().to_hex();
        let tags = vec![
            Tag::new(TAG_APP_NAME, self.config.app_name.clone()),
            Tag::new(TAG_WALLET, wallet_hex),
            Tag::new(TAG_TYPE, TYPE_CONVERSATION),
        ];
        let metas = self.ledger.query_by_tags(tags).await?;

        let groups = group_chunks(&metas);
        let mut parsed_segments = Vec::new();

        for ((session, offset, timestamp), chunk_metas) in groups {
            match self.fetch_and_assemble_group(&chunk_metas).await {
                Some(segment) => parsed_segments.push(ParsedSegment {
                    session,
                    offset,
                    timestamp,
                    segment,
                }),
                None => warn!(session = %session, offset, "pull_conversations: group incomplete or invalid, skipped"),
            }
        }

        Ok(stitch(parsed_segments))
    }

    async fn fetch_and_assemble_group(&self, chunk_metas: &[&TxMeta]) -> Option<ConversationSegment> {
        let mut ciphertext = Vec::new();
        for meta in chunk_metas {
            let blob = self.ledger.fetch_blob(&meta.tx_id).await.ok()?;
            if blob.len() > self.config.data_shard_max_bytes {
                return None;
            }
            let sig_hex = find_tag(&meta.tags, TAG_SIGNATURE)?;
            let signature = permamind_core::types::RecoverableSignature::from_hex(sig_hex).ok()?;
            if !verify(&blob, &signature, &self.key_material.wallet_id()) {
                return None;
            }
            ciphertext.extend_from_slice(&blob);
        }

        let plaintext = decrypt(&self.sym_key, &ciphertext).ok()?;
        serde_json::from_slice::<ConversationSegment>(&plaintext).ok()
    }
}

/// Groups conversation-chunk metadata by `(Session, Offset, Timestamp)`,
/// keeping only groups whose `Chunk` tags form a complete bijection with
/// `1..=N` (§4.8.6 step 3).
fn group_chunks(metas: &[TxMeta]) -> Vec<((String, u64, i64), Vec<&TxMeta>)> {
    let mut raw: BTreeMap<(String, u64, i64), Vec<&TxMeta>> = BTreeMap::new();

    for meta in metas {
        let Some(session) = find_tag(&meta.tags, TAG_SESSION) else {
            continue;
        };
        let Some(offset) = parse_u64_tag(&meta.tags, TAG_OFFSET) else {
            continue;
        };
        let Some(timestamp) = parse_i64_tag(&meta.tags, TAG_TIMESTAMP) else {
            continue;
        };
        raw.entry((session.to_string(), offset, timestamp)).or_default().push(meta);
    }

    raw.into_iter()
        .filter_map(|(key, mut metas)| {
            let total = find_tag(metas[0].tags.as_slice(), TAG_CHUNK).and_then(parse_chunk_tag).map(|(_, n)| n)?;

            let mut indices: Vec<u64> = metas
                .iter()
                .filter_map(|m| find_tag(&m.tags, TAG_CHUNK).and_then(parse_chunk_tag))
                .filter(|(_, n)| *n == total)
                .map(|(i, _)| i)
                .collect();
            indices.sort_unstable();
            let is_bijection = indices.len() as u64 == total && indices.iter().enumerate().all(|(idx, i)| *i == idx as u64 + 1);
            if !is_bijection {
                return None;
            }

            metas.sort_by_key(|m| find_tag(&m.tags, TAG_CHUNK).and_then(parse_chunk_tag).map(|(i, _)| i).unwrap_or(0));
            Some((key, metas))
        })
        .collect()
}

/// Stitches parsed segments into complete conversations: groups by session,
/// sorts by `(offset, timestamp)` ascending, and appends each new offset's
/// messages. Duplicate offsets within a session take the first seen (§4.8.6).
fn stitch(mut segments: Vec<ParsedSegment>) -> Vec<Conversation> {
    segments.sort_by_key(|s| (s.session.clone(), s.offset, s.timestamp));

    let mut out: Vec<Conversation> = Vec::new();
    let mut seen_offsets: BTreeMap<String, Vec<u64>> = BTreeMap::new();

    for parsed in segments {
        let seen = seen_offsets.entry(parsed.session.clone()).or_default();
        if seen.contains(&parsed.offset) {
            continue;
        }
        seen.push(parsed.offset);

        match out.iter_mut().find(|c| c.id == parsed.session) {
            Some(conv) => {
                conv.messages.extend(parsed.segment.messages);
                conv.started_at = conv.started_at.min(parsed.segment.started_at);
                conv.updated_at = conv.updated_at.max(parsed.segment.updated_at);
            }
            None => {
                out.push(Conversation {
                    id: parsed.session,
                    client: parsed.segment.client,
                    project: parsed.segment.project,
                    started_at: parsed.segment.started_at,
                    updated_at: parsed.segment.updated_at,
                    messages: parsed.segment.messages,
                });
            }
        }
    }

    out
}
