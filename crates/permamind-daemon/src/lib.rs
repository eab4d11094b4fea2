pub mod background;
pub mod discovery;

pub use background::BackgroundLoop;
pub use discovery::{TranscriptDiscovery, TranscriptParser, TranscriptSource};

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;

    use permamind_core::config::SyncConfig;
    use permamind_core::error::MemoryError;
    use permamind_core::types::{Client, Conversation, Fact, Message};
    use permamind_ledger::MemoryLedger;
    use permamind_store::LocalStore;
    use permamind_sync::SyncEngine;
    use tempfile::tempdir;

    use super::*;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_engine() -> Arc<SyncEngine<MemoryLedger>> {
        let dir = tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("store.sled")).unwrap());
        let ledger = Arc::new(MemoryLedger::new());
        let mut config = SyncConfig::default();
        config.fact_sync_period = Duration::from_millis(20);
        config.conversation_watch_period = Duration::from_millis(20);
        let key_material = permamind_crypto::KeyMaterial::derive(PHRASE).unwrap();
        let salt = [2u8; permamind_core::constants::SALT_LEN];
        let sym_key = permamind_crypto::derive_symmetric_key(PHRASE, &salt, &config.kdf_params).unwrap();
        Arc::new(SyncEngine::new(store, ledger, config, key_material, sym_key, salt))
    }

    struct NoTranscripts;
    impl TranscriptDiscovery for NoTranscripts {
        fn discover(&self) -> Vec<TranscriptSource> {
            Vec::new()
        }
    }
    struct UnreachableParser;
    impl TranscriptParser for UnreachableParser {
        fn parse(&self, _source: &TranscriptSource) -> Result<Conversation, MemoryError> {
            unreachable!("no transcripts are ever discovered in this test")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fact_sync_ticker_pushes_dirty_facts_automatically() {
        let engine = test_engine();
        engine
            .store()
            .upsert_fact(Fact {
                id: "id-a".into(),
                scope: "global".into(),
                key: "a".into(),
                value: "1".into(),
                tags: vec![],
                confidence: 1.0,
                source_session: None,
                created: "2023-11-14T22:13:20Z".to_string(),
                last_confirmed: "2023-11-14T22:13:20Z".to_string(),
                access_count: 0,
                dirty: false,
            })
            .unwrap();

        let loop_ = BackgroundLoop::new(engine.clone(), Arc::new(NoTranscripts), Arc::new(UnreachableParser));
        let (fact_handle, conv_handle) = loop_.spawn();

        tokio::time::advance(Duration::from_millis(25)).await;
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(25)).await;
        tokio::task::yield_now().await;

        assert!(engine.store().get_dirty().unwrap().is_empty());

        fact_handle.abort();
        conv_handle.abort();
    }

    /// A single-file discovery fixture plus a parser returning a fixed
    /// conversation, to exercise the watcher's size/mtime change detection
    /// without needing a real transcript format.
    struct SingleFile {
        path: std::path::PathBuf,
    }
    impl TranscriptDiscovery for SingleFile {
        fn discover(&self) -> Vec<TranscriptSource> {
            vec![TranscriptSource {
                path: self.path.clone(),
                client: Client::ClaudeCode,
                project: "demo".to_string(),
                session_id: "sess-1".to_string(),
            }]
        }
    }
    struct FixedConversation;
    impl TranscriptParser for FixedConversation {
        fn parse(&self, source: &TranscriptSource) -> Result<Conversation, MemoryError> {
            Ok(Conversation {
                id: source.session_id.clone(),
                client: source.client,
                project: source.project.clone(),
                started_at: "2023-11-14T22:13:20Z".to_string(),
                updated_at: "2023-11-14T22:13:20Z".to_string(),
                messages: vec![Message {
                    role: "user".to_string(),
                    content: "hello".to_string(),
                }],
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn conversation_watcher_pushes_once_per_observed_change() {
        let dir = tempdir().unwrap();
        let transcript_path = dir.path().join("transcript.jsonl");
        std::fs::File::create(&transcript_path)
            .unwrap()
            .write_all(b"line one")
            .unwrap();

        let engine = test_engine();
        let discovery = Arc::new(SingleFile {
            path: transcript_path.clone(),
        });
        let loop_ = BackgroundLoop::new(engine.clone(), discovery, Arc::new(FixedConversation));
        let (fact_handle, conv_handle) = loop_.spawn();

        tokio::time::advance(Duration::from_millis(25)).await;
        tokio::task::yield_now().await;

        assert_eq!(engine.ledger().len(), 1);

        // A second tick with the file unchanged must not push again.
        tokio::time::advance(Duration::from_millis(25)).await;
        tokio::task::yield_now().await;
        assert_eq!(engine.ledger().len(), 1);

        fact_handle.abort();
        conv_handle.abort();
    }
}
