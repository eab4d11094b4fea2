use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use permamind_ledger::LedgerAdapter;
use permamind_sync::SyncEngine;

use crate::discovery::{TranscriptDiscovery, TranscriptParser};

/// §4.9: runs the two independent tickers that keep a wallet in sync without
/// any foreground interaction. Both share the engine's local store serially;
/// neither holds a lock across a suspension point other than the store's own
/// transactional boundaries.
pub struct BackgroundLoop<L, D, P>
where
    L: LedgerAdapter + 'static,
    D: TranscriptDiscovery + 'static,
    P: TranscriptParser + 'static,
{
    engine: Arc<SyncEngine<L>>,
    discovery: Arc<D>,
    parser: Arc<P>,
    fact_sync_busy: Arc<AtomicBool>,
}

impl<L, D, P> BackgroundLoop<L, D, P>
where
    L: LedgerAdapter + 'static,
    D: TranscriptDiscovery + 'static,
    P: TranscriptParser + 'static,
{
    pub fn new(engine: Arc<SyncEngine<L>>, discovery: Arc<D>, parser: Arc<P>) -> Self {
        Self {
            engine,
            discovery,
            parser,
            fact_sync_busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawns both tickers as independent tokio tasks and returns their
    /// handles. Dropping/aborting the handles stops the corresponding ticker.
    pub fn spawn(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        let fact_sync = tokio::spawn(run_fact_sync_ticker(
            Arc::clone(&self.engine),
            Arc::clone(&self.fact_sync_busy),
        ));
        let conversation_watch = tokio::spawn(run_conversation_watcher(
            Arc::clone(&self.engine),
            Arc::clone(&self.discovery),
            Arc::clone(&self.parser),
        ));
        (fact_sync, conversation_watch)
    }
}

async fn run_fact_sync_ticker<L: LedgerAdapter>(engine: Arc<SyncEngine<L>>, busy: Arc<AtomicBool>) {
    let mut interval = tokio::time::interval(engine.config().fact_sync_period);
    loop {
        interval.tick().await;

        if busy.swap(true, Ordering::SeqCst) {
            debug!("fact sync ticker: previous tick still running, skipping");
            continue;
        }

        let dirty_before = engine.store().get_dirty().map(|v| v.len()).unwrap_or(0);
        match engine.push_facts().await {
            Ok(()) if dirty_before > 0 => info!(dirty_before, "fact sync ticker: push completed"),
            Ok(()) => debug!("fact sync ticker: nothing to push"),
            Err(e) => warn!(error = %e, "fact sync ticker: push failed, will retry next tick"),
        }

        busy.store(false, Ordering::SeqCst);
    }
}

async fn run_conversation_watcher<L, D, P>(engine: Arc<SyncEngine<L>>, discovery: Arc<D>, parser: Arc<P>)
where
    L: LedgerAdapter,
    D: TranscriptDiscovery,
    P: TranscriptParser,
{
    let mut interval = tokio::time::interval(engine.config().conversation_watch_period);
    loop {
        interval.tick().await;

        for source in discovery.discover() {
            let seen_key = format!("transcript_seen:{}", source.path.display());
            let current_fingerprint = match file_fingerprint(&source.path) {
                Some(f) => f,
                None => continue,
            };
            let previous_fingerprint = engine.store().get_meta(&seen_key).ok().flatten();

            if previous_fingerprint.as_deref() == Some(current_fingerprint.as_str()) {
                continue;
            }

            let conversation = match parser.parse(&source) {
                Ok(c) => c,
                Err(e) => {
                    warn!(path = %source.path.display(), error = %e, "conversation watcher: parse failed, skipping");
                    continue;
                }
            };

            match engine.push_conversation_delta(&conversation).await {
                Ok(()) => {
                    let _ = engine.store().set_meta(&seen_key, &current_fingerprint);
                    info!(session = %conversation.id, "conversation watcher: delta pushed");
                }
                Err(e) => {
                    warn!(session = %conversation.id, error = %e, "conversation watcher: push failed, cursor not advanced");
                }
            }
        }
    }
}

/// `size:mtime_secs`, used to decide whether a transcript file changed since
/// it was last observed (§4.9).
fn file_fingerprint(path: &std::path::Path) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = meta
        .modified()
        .ok()?
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    Some(format!("{}:{}", meta.len(), mtime))
}
