use std::path::PathBuf;

use permamind_core::error::MemoryError;
use permamind_core::types::{Client, Conversation};

/// One candidate transcript file discovered on disk (§6). Path traversal
/// itself is an external, deterministic concern — this crate only consumes
/// the results.
#[derive(Clone, Debug)]
pub struct TranscriptSource {
    pub path: PathBuf,
    pub client: Client,
    pub project: String,
    pub session_id: String,
}

/// Yields the current set of candidate transcript files. Implemented outside
/// this system (§1 Non-goals: transcript parsers / discovery are external
/// collaborators).
pub trait TranscriptDiscovery: Send + Sync {
    fn discover(&self) -> Vec<TranscriptSource>;
}

/// Parses one transcript source into a canonical [`Conversation`].
/// Implemented per client outside this system.
pub trait TranscriptParser: Send + Sync {
    fn parse(&self, source: &TranscriptSource) -> Result<Conversation, MemoryError>;
}
