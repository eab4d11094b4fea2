pub mod conversations;
pub mod engine;
pub mod recover;
pub mod tags;

pub use engine::SyncEngine;
pub use recover::pull_and_reconstruct;
