pub mod build;
pub mod chunk;
pub mod replay;

pub use build::{create_shard, deserialize_shard, fact_to_upsert_op, pending_deletion_to_op, serialize_shard};
pub use chunk::{check_operation_fits_alone, chunk_operations};
pub use replay::replay;
