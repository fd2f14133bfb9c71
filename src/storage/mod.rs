pub mod layout;
pub mod file_lock;
pub mod vector_store;
pub mod shard;

pub use shard::{PodShard, PodStore, ShardSet, SharedShard};
pub use vector_store::{StoredRow, VectorStore};
