pub mod posting;
pub mod positional;
pub mod index_file;

pub use positional::{PositionalIndex, RemovedPostings};
pub use index_file::IndexFile;
