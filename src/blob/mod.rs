mod storage;
pub mod thumbnail;

pub use storage::{BlobStore, sanitize_filename};
