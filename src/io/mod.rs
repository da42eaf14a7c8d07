//! Parameter loading and run-metadata export

pub mod params;
pub mod metadata;

// Re-export main types
pub use params::RetrievalParams;
pub use metadata::{RunMetadata, read_metadata, write_metadata};
