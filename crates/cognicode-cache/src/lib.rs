pub mod cache;
pub mod result_cache;

pub use cache::*;
pub use result_cache::*;

// Re-export common types for convenience
pub use cognicode_core::Fingerprint;
