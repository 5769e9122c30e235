//! habmap Store - In-memory caches for normalized layers and documents
//!
//! This crate defines the port the caches load geometry through and the
//! bounded, batch-evicting LRU caches that sit in front of it.

pub mod batch_lru;
pub mod documents;
pub mod ports;
pub mod resolution;
pub mod stats;

pub use batch_lru::BatchLru;
pub use documents::{DocumentCache, DocumentKey};
pub use ports::GeometrySource;
pub use resolution::ResolutionCache;
pub use stats::CacheStats;
