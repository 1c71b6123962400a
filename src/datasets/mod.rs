//! Per-level dataset loading: retrieval back-ends, the keyed store and the
//! lazy cache on top of them.

pub mod cache;
pub mod retrieval;
pub mod store;

pub use cache::{DatasetCache, DatasetError, LevelLoadError};
#[cfg(feature = "tokio-runtime")]
pub use retrieval::FileRetriever;
pub use retrieval::{HttpRetriever, RetrievalError, Retriever, StaticRetriever};
pub use store::{Component, ComponentData, DatasetStore, ReadyLevel};
