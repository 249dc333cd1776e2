//! krill: posting-set algebra core for a peer-to-peer web search engine
//!
//! For each indexed term this crate stores the set of document references
//! (postings) that contain the term, and provides the set algebra
//! (AND / NOT) and proximity scoring that combine per-term postings into
//! multi-term search results. Containers cross peer boundaries through
//! the domain-compressed wire codec.

pub mod algebra;
pub mod codec;
pub mod config;
pub mod error;
pub mod index;
pub mod store;

pub use algebra::{
    choose_strategy, exclude_containers, exclude_destructive, join, join_containers,
    join_exclude, JoinStrategy,
};
pub use codec::{compress, decompress, PeerMap};
pub use config::EngineSettings;
pub use error::{KrillError, Result};
pub use index::{
    url_entry_schema, KeyOrdering, ReferenceContainer, ReferenceEntry, RowSchema,
};
pub use store::{DocumentMetadata, MemoryMetadataStore, MetadataStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
