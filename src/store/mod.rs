//! Document-metadata store facade
//!
//! The posting core only needs two operations from the full-text store:
//! fetch metadata for a document key, and persist metadata. Everything
//! else about the store (sharding, export, remote connections) lives
//! behind this trait in the host application.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata for one indexed document, addressed by its document hash
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Document hash, same key space as the posting containers
    pub key: Vec<u8>,
    pub url: String,
    pub title: String,
    /// Logical timestamp of the last modification
    pub last_modified: u64,
}

impl DocumentMetadata {
    pub fn new(key: impl Into<Vec<u8>>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            title: String::new(),
            last_modified: 0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_last_modified(mut self, last_modified: u64) -> Self {
        self.last_modified = last_modified;
        self
    }
}

/// Minimal surface of the external document store
pub trait MetadataStore {
    /// Fetch document metadata by document hash
    fn fetch_metadata(&self, key: &[u8]) -> Option<DocumentMetadata>;

    /// Persist document metadata
    fn persist_metadata(&self, doc: DocumentMetadata) -> Result<()>;
}

/// In-memory metadata store for tests and single-node use
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    docs: DashMap<Vec<u8>, DocumentMetadata>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn fetch_metadata(&self, key: &[u8]) -> Option<DocumentMetadata> {
        self.docs.get(key).map(|doc| doc.clone())
    }

    fn persist_metadata(&self, doc: DocumentMetadata) -> Result<()> {
        self.docs.insert(doc.key.clone(), doc);
        Ok(())
    }
}
