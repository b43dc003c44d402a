//! Document store abstraction
//!
//! The rest of Folio talks to storage only through [`DocumentStore`]: a
//! black box supporting find/insert/update/delete with a filter document.
//! [`super::MongoStore`] backs it with MongoDB, [`super::MemoryStore`] keeps
//! everything in process for dev mode and tests.

use async_trait::async_trait;
use bson::{doc, Document};

use crate::db::schemas::UPDATED_AT;
use crate::types::Result;

/// Index definition declared by a schema
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Index keys, e.g. `{ "tag": 1 }`
    pub keys: Document,
    /// Index name
    pub name: &'static str,
    /// Whether the index rejects duplicate values
    pub unique: bool,
}

impl IndexSpec {
    /// Unique ascending index on a single field
    pub fn unique(field: &str, name: &'static str) -> Self {
        Self {
            keys: doc! { field: 1 },
            name,
            unique: true,
        }
    }
}

/// Update applied by [`DocumentStore::update_one`]
///
/// `set` is a partial merge of top-level keys (`$set`); `touch_updated_at`
/// stamps `updated_at` with the server time (`$currentDate`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub set: Document,
    pub touch_updated_at: bool,
}

impl Patch {
    /// Merge `set` and bump `updated_at`
    pub fn set(set: Document) -> Self {
        Self {
            set,
            touch_updated_at: true,
        }
    }

    /// Only bump `updated_at`
    pub fn touch() -> Self {
        Self {
            set: Document::new(),
            touch_updated_at: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && !self.touch_updated_at
    }

    /// MongoDB update document for this patch
    pub fn to_update_document(&self) -> Document {
        let mut update = Document::new();
        if !self.set.is_empty() {
            update.insert("$set", self.set.clone());
        }
        if self.touch_updated_at {
            update.insert("$currentDate", doc! { UPDATED_AT: true });
        }
        update
    }
}

/// Storage backend for all Folio collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection` matching `filter`
    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>>;

    /// First document in `collection` matching `filter`
    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>>;

    /// Insert a document; the caller assigns `_id`
    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()>;

    /// Apply `patch` to the first match. Returns the matched count.
    async fn update_one(&self, collection: &str, filter: Document, patch: Patch) -> Result<u64>;

    /// Delete the first match. Returns the deleted count.
    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64>;

    /// Drop a whole collection
    async fn drop_collection(&self, collection: &str) -> Result<()>;

    /// Names of all existing collections
    async fn collection_names(&self) -> Result<Vec<String>>;

    /// Create an index (idempotent)
    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<()>;

    /// Release connections at shutdown
    async fn close(&self) {}
}
