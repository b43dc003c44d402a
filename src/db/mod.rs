//! Database layer
//!
//! [`Database`] is the handle passed down to every registry. It owns an
//! [`DocumentStore`] backend and bounds each call by a fixed deadline.

pub mod memory;
pub mod mongo;
pub mod schemas;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, IndexSpec, Patch};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bson::Document;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::types::{FolioError, Result};
use schemas::{IntoIndexes, MutMetadata};

/// Default per-call store deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Store handle with a per-call timeout
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl Database {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Fresh in-process store with the default timeout
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, op: &str, collection: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(FolioError::Timeout(format!(
                "{op} on {collection} exceeded {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    pub async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        self.bounded("find", collection, self.store.find(collection, filter))
            .await
    }

    /// Find and decode every match
    pub async fn find_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<T>> {
        self.find(collection, filter)
            .await?
            .into_iter()
            .map(|doc| bson::from_document(doc).map_err(FolioError::from))
            .collect()
    }

    pub async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        self.bounded("find_one", collection, self.store.find_one(collection, filter))
            .await
    }

    /// Find and decode the first match
    pub async fn find_one_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<T>> {
        match self.find_one(collection, filter).await? {
            Some(doc) => Ok(Some(bson::from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn insert_one(&self, collection: &str, doc: Document) -> Result<()> {
        self.bounded("insert", collection, self.store.insert_one(collection, doc))
            .await
    }

    /// Stamp metadata, encode and insert a typed record
    pub async fn insert_as<T: Serialize + MutMetadata>(
        &self,
        collection: &str,
        item: &mut T,
    ) -> Result<()> {
        item.init_metadata();
        let doc = bson::to_document(item)?;
        self.insert_one(collection, doc).await
    }

    pub async fn update_one(&self, collection: &str, filter: Document, patch: Patch) -> Result<u64> {
        self.bounded(
            "update",
            collection,
            self.store.update_one(collection, filter, patch),
        )
        .await
    }

    pub async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        self.bounded("delete", collection, self.store.delete_one(collection, filter))
            .await
    }

    pub async fn drop_collection(&self, collection: &str) -> Result<()> {
        info!(collection, "Dropping collection");
        self.bounded("drop", collection, self.store.drop_collection(collection))
            .await
    }

    pub async fn collection_names(&self) -> Result<Vec<String>> {
        self.bounded("list", "*", self.store.collection_names()).await
    }

    /// Create every index a schema declares
    pub async fn apply_indexes<T: IntoIndexes>(&self, collection: &str) -> Result<()> {
        for index in T::into_indices() {
            debug!(collection, index = index.name, "Ensuring index");
            self.bounded("index", collection, self.store.create_index(collection, index))
                .await?;
        }
        Ok(())
    }

    /// Release the backend at shutdown
    pub async fn close(&self) {
        self.store.close().await;
    }
}
