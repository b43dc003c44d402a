//! MongoDB document store

use async_trait::async_trait;
use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{
    error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use tracing::{debug, info};

use crate::db::store::{DocumentStore, IndexSpec, Patch};
use crate::types::{FolioError, Result};

/// Server error code for unique index violations
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed [`DocumentStore`]
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect and verify the connection with a ping
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| FolioError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| FolioError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.client.database(&self.db_name).collection::<Document>(name)
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

fn is_duplicate_key(e: &MongoError) -> bool {
    match e.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        MongoErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn store_error(op: &str, collection: &str, e: MongoError) -> FolioError {
    if is_duplicate_key(&e) {
        FolioError::Conflict(format!("{collection}: duplicate key on {op}"))
    } else {
        FolioError::Database(format!("{op} on {collection} failed: {e}"))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        debug!(collection, ?filter, "find");
        let cursor = self
            .collection(collection)
            .find(filter)
            .await
            .map_err(|e| store_error("find", collection, e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| store_error("find", collection, e))
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        debug!(collection, ?filter, "find_one");
        self.collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| store_error("find_one", collection, e))
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()> {
        self.collection(collection)
            .insert_one(doc)
            .await
            .map_err(|e| store_error("insert", collection, e))?;
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: Document, patch: Patch) -> Result<u64> {
        if patch.is_empty() {
            return Ok(self.find_one(collection, filter).await?.map_or(0, |_| 1));
        }

        let result = self
            .collection(collection)
            .update_one(filter, patch.to_update_document())
            .await
            .map_err(|e| store_error("update", collection, e))?;

        Ok(result.matched_count)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        let result = self
            .collection(collection)
            .delete_one(filter)
            .await
            .map_err(|e| store_error("delete", collection, e))?;

        Ok(result.deleted_count)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collection(collection)
            .drop()
            .await
            .map_err(|e| store_error("drop", collection, e))
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        self.client
            .database(&self.db_name)
            .list_collection_names()
            .await
            .map_err(|e| FolioError::Database(format!("Failed to list collections: {e}")))
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<()> {
        let model = IndexModel::builder()
            .keys(index.keys)
            .options(
                IndexOptions::builder()
                    .unique(index.unique)
                    .name(index.name.to_string())
                    .build(),
            )
            .build();

        self.collection(collection)
            .create_index(model)
            .await
            .map_err(|e| {
                FolioError::Database(format!("Failed to create index on {collection}: {e}"))
            })?;

        Ok(())
    }

    async fn close(&self) {
        info!("Closing MongoDB connections");
        self.client.clone().shutdown().await;
    }
}
