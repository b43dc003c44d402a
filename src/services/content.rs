//! Content store
//!
//! Generic CRUD over per-type collections. Every entry carries the id of
//! the content type whose collection holds it.

use bson::{doc, oid::ObjectId, DateTime, Document};
use tracing::info;

use crate::db::schemas::{
    check_field_names, coerce_fields, json_to_document, validate_fields, ContentDoc,
    ContentInput, ContentTypeDoc, ContentUpdate, PUBLISHED, TAGS, TITLE,
};
use crate::db::{Database, Patch};
use crate::query::{translate, FieldRegistry, QueryParams};
use crate::services::content_types::{parse_object_id, ContentTypeRegistry};
use crate::types::{FolioError, Result};

#[derive(Clone)]
pub struct ContentStore {
    db: Database,
    types: ContentTypeRegistry,
    /// Validate fields against the declared schema on write
    strict: bool,
}

impl ContentStore {
    pub fn new(db: Database, types: ContentTypeRegistry, strict: bool) -> Self {
        Self { db, types, strict }
    }

    /// Reserved-name check, timestamp coercion and, in strict mode,
    /// schema validation
    fn prepare_fields(&self, content_type: &ContentTypeDoc, mut fields: Document) -> Result<Document> {
        check_field_names(&fields)?;
        coerce_fields(&content_type.field_schema, &mut fields);
        if self.strict {
            validate_fields(&content_type.field_schema, &fields)?;
        }
        Ok(fields)
    }

    pub async fn create_content(&self, collection: &str, input: ContentInput) -> Result<ContentDoc> {
        let content_type = self.types.get_content_type_by_collection(collection).await?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(FolioError::InvalidArgument("title is required".into()));
        }
        let fields = self.prepare_fields(&content_type, json_to_document(input.fields)?)?;

        let now = DateTime::now();
        let content = ContentDoc {
            id: Some(ObjectId::new()),
            created_at: Some(now),
            updated_at: Some(now),
            content_type_id: content_type._id,
            title,
            published: input.published,
            tags: input.tags,
            fields,
        };
        self.db.insert_one(collection, content.to_document()).await?;

        info!(collection, id = ?content.id, "Created content");
        Ok(content)
    }

    pub async fn get_content_by_id(&self, collection: &str, id: &str) -> Result<ContentDoc> {
        let oid = parse_object_id(id)?;
        self.ensure_collection(collection).await?;
        match self.db.find_one(collection, doc! { "_id": oid }).await? {
            Some(doc) => ContentDoc::from_document(doc),
            None => Err(FolioError::NotFound(format!("content {id} in {collection}"))),
        }
    }

    /// Every entry matching `filter`; `NotFound` when nothing matches
    pub async fn get_content(&self, collection: &str, filter: Document) -> Result<Vec<ContentDoc>> {
        self.ensure_collection(collection).await?;
        let docs = self.db.find(collection, filter).await?;
        if docs.is_empty() {
            return Err(FolioError::NotFound(format!("no content in {collection} matches")));
        }
        docs.into_iter().map(ContentDoc::from_document).collect()
    }

    /// Translate query parameters against the type's fields, then
    /// [`ContentStore::get_content`]
    pub async fn query_content(&self, collection: &str, params: &QueryParams) -> Result<Vec<ContentDoc>> {
        let content_type = self.types.get_content_type_by_collection(collection).await?;
        let filter = translate(params, &FieldRegistry::content(&content_type.field_schema))?;
        self.get_content(collection, filter).await
    }

    pub async fn get_all_content(&self, collection: &str) -> Result<Vec<ContentDoc>> {
        self.get_content(collection, doc! {}).await
    }

    /// Merge the supplied attributes and fields; bumps `updated_at`
    pub async fn update_content(
        &self,
        collection: &str,
        id: &str,
        update: ContentUpdate,
    ) -> Result<ContentDoc> {
        let oid = parse_object_id(id)?;
        let content_type = self.types.get_content_type_by_collection(collection).await?;

        let mut set = Document::new();
        if let Some(title) = update.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(FolioError::InvalidArgument("title must not be empty".into()));
            }
            set.insert(TITLE, title);
        }
        if let Some(published) = update.published {
            set.insert(PUBLISHED, published);
        }
        if let Some(tags) = update.tags {
            set.insert(TAGS, tags);
        }
        if let Some(fields) = update.fields {
            let fields = self.prepare_fields(&content_type, json_to_document(fields)?)?;
            for (key, value) in fields {
                set.insert(key, value);
            }
        }

        let matched = self
            .db
            .update_one(collection, doc! { "_id": oid }, Patch::set(set))
            .await?;
        if matched == 0 {
            return Err(FolioError::NotFound(format!("content {id} in {collection}")));
        }

        info!(collection, id, "Updated content");
        self.get_content_by_id(collection, id).await
    }

    pub async fn delete_content(&self, collection: &str, id: &str) -> Result<ContentDoc> {
        let existing = self.get_content_by_id(collection, id).await?;
        let oid = parse_object_id(id)?;
        self.db.delete_one(collection, doc! { "_id": oid }).await?;

        info!(collection, id, "Deleted content");
        Ok(existing)
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        if self.types.is_valid_collection(collection).await? {
            Ok(())
        } else {
            Err(FolioError::NotFound(format!("collection: {collection}")))
        }
    }
}
