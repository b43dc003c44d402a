//! Content type registry
//!
//! Owns content type definitions. Each type names one backing collection;
//! type names and collection names are unique across all types.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::{AccessGate, Caller};
use crate::db::schemas::{
    ContentTypeDoc, FieldSchema, Permissions, CONTENT_TYPE_COLLECTION, ROLE_COLLECTION,
    USER_COLLECTION,
};
use crate::db::{Database, Patch};
use crate::services::roles::{RoleReferences, RoleRegistry};
use crate::types::{FolioError, Result};

/// Collection names a content type may not claim
const RESERVED_COLLECTIONS: [&str; 9] = [
    CONTENT_TYPE_COLLECTION,
    ROLE_COLLECTION,
    USER_COLLECTION,
    "role",
    "user",
    "auth",
    "api",
    "health",
    "version",
];

/// Body of a create request
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContentTypeInput {
    pub typename: String,
    pub collection: String,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub field_schema: FieldSchema,
}

/// Body of a partial update; absent keys are left untouched
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContentTypeUpdate {
    #[serde(default)]
    pub typename: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
    #[serde(default)]
    pub field_schema: Option<FieldSchema>,
}

/// Parse a hex id, failing with `InvalidArgument`
pub fn parse_object_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| FolioError::InvalidArgument(format!("invalid id: {id}")))
}

fn check_collection_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if name.is_empty() || !valid_chars {
        return Err(FolioError::InvalidArgument(format!(
            "invalid collection name '{name}'"
        )));
    }
    if RESERVED_COLLECTIONS.contains(&name) {
        return Err(FolioError::InvalidArgument(format!(
            "collection name '{name}' is reserved"
        )));
    }
    Ok(())
}

fn normalize_permissions(permissions: Permissions) -> Permissions {
    let mut normalized = Permissions::new();
    for (method, tags) in permissions {
        let entry: &mut Vec<String> = normalized.entry(method.to_ascii_uppercase()).or_default();
        for tag in tags {
            if !entry.contains(&tag) {
                entry.push(tag);
            }
        }
    }
    normalized
}

#[derive(Clone)]
pub struct ContentTypeRegistry {
    db: Database,
    roles: RoleRegistry,
}

impl ContentTypeRegistry {
    pub fn new(db: Database, roles: RoleRegistry) -> Self {
        Self { db, roles }
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    async fn find(&self, filter: Document) -> Result<Option<ContentTypeDoc>> {
        self.db.find_one_as(CONTENT_TYPE_COLLECTION, filter).await
    }

    pub async fn create_content_type(&self, input: ContentTypeInput) -> Result<ContentTypeDoc> {
        let typename = input.typename.trim().to_string();
        let collection = input.collection.trim().to_string();
        if typename.is_empty() {
            return Err(FolioError::InvalidArgument("typename is required".into()));
        }
        check_collection_name(&collection)?;

        if self.find(doc! { "typename": typename.as_str() }).await?.is_some() {
            return Err(FolioError::Conflict(format!(
                "content type with typename '{typename}' already exists"
            )));
        }
        if self.find(doc! { "collection": collection.as_str() }).await?.is_some() {
            return Err(FolioError::Conflict(format!(
                "content type with collection '{collection}' already exists"
            )));
        }

        let permissions = normalize_permissions(input.permissions);
        self.roles
            .validate_tags(permissions.values().flatten())
            .await?;

        let mut content_type =
            ContentTypeDoc::new(typename, collection, permissions, input.field_schema);
        content_type._id = Some(ObjectId::new());
        self.db
            .insert_as(CONTENT_TYPE_COLLECTION, &mut content_type)
            .await?;

        info!(
            typename = %content_type.typename,
            collection = %content_type.collection,
            "Created content type"
        );
        Ok(content_type)
    }

    /// First content type matching `filter`
    pub async fn get_content_type(&self, filter: Document) -> Result<ContentTypeDoc> {
        self.find(filter)
            .await?
            .ok_or_else(|| FolioError::NotFound("content type".into()))
    }

    pub async fn get_content_type_by_id(&self, id: &str) -> Result<ContentTypeDoc> {
        let oid = parse_object_id(id)?;
        self.get_content_type(doc! { "_id": oid }).await
    }

    pub async fn get_content_type_by_typename(&self, typename: &str) -> Result<ContentTypeDoc> {
        self.get_content_type(doc! { "typename": typename }).await
    }

    pub async fn get_content_type_by_collection(&self, collection: &str) -> Result<ContentTypeDoc> {
        self.find(doc! { "collection": collection })
            .await?
            .ok_or_else(|| FolioError::NotFound(format!("collection: {collection}")))
    }

    /// Every content type matching `filter`; `NotFound` if none
    pub async fn list_content_types(&self, filter: Document) -> Result<Vec<ContentTypeDoc>> {
        let found: Vec<ContentTypeDoc> = self.db.find_as(CONTENT_TYPE_COLLECTION, filter).await?;
        if found.is_empty() {
            return Err(FolioError::NotFound("no content types match".into()));
        }
        Ok(found)
    }

    pub async fn update_content_type(
        &self,
        id: &str,
        update: ContentTypeUpdate,
    ) -> Result<ContentTypeDoc> {
        let oid = parse_object_id(id)?;
        let current = self.get_content_type(doc! { "_id": oid }).await?;
        let mut set = Document::new();

        if let Some(typename) = update.typename.map(|t| t.trim().to_string()) {
            if typename.is_empty() {
                return Err(FolioError::InvalidArgument("typename is required".into()));
            }
            if typename != current.typename {
                if self.find(doc! { "typename": typename.as_str() }).await?.is_some() {
                    return Err(FolioError::Conflict(format!(
                        "content type with typename '{typename}' already exists"
                    )));
                }
                set.insert("typename", typename);
            }
        }

        if let Some(collection) = update.collection.map(|c| c.trim().to_string()) {
            if collection != current.collection {
                check_collection_name(&collection)?;
                if self.find(doc! { "collection": collection.as_str() }).await?.is_some() {
                    return Err(FolioError::Conflict(format!(
                        "content type with collection '{collection}' already exists"
                    )));
                }
                // Content is not moved between collections
                if self.db.find_one(&current.collection, doc! {}).await?.is_some() {
                    return Err(FolioError::InvalidArgument(format!(
                        "collection '{}' still holds content",
                        current.collection
                    )));
                }
                set.insert("collection", collection);
            }
        }

        if let Some(permissions) = update.permissions {
            let permissions = normalize_permissions(permissions);
            self.roles
                .validate_tags(permissions.values().flatten())
                .await?;
            set.insert("permissions", bson::to_bson(&permissions)?);
        }

        if let Some(field_schema) = update.field_schema {
            set.insert("field_schema", bson::to_bson(&field_schema)?);
        }

        self.db
            .update_one(CONTENT_TYPE_COLLECTION, doc! { "_id": oid }, Patch::set(set))
            .await?;

        info!(id, "Updated content type");
        self.get_content_type(doc! { "_id": oid }).await
    }

    /// Drop the backing collection, then delete the definition
    pub async fn delete_content_type(&self, id: &str) -> Result<ContentTypeDoc> {
        let oid = parse_object_id(id)?;
        let content_type = self.get_content_type(doc! { "_id": oid }).await?;

        self.db.drop_collection(&content_type.collection).await?;
        self.db
            .delete_one(CONTENT_TYPE_COLLECTION, doc! { "_id": oid })
            .await?;

        info!(
            typename = %content_type.typename,
            collection = %content_type.collection,
            "Deleted content type and its collection"
        );
        Ok(content_type)
    }

    /// Whether a content type backs `collection`
    pub async fn is_valid_collection(&self, collection: &str) -> Result<bool> {
        Ok(self.find(doc! { "collection": collection }).await?.is_some())
    }

    /// Declared field schema of the type backing `collection`
    pub async fn get_custom_fields(&self, collection: &str) -> Result<FieldSchema> {
        Ok(self
            .get_content_type_by_collection(collection)
            .await?
            .field_schema)
    }

    /// Strip `tag` from every method's role list of `content_type`
    ///
    /// Methods left without roles are dropped from the map; either way only
    /// admins may invoke them.
    pub async fn remove_role_from_permissions(
        &self,
        tag: &str,
        content_type: &ContentTypeDoc,
    ) -> Result<()> {
        let permissions: Permissions = content_type
            .permissions
            .iter()
            .filter_map(|(method, tags)| {
                let kept: Vec<String> = tags.iter().filter(|t| *t != tag).cloned().collect();
                (!kept.is_empty()).then(|| (method.clone(), kept))
            })
            .collect();

        let Some(oid) = content_type._id else {
            return Err(FolioError::Internal("content type without id".into()));
        };
        self.db
            .update_one(
                CONTENT_TYPE_COLLECTION,
                doc! { "_id": oid },
                Patch::set(doc! { "permissions": bson::to_bson(&permissions)? }),
            )
            .await?;
        debug!(tag, typename = %content_type.typename, "Removed role from permissions");
        Ok(())
    }

    /// Resolve the type backing `collection` and check `caller` may
    /// invoke `method` on it
    pub async fn authorize(
        &self,
        caller: &Caller,
        method: &str,
        collection: &str,
    ) -> Result<ContentTypeDoc> {
        let content_type = self.get_content_type_by_collection(collection).await?;
        AccessGate::authorize(caller, method, &content_type)?;
        Ok(content_type)
    }

    /// Create the type unless one with the same typename exists
    pub async fn ensure_content_type(&self, input: ContentTypeInput) -> Result<()> {
        if self
            .find(doc! { "typename": input.typename.as_str() })
            .await?
            .is_some()
        {
            debug!(typename = %input.typename, "Content type already present");
            return Ok(());
        }
        self.create_content_type(input).await?;
        Ok(())
    }
}

#[async_trait]
impl RoleReferences for ContentTypeRegistry {
    async fn strip_role(&self, tag: &str) -> Result<u64> {
        let all: Vec<ContentTypeDoc> = self.db.find_as(CONTENT_TYPE_COLLECTION, doc! {}).await?;
        let mut changed = 0;
        for content_type in all.iter().filter(|ct| ct.referenced_roles().any(|t| t == tag)) {
            self.remove_role_from_permissions(tag, content_type).await?;
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{uniform_permissions, FieldKind};

    async fn registry() -> ContentTypeRegistry {
        let db = Database::in_memory();
        let roles = RoleRegistry::new(db.clone());
        roles.create_role("default", "user").await.unwrap();
        roles.create_role("admin", "admin").await.unwrap();
        ContentTypeRegistry::new(db, roles)
    }

    fn input(typename: &str, collection: &str) -> ContentTypeInput {
        ContentTypeInput {
            typename: typename.into(),
            collection: collection.into(),
            permissions: uniform_permissions(&["default", "admin"]),
            field_schema: [("text".to_string(), FieldKind::String)].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let types = registry().await;
        let created = types.create_content_type(input("blogpost", "blogposts")).await.unwrap();

        assert!(created._id.is_some());
        assert!(created.created_at.is_some());
        let by_id = types
            .get_content_type_by_id(&created._id.unwrap().to_hex())
            .await
            .unwrap();
        assert_eq!(by_id.typename, "blogpost");
        assert!(types.is_valid_collection("blogposts").await.unwrap());
        assert!(!types.is_valid_collection("events").await.unwrap());
        assert_eq!(
            types.get_custom_fields("blogposts").await.unwrap()["text"],
            FieldKind::String
        );
    }

    #[tokio::test]
    async fn test_duplicate_typename_and_collection() {
        let types = registry().await;
        types.create_content_type(input("blogpost", "blogposts")).await.unwrap();

        let err = types
            .create_content_type(input("blogpost", "articles"))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Conflict(ref m) if m.contains("typename")));

        let err = types
            .create_content_type(input("article", "blogposts"))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Conflict(ref m) if m.contains("collection")));
    }

    #[tokio::test]
    async fn test_unknown_role_in_permissions() {
        let types = registry().await;
        let mut bad = input("event", "events");
        bad.permissions.insert("post".into(), vec!["ghost".into()]);

        let err = types.create_content_type(bad).await.unwrap_err();
        assert_eq!(err.to_string(), "Not found: role: ghost");
        assert!(!types.is_valid_collection("events").await.unwrap());
    }

    #[tokio::test]
    async fn test_permission_methods_normalized() {
        let types = registry().await;
        let mut lower = input("event", "events");
        lower.permissions = [("post".to_string(), vec!["admin".to_string()])]
            .into_iter()
            .collect();
        let created = types.create_content_type(lower).await.unwrap();
        assert_eq!(created.roles_for("POST"), ["admin".to_string()]);
    }

    #[tokio::test]
    async fn test_reserved_collection_rejected() {
        let types = registry().await;
        let err = types
            .create_content_type(input("account", "users"))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_update_conflict_leaves_state() {
        let types = registry().await;
        types.create_content_type(input("blogpost", "blogposts")).await.unwrap();
        let event = types.create_content_type(input("event", "events")).await.unwrap();
        let id = event._id.unwrap().to_hex();

        let err = types
            .update_content_type(
                &id,
                ContentTypeUpdate {
                    typename: Some("blogpost".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Conflict(_)));
        assert_eq!(types.get_content_type_by_id(&id).await.unwrap().typename, "event");

        let err = types
            .update_content_type(
                &id,
                ContentTypeUpdate {
                    typename: Some("happening".into()),
                    collection: Some("blogposts".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Conflict(ref m) if m.contains("collection")));
        let unchanged = types.get_content_type_by_id(&id).await.unwrap();
        assert_eq!(unchanged.typename, "event");
        assert_eq!(unchanged.collection, "events");
        assert!(types.get_content_type_by_typename("happening").await.is_err());

        // Unchanged values are not conflicts with itself
        let same = types
            .update_content_type(
                &id,
                ContentTypeUpdate {
                    typename: Some("event".into()),
                    collection: Some("events".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.collection, "events");
    }

    #[tokio::test]
    async fn test_collection_rename() {
        let types = registry().await;
        let event = types.create_content_type(input("event", "events")).await.unwrap();
        let id = event._id.unwrap().to_hex();
        let rename = |collection: &str| ContentTypeUpdate {
            collection: Some(collection.into()),
            ..Default::default()
        };

        types
            .db
            .insert_one("events", doc! { "title": "Meetup" })
            .await
            .unwrap();
        let err = types.update_content_type(&id, rename("meetups")).await.unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument(ref m) if m.contains("still holds content")));
        assert!(types.is_valid_collection("events").await.unwrap());

        types
            .db
            .delete_one("events", doc! { "title": "Meetup" })
            .await
            .unwrap();
        let renamed = types.update_content_type(&id, rename("meetups")).await.unwrap();
        assert_eq!(renamed.collection, "meetups");
        assert!(types.is_valid_collection("meetups").await.unwrap());
        assert!(!types.is_valid_collection("events").await.unwrap());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let types = registry().await;
        let created = types.create_content_type(input("event", "events")).await.unwrap();
        let id = created._id.unwrap().to_hex();

        let updated = types
            .update_content_type(
                &id,
                ContentTypeUpdate {
                    permissions: Some(
                        [("DELETE".to_string(), vec!["admin".to_string()])]
                            .into_iter()
                            .collect(),
                    ),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.typename, "event");
        assert_eq!(updated.field_schema, created.field_schema);
        assert!(updated.roles_for("GET").is_empty());
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_delete_drops_collection() {
        let types = registry().await;
        let created = types.create_content_type(input("blogpost", "blogposts")).await.unwrap();
        types
            .db
            .insert_one("blogposts", doc! { "title": "hello" })
            .await
            .unwrap();

        types
            .delete_content_type(&created._id.unwrap().to_hex())
            .await
            .unwrap();

        assert!(!types.is_valid_collection("blogposts").await.unwrap());
        assert!(!types
            .db
            .collection_names()
            .await
            .unwrap()
            .contains(&"blogposts".to_string()));

        let err = types.delete_content_type(&created._id.unwrap().to_hex()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = types.delete_content_type("nope").await.unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_strip_role() {
        let types = registry().await;
        types.create_content_type(input("blogpost", "blogposts")).await.unwrap();
        let mut admin_only = input("event", "events");
        admin_only.permissions = uniform_permissions(&["admin"]);
        types.create_content_type(admin_only).await.unwrap();

        let changed = types.strip_role("default").await.unwrap();
        assert_eq!(changed, 1);

        let blog = types.get_content_type_by_typename("blogpost").await.unwrap();
        assert!(blog.referenced_roles().all(|t| t != "default"));
        assert_eq!(blog.roles_for("GET"), ["admin".to_string()]);

        // Methods whose only role was stripped disappear from the map
        assert_eq!(types.strip_role("admin").await.unwrap(), 2);
        let event = types.get_content_type_by_typename("event").await.unwrap();
        assert!(event.permissions.is_empty());
        assert!(event.roles_for("POST").is_empty());
    }
}
