//! Content type document schema

use std::collections::BTreeMap;

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{FieldSchema, IntoIndexes, MutMetadata};
use crate::db::store::IndexSpec;

/// Collection name for content type definitions
pub const CONTENT_TYPE_COLLECTION: &str = "contenttypes";

/// HTTP methods a content type grants roles for
pub const CONTENT_METHODS: [&str; 4] = ["GET", "POST", "PATCH", "DELETE"];

/// Method name to the role tags allowed to call it
pub type Permissions = BTreeMap<String, Vec<String>>;

/// Content type definition
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ContentTypeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// Singular type name, e.g. `blogpost`
    pub typename: String,

    /// Backing collection, e.g. `blogposts`
    pub collection: String,

    #[serde(default)]
    pub permissions: Permissions,

    #[serde(default)]
    pub field_schema: FieldSchema,
}

impl ContentTypeDoc {
    pub fn new(
        typename: impl Into<String>,
        collection: impl Into<String>,
        permissions: Permissions,
        field_schema: FieldSchema,
    ) -> Self {
        Self {
            typename: typename.into(),
            collection: collection.into(),
            permissions,
            field_schema,
            ..Default::default()
        }
    }

    /// Role tags allowed to call `method`; empty if the method is not listed
    pub fn roles_for(&self, method: &str) -> &[String] {
        self.permissions
            .get(&method.to_ascii_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every role tag referenced by the permission map
    pub fn referenced_roles(&self) -> impl Iterator<Item = &String> {
        self.permissions.values().flatten()
    }
}

/// Same role list for every content method
pub fn uniform_permissions(tags: &[&str]) -> Permissions {
    CONTENT_METHODS
        .iter()
        .map(|method| {
            (
                method.to_string(),
                tags.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

impl IntoIndexes for ContentTypeDoc {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::unique("typename", "typename_unique"),
            IndexSpec::unique("collection", "collection_unique"),
        ]
    }
}

impl MutMetadata for ContentTypeDoc {
    fn timestamps(&mut self) -> (&mut Option<DateTime>, &mut Option<DateTime>) {
        (&mut self.created_at, &mut self.updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_for_is_case_insensitive() {
        let mut permissions = Permissions::new();
        permissions.insert("POST".into(), vec!["admin".into()]);
        let ct = ContentTypeDoc::new("blogpost", "blogposts", permissions, FieldSchema::new());

        assert_eq!(ct.roles_for("post"), ["admin".to_string()]);
        assert!(ct.roles_for("DELETE").is_empty());
    }

    #[test]
    fn test_uniform_permissions() {
        let permissions = uniform_permissions(&["default", "admin"]);
        assert_eq!(permissions.len(), 4);
        assert_eq!(permissions["PATCH"], vec!["default", "admin"]);
    }
}
