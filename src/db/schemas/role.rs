//! Role document schema

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::db::schemas::IntoIndexes;
use crate::db::store::IndexSpec;

/// Collection name for roles
pub const ROLE_COLLECTION: &str = "roles";

/// Tag of the role every new user receives
pub const DEFAULT_ROLE_TAG: &str = "default";
/// Display name of the default role
pub const DEFAULT_ROLE_NAME: &str = "user";
/// Tag of the administrator role
pub const ADMIN_ROLE_TAG: &str = "admin";
/// Display name of the administrator role
pub const ADMIN_ROLE_NAME: &str = "admin";

/// Role document
///
/// `tag` is the stable key other records reference; `name` is for display
/// and may be renamed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RoleDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub tag: String,
    pub name: String,
}

impl RoleDoc {
    pub fn new(tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            _id: None,
            tag: tag.into(),
            name: name.into(),
        }
    }
}

impl IntoIndexes for RoleDoc {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::unique("tag", "tag_unique"),
            IndexSpec::unique("name", "name_unique"),
        ]
    }
}
