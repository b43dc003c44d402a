//! User document schema

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::db::schemas::{IntoIndexes, MutMetadata};
use crate::db::store::IndexSpec;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    pub username: String,

    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Display name
    #[serde(default)]
    pub names: String,

    /// Role tags held by this user
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserDoc {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        names: impl Into<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash,
            names: names.into(),
            roles,
            ..Default::default()
        }
    }

    pub fn has_role(&self, tag: &str) -> bool {
        self.roles.iter().any(|r| r == tag)
    }

    /// Hex id, empty if not yet stored
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<IndexSpec> {
        vec![
            IndexSpec::unique("username", "username_unique"),
            IndexSpec::unique("email", "email_unique"),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn timestamps(&mut self) -> (&mut Option<DateTime>, &mut Option<DateTime>) {
        (&mut self.created_at, &mut self.updated_at)
    }
}
