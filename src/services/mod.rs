//! Domain services
//!
//! Registries for roles, content types, content and users. All of them
//! share one [`Database`] handle.

pub mod bootstrap;
pub mod content;
pub mod content_types;
pub mod roles;
pub mod users;

pub use bootstrap::{bootstrap, SeedConfig};
pub use content::ContentStore;
pub use content_types::{ContentTypeInput, ContentTypeRegistry, ContentTypeUpdate};
pub use roles::{RoleReferences, RoleRegistry};
pub use users::{UserInput, UserRegistry, UserUpdate};

use crate::db::Database;
use crate::types::Result;

/// Every registry, wired to one store
#[derive(Clone)]
pub struct Services {
    pub roles: RoleRegistry,
    pub content_types: ContentTypeRegistry,
    pub content: ContentStore,
    pub users: UserRegistry,
}

impl Services {
    pub fn new(db: Database, strict_schema: bool) -> Self {
        let roles = RoleRegistry::new(db.clone());
        let content_types = ContentTypeRegistry::new(db.clone(), roles.clone());
        let content = ContentStore::new(db.clone(), content_types.clone(), strict_schema);
        let users = UserRegistry::new(db, roles.clone());
        Self {
            roles,
            content_types,
            content,
            users,
        }
    }

    /// Delete a role, stripping it from users, then content types
    pub async fn delete_role(&self, tag: &str) -> Result<u64> {
        let holders: [&dyn RoleReferences; 2] = [&self.users, &self.content_types];
        self.roles.delete_role(tag, &holders).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::uniform_permissions;
    use bson::doc;

    #[tokio::test]
    async fn test_delete_role_cascades_everywhere() {
        let services = Services::new(Database::in_memory(), false);
        services.roles.create_role("default", "user").await.unwrap();
        services.roles.create_role("editor", "editor").await.unwrap();
        services
            .users
            .create_user(UserInput {
                username: "ada".into(),
                email: "ada@example.com".into(),
                password: "pw".into(),
                roles: vec!["editor".into(), "default".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        services
            .content_types
            .create_content_type(ContentTypeInput {
                typename: "page".into(),
                collection: "pages".into(),
                permissions: uniform_permissions(&["editor"]),
                ..Default::default()
            })
            .await
            .unwrap();

        services.delete_role("editor").await.unwrap();

        let ada = services.users.get_user_by_identity("ada").await.unwrap();
        assert_eq!(ada.roles, vec!["default"]);
        let page = services
            .content_types
            .get_content_type_by_typename("page")
            .await
            .unwrap();
        assert!(page.referenced_roles().next().is_none());
        assert!(page.roles_for("POST").is_empty());
        assert!(services.roles.get_role_by_tag("editor").await.is_err());
        assert!(services
            .users
            .get_users(doc! { "roles": "editor" })
            .await
            .is_err());
    }
}
