//! User registry

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{UserDoc, ADMIN_ROLE_TAG, DEFAULT_ROLE_TAG, USER_COLLECTION};
use crate::db::{Database, Patch};
use crate::services::content_types::parse_object_id;
use crate::services::roles::{RoleReferences, RoleRegistry};
use crate::types::{FolioError, Result};

/// Body of a registration / admin create request
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub names: String,
    /// Role tags; empty means the default role
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Body of a partial update; absent keys are left untouched
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub names: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

fn check_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(FolioError::InvalidArgument(format!("invalid email '{email}'"))),
    }
}

#[derive(Clone)]
pub struct UserRegistry {
    db: Database,
    roles: RoleRegistry,
}

impl UserRegistry {
    pub fn new(db: Database, roles: RoleRegistry) -> Self {
        Self { db, roles }
    }

    async fn find(&self, filter: Document) -> Result<Option<UserDoc>> {
        self.db.find_one_as(USER_COLLECTION, filter).await
    }

    async fn check_unused(&self, field: &str, value: &str, except: Option<ObjectId>) -> Result<()> {
        if let Some(existing) = self.find(doc! { field: value }).await? {
            if existing._id != except || except.is_none() {
                return Err(FolioError::Conflict(format!("{field} '{value}' is taken")));
            }
        }
        Ok(())
    }

    pub async fn create_user(&self, input: UserInput) -> Result<UserDoc> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();
        if username.is_empty() {
            return Err(FolioError::InvalidArgument("username is required".into()));
        }
        check_email(&email)?;
        self.check_unused("username", &username, None).await?;
        self.check_unused("email", &email, None).await?;

        let roles = if input.roles.is_empty() {
            vec![DEFAULT_ROLE_TAG.to_string()]
        } else {
            input.roles
        };
        self.roles.validate_tags(&roles).await?;

        let mut user = UserDoc::new(
            username,
            email,
            hash_password(&input.password)?,
            input.names,
            roles,
        );
        user._id = Some(ObjectId::new());
        self.db.insert_as(USER_COLLECTION, &mut user).await?;

        info!(username = %user.username, roles = ?user.roles, "Created user");
        Ok(user)
    }

    pub async fn get_user(&self, filter: Document) -> Result<UserDoc> {
        self.find(filter)
            .await?
            .ok_or_else(|| FolioError::NotFound("user".into()))
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<UserDoc> {
        let oid = parse_object_id(id)?;
        self.get_user(doc! { "_id": oid }).await
    }

    /// Look a user up by username, falling back to email
    pub async fn get_user_by_identity(&self, identity: &str) -> Result<UserDoc> {
        let identity = identity.trim();
        if let Some(user) = self.find(doc! { "username": identity }).await? {
            return Ok(user);
        }
        self.get_user(doc! { "email": identity.to_lowercase() }).await
    }

    /// Every user matching `filter`; `NotFound` if none
    pub async fn get_users(&self, filter: Document) -> Result<Vec<UserDoc>> {
        let users: Vec<UserDoc> = self.db.find_as(USER_COLLECTION, filter).await?;
        if users.is_empty() {
            return Err(FolioError::NotFound("no users match".into()));
        }
        Ok(users)
    }

    /// Verify credentials; unknown identity is `NotFound`, a wrong password
    /// `Unauthorized`
    pub async fn authenticate(&self, identity: &str, password: &str) -> Result<UserDoc> {
        let user = self.get_user_by_identity(identity).await?;
        if !verify_password(password, &user.password_hash)? {
            return Err(FolioError::Unauthorized("invalid credentials".into()));
        }
        Ok(user)
    }

    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<UserDoc> {
        let oid = parse_object_id(id)?;
        let current = self.get_user(doc! { "_id": oid }).await?;
        let mut set = Document::new();

        if let Some(username) = update.username.map(|u| u.trim().to_string()) {
            if username.is_empty() {
                return Err(FolioError::InvalidArgument("username is required".into()));
            }
            if username != current.username {
                self.check_unused("username", &username, current._id).await?;
                set.insert("username", username);
            }
        }
        if let Some(email) = update.email.map(|e| e.trim().to_lowercase()) {
            if email != current.email {
                check_email(&email)?;
                self.check_unused("email", &email, current._id).await?;
                set.insert("email", email);
            }
        }
        if let Some(password) = update.password {
            set.insert("password_hash", hash_password(&password)?);
        }
        if let Some(names) = update.names {
            set.insert("names", names);
        }
        if let Some(roles) = update.roles {
            self.roles.validate_tags(&roles).await?;
            set.insert("roles", roles);
        }

        self.db
            .update_one(USER_COLLECTION, doc! { "_id": oid }, Patch::set(set))
            .await?;

        info!(id, "Updated user");
        self.get_user(doc! { "_id": oid }).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<UserDoc> {
        let oid = parse_object_id(id)?;
        let user = self.get_user(doc! { "_id": oid }).await?;
        self.db
            .delete_one(USER_COLLECTION, doc! { "_id": oid })
            .await?;

        info!(username = %user.username, "Deleted user");
        Ok(user)
    }

    /// Drop `tag` from one user's role set
    pub async fn remove_role_from_user(&self, tag: &str, user: &UserDoc) -> Result<()> {
        let Some(oid) = user._id else {
            return Err(FolioError::Internal("user without id".into()));
        };
        let roles: Vec<String> = user.roles.iter().filter(|r| *r != tag).cloned().collect();
        self.db
            .update_one(
                USER_COLLECTION,
                doc! { "_id": oid },
                Patch::set(doc! { "roles": roles }),
            )
            .await?;
        debug!(tag, username = %user.username, "Removed role from user");
        Ok(())
    }

    /// Whether any user holds the admin role
    pub async fn has_admin(&self) -> Result<bool> {
        Ok(self.find(doc! { "roles": ADMIN_ROLE_TAG }).await?.is_some())
    }
}

#[async_trait]
impl RoleReferences for UserRegistry {
    async fn strip_role(&self, tag: &str) -> Result<u64> {
        let holders: Vec<UserDoc> = self
            .db
            .find_as(USER_COLLECTION, doc! { "roles": tag })
            .await?;
        for user in &holders {
            self.remove_role_from_user(tag, user).await?;
        }
        Ok(holders.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> UserRegistry {
        let db = Database::in_memory();
        let roles = RoleRegistry::new(db.clone());
        roles.create_role("default", "user").await.unwrap();
        roles.create_role("admin", "admin").await.unwrap();
        roles.create_role("editor", "editor").await.unwrap();
        UserRegistry::new(db, roles)
    }

    fn input(username: &str, email: &str) -> UserInput {
        UserInput {
            username: username.into(),
            email: email.into(),
            password: "pw-123456".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_role_and_hashes() {
        let users = registry().await;
        let user = users.create_user(input("ada", "Ada@Example.com")).await.unwrap();

        assert_eq!(user.roles, vec!["default"]);
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "pw-123456");
        assert!(user.created_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let users = registry().await;
        users.create_user(input("ada", "ada@example.com")).await.unwrap();

        let err = users.create_user(input("ada", "other@example.com")).await.unwrap_err();
        assert!(matches!(err, FolioError::Conflict(ref m) if m.contains("username")));
        let err = users.create_user(input("bob", "ada@example.com")).await.unwrap_err();
        assert!(matches!(err, FolioError::Conflict(ref m) if m.contains("email")));
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let users = registry().await;
        let mut bad = input("ada", "ada@example.com");
        bad.roles = vec!["ghost".into()];
        assert!(users.create_user(bad).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = registry().await;
        users.create_user(input("ada", "ada@example.com")).await.unwrap();

        assert!(users.authenticate("ada", "pw-123456").await.is_ok());
        assert!(users.authenticate("ada@example.com", "pw-123456").await.is_ok());
        assert!(matches!(
            users.authenticate("ada", "nope").await,
            Err(FolioError::Unauthorized(_))
        ));
        assert!(users.authenticate("bob", "pw-123456").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_rehashes_and_checks_uniqueness() {
        let users = registry().await;
        let ada = users.create_user(input("ada", "ada@example.com")).await.unwrap();
        users.create_user(input("bob", "bob@example.com")).await.unwrap();
        let id = ada.id_hex();

        let err = users
            .update_user(
                &id,
                UserUpdate {
                    username: Some("bob".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Conflict(_)));

        let updated = users
            .update_user(
                &id,
                UserUpdate {
                    username: Some("ada".into()),
                    password: Some("new-secret".into()),
                    roles: Some(vec!["default".into(), "editor".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.roles, vec!["default", "editor"]);
        assert!(users.authenticate("ada", "new-secret").await.is_ok());
    }

    #[tokio::test]
    async fn test_strip_role_and_delete() {
        let users = registry().await;
        let mut editor = input("ada", "ada@example.com");
        editor.roles = vec!["default".into(), "editor".into()];
        users.create_user(editor).await.unwrap();
        users.create_user(input("bob", "bob@example.com")).await.unwrap();

        assert_eq!(users.strip_role("editor").await.unwrap(), 1);
        assert!(users
            .get_users(doc! { "roles": "editor" })
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(users.get_users(doc! { "roles": "default" }).await.unwrap().len(), 2);

        let bob = users.get_user_by_identity("bob").await.unwrap();
        users.delete_user(&bob.id_hex()).await.unwrap();
        assert!(users.get_user_by_id(&bob.id_hex()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_has_admin() {
        let users = registry().await;
        assert!(!users.has_admin().await.unwrap());
        let mut admin = input("root", "root@example.com");
        admin.roles = vec!["admin".into(), "default".into()];
        users.create_user(admin).await.unwrap();
        assert!(users.has_admin().await.unwrap());
    }
}
