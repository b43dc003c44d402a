//! Role registry
//!
//! Roles are referenced everywhere by tag. Renaming a role only touches
//! the role record; deleting one strips the tag from every holder first.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use tracing::{info, warn};

use crate::db::schemas::{RoleDoc, ROLE_COLLECTION};
use crate::db::{Database, Patch};
use crate::types::{FolioError, Result};

/// Something that stores role tags and must drop them when a role goes
#[async_trait]
pub trait RoleReferences: Send + Sync {
    /// Remove `tag` from every record holding it. Returns the number of
    /// records changed.
    async fn strip_role(&self, tag: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct RoleRegistry {
    db: Database,
}

impl RoleRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a role; tag and name must both be unused
    pub async fn create_role(&self, tag: &str, name: &str) -> Result<RoleDoc> {
        let (tag, name) = (tag.trim(), name.trim());
        if tag.is_empty() || name.is_empty() {
            return Err(FolioError::InvalidArgument(
                "role tag and name are required".into(),
            ));
        }
        if self.find_by_tag(tag).await?.is_some() {
            return Err(FolioError::Conflict(format!("role tag '{tag}' already exists")));
        }
        if self.find_by_name(name).await?.is_some() {
            return Err(FolioError::Conflict(format!("role name '{name}' already exists")));
        }

        let mut role = RoleDoc::new(tag, name);
        role._id = Some(ObjectId::new());
        self.db
            .insert_one(ROLE_COLLECTION, bson::to_document(&role)?)
            .await?;

        info!(tag, name, "Created role");
        Ok(role)
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Option<RoleDoc>> {
        self.db
            .find_one_as(ROLE_COLLECTION, doc! { "tag": tag })
            .await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RoleDoc>> {
        self.db
            .find_one_as(ROLE_COLLECTION, doc! { "name": name })
            .await
    }

    pub async fn get_role_by_tag(&self, tag: &str) -> Result<RoleDoc> {
        self.find_by_tag(tag)
            .await?
            .ok_or_else(|| FolioError::NotFound(format!("role: {tag}")))
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<RoleDoc> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| FolioError::NotFound(format!("role named: {name}")))
    }

    pub async fn list_roles(&self) -> Result<Vec<RoleDoc>> {
        self.db.find_as(ROLE_COLLECTION, doc! {}).await
    }

    /// Rename a role; the tag never changes
    pub async fn update_role_name(&self, tag: &str, name: &str) -> Result<RoleDoc> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolioError::InvalidArgument("role name is required".into()));
        }
        let mut role = self.get_role_by_tag(tag).await?;
        if role.name == name {
            return Ok(role);
        }
        if self.find_by_name(name).await?.is_some() {
            return Err(FolioError::Conflict(format!("role name '{name}' already exists")));
        }

        self.db
            .update_one(
                ROLE_COLLECTION,
                doc! { "tag": tag },
                Patch {
                    set: doc! { "name": name },
                    touch_updated_at: false,
                },
            )
            .await?;

        info!(tag, from = %role.name, to = name, "Renamed role");
        role.name = name.to_string();
        Ok(role)
    }

    /// Display names for `tags`, in the same order
    ///
    /// Fails if any tag is unknown.
    pub async fn resolve_names(&self, tags: &[String]) -> Result<Vec<String>> {
        let roles = self.list_roles().await?;
        tags.iter()
            .map(|tag| {
                roles
                    .iter()
                    .find(|r| &r.tag == tag)
                    .map(|r| r.name.clone())
                    .ok_or_else(|| FolioError::NotFound(format!("role: {tag}")))
            })
            .collect()
    }

    /// Fail with `NotFound("role: <tag>")` on the first unknown tag
    pub async fn validate_tags<'a, I>(&self, tags: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let roles = self.list_roles().await?;
        for tag in tags {
            if !roles.iter().any(|r| &r.tag == tag) {
                return Err(FolioError::NotFound(format!("role: {tag}")));
            }
        }
        Ok(())
    }

    /// Delete a role after stripping its tag from every holder
    ///
    /// Holders are processed in order. The first failure aborts the cascade
    /// and leaves the role in place; holders already processed stay
    /// stripped.
    pub async fn delete_role(&self, tag: &str, holders: &[&dyn RoleReferences]) -> Result<u64> {
        let role = self.get_role_by_tag(tag).await?;

        for holder in holders {
            if let Err(e) = holder.strip_role(tag).await {
                warn!(tag, error = %e, "Role cascade aborted, role kept");
                return Err(e);
            }
        }

        let deleted = self
            .db
            .delete_one(ROLE_COLLECTION, doc! { "tag": tag })
            .await?;

        info!(tag, name = %role.name, "Deleted role");
        Ok(deleted)
    }

    /// Create the role unless one with `tag` exists
    pub async fn ensure_role(&self, tag: &str, name: &str) -> Result<()> {
        if self.find_by_tag(tag).await?.is_none() {
            self.create_role(tag, name).await?;
        }
        Ok(())
    }
}
