//! Start-up seeding
//!
//! Runs once at start-up and is safe to run again: indexes are ensured,
//! seed roles and content types are created only when missing, and the
//! admin account only when no user holds the admin role.

use tracing::info;

use crate::db::schemas::{
    uniform_permissions, ContentTypeDoc, FieldKind, FieldSchema, RoleDoc, UserDoc,
    ADMIN_ROLE_NAME, ADMIN_ROLE_TAG, CONTENT_TYPE_COLLECTION, DEFAULT_ROLE_NAME,
    DEFAULT_ROLE_TAG, ROLE_COLLECTION, USER_COLLECTION,
};
use crate::db::Database;
use crate::services::content_types::ContentTypeInput;
use crate::services::users::UserInput;
use crate::services::Services;
use crate::types::Result;

/// Credentials of the bootstrap admin account
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
}

fn schema(fields: &[(&str, FieldKind)]) -> FieldSchema {
    fields
        .iter()
        .map(|(name, kind)| (name.to_string(), *kind))
        .collect()
}

/// The two content types every fresh installation starts with
pub fn seed_content_types() -> Vec<ContentTypeInput> {
    let everyone = uniform_permissions(&[DEFAULT_ROLE_TAG, ADMIN_ROLE_TAG]);
    vec![
        ContentTypeInput {
            typename: "blogpost".into(),
            collection: "blogposts".into(),
            permissions: everyone.clone(),
            field_schema: schema(&[
                ("description", FieldKind::String),
                ("text", FieldKind::String),
            ]),
        },
        ContentTypeInput {
            typename: "event".into(),
            collection: "events".into(),
            permissions: everyone,
            field_schema: schema(&[
                ("description", FieldKind::String),
                ("date", FieldKind::Timestamp),
                ("place", FieldKind::String),
            ]),
        },
    ]
}

/// Ensure unique indexes on the fixed collections
pub async fn apply_indexes(db: &Database) -> Result<()> {
    db.apply_indexes::<RoleDoc>(ROLE_COLLECTION).await?;
    db.apply_indexes::<ContentTypeDoc>(CONTENT_TYPE_COLLECTION).await?;
    db.apply_indexes::<UserDoc>(USER_COLLECTION).await?;
    Ok(())
}

/// Seed roles, content types and the admin account
pub async fn bootstrap(db: &Database, services: &Services, seed: &SeedConfig) -> Result<()> {
    apply_indexes(db).await?;

    services
        .roles
        .ensure_role(DEFAULT_ROLE_TAG, DEFAULT_ROLE_NAME)
        .await?;
    services
        .roles
        .ensure_role(ADMIN_ROLE_TAG, ADMIN_ROLE_NAME)
        .await?;

    for input in seed_content_types() {
        services.content_types.ensure_content_type(input).await?;
    }

    if !services.users.has_admin().await? {
        let admin = services
            .users
            .create_user(UserInput {
                username: seed.admin_username.clone(),
                email: seed.admin_email.clone(),
                password: seed.admin_password.clone(),
                names: "admin user".into(),
                roles: vec![ADMIN_ROLE_TAG.to_string(), DEFAULT_ROLE_TAG.to_string()],
            })
            .await?;
        info!(username = %admin.username, "Created bootstrap admin user");
    }

    info!("Bootstrap complete");
    Ok(())
}
