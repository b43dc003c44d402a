//! Database schemas for Folio
//!
//! Document structures for roles, content types, content entries and users.

mod content;
mod content_type;
mod field_schema;
mod metadata;
mod role;
mod user;

pub use content::{
    check_field_names, json_to_document, ContentDoc, ContentInput, ContentUpdate,
    CONTENT_TYPE_ID, PUBLISHED, RESERVED_FIELDS, TAGS, TITLE,
};
pub use content_type::{
    uniform_permissions, ContentTypeDoc, Permissions, CONTENT_METHODS, CONTENT_TYPE_COLLECTION,
};
pub use field_schema::{
    coerce_fields, parse_timestamp, validate_fields, FieldKind, FieldSchema,
};
pub use metadata::{IntoIndexes, MutMetadata, CREATED_AT, ID, UPDATED_AT};
pub use role::{
    RoleDoc, ADMIN_ROLE_NAME, ADMIN_ROLE_TAG, DEFAULT_ROLE_NAME, DEFAULT_ROLE_TAG,
    ROLE_COLLECTION,
};
pub use user::{UserDoc, USER_COLLECTION};
