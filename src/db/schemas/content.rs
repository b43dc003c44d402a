//! Content document schema
//!
//! Content lives in one collection per content type. The fixed attributes
//! and the dynamic `fields` map are stored side by side in the same
//! document so filters can address custom fields directly.

use bson::{oid::ObjectId, Bson, DateTime, Document};
use serde::Deserialize;

use crate::db::schemas::{CREATED_AT, ID, UPDATED_AT};
use crate::types::{FolioError, Result};

pub const CONTENT_TYPE_ID: &str = "content_type_id";
pub const TITLE: &str = "title";
pub const PUBLISHED: &str = "published";
pub const TAGS: &str = "tags";

/// Keys custom fields may not use
pub const RESERVED_FIELDS: [&str; 7] = [
    ID,
    CREATED_AT,
    UPDATED_AT,
    CONTENT_TYPE_ID,
    TITLE,
    PUBLISHED,
    TAGS,
];

/// Stored content entry
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentDoc {
    pub id: Option<ObjectId>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    /// Id of the content type owning this entry's collection
    pub content_type_id: Option<ObjectId>,
    pub title: String,
    /// Unset, or explicitly true/false
    pub published: Option<bool>,
    pub tags: Vec<String>,
    /// Schema-defined payload
    pub fields: Document,
}

/// Fail if any custom field shadows a fixed attribute or is not a plain
/// top-level key (operators, dotted paths, empty names)
pub fn check_field_names(fields: &Document) -> Result<()> {
    for key in fields.keys() {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            return Err(FolioError::InvalidArgument(format!(
                "field name '{key}' is reserved"
            )));
        }
        if key.is_empty() || key.starts_with('$') || key.contains('.') {
            return Err(FolioError::InvalidArgument(format!(
                "field name '{key}' must not be empty, start with '$' or contain '.'"
            )));
        }
    }
    Ok(())
}

fn decode_err(key: &str) -> FolioError {
    FolioError::Internal(format!("content document has malformed '{key}'"))
}

impl ContentDoc {
    /// Storage form: fixed attributes first, custom fields inline
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert(ID, id);
        }
        if let Some(created_at) = self.created_at {
            doc.insert(CREATED_AT, created_at);
        }
        if let Some(updated_at) = self.updated_at {
            doc.insert(UPDATED_AT, updated_at);
        }
        if let Some(ct) = self.content_type_id {
            doc.insert(CONTENT_TYPE_ID, ct);
        }
        doc.insert(TITLE, self.title.clone());
        if let Some(published) = self.published {
            doc.insert(PUBLISHED, published);
        }
        doc.insert(TAGS, self.tags.clone());
        for (key, value) in self.fields.iter() {
            doc.insert(key.clone(), value.clone());
        }
        doc
    }

    /// Split a stored document back into fixed attributes and fields
    pub fn from_document(mut doc: Document) -> Result<Self> {
        let id = match doc.remove(ID) {
            Some(Bson::ObjectId(id)) => Some(id),
            None => None,
            Some(_) => return Err(decode_err(ID)),
        };
        let created_at = optional_datetime(doc.remove(CREATED_AT), CREATED_AT)?;
        let updated_at = optional_datetime(doc.remove(UPDATED_AT), UPDATED_AT)?;
        let content_type_id = match doc.remove(CONTENT_TYPE_ID) {
            Some(Bson::ObjectId(id)) => Some(id),
            None | Some(Bson::Null) => None,
            Some(_) => return Err(decode_err(CONTENT_TYPE_ID)),
        };
        let title = match doc.remove(TITLE) {
            Some(Bson::String(s)) => s,
            None | Some(Bson::Null) => String::new(),
            Some(_) => return Err(decode_err(TITLE)),
        };
        let published = match doc.remove(PUBLISHED) {
            Some(Bson::Boolean(b)) => Some(b),
            None | Some(Bson::Null) => None,
            Some(_) => return Err(decode_err(PUBLISHED)),
        };
        let tags = match doc.remove(TAGS) {
            Some(Bson::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Bson::String(s) => Ok(s),
                    _ => Err(decode_err(TAGS)),
                })
                .collect::<Result<Vec<_>>>()?,
            None | Some(Bson::Null) => Vec::new(),
            Some(_) => return Err(decode_err(TAGS)),
        };

        Ok(Self {
            id,
            created_at,
            updated_at,
            content_type_id,
            title,
            published,
            tags,
            fields: doc,
        })
    }

    /// Wire form: custom fields nested under `fields`
    pub fn to_view(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert(ID, id);
        }
        if let Some(created_at) = self.created_at {
            doc.insert(CREATED_AT, created_at);
        }
        if let Some(updated_at) = self.updated_at {
            doc.insert(UPDATED_AT, updated_at);
        }
        doc.insert(CONTENT_TYPE_ID, self.content_type_id.map_or(Bson::Null, Bson::ObjectId));
        doc.insert(TITLE, self.title.clone());
        doc.insert(PUBLISHED, self.published.map_or(Bson::Null, Bson::Boolean));
        doc.insert(TAGS, self.tags.clone());
        doc.insert("fields", self.fields.clone());
        doc
    }
}

fn optional_datetime(value: Option<Bson>, key: &str) -> Result<Option<DateTime>> {
    match value {
        Some(Bson::DateTime(dt)) => Ok(Some(dt)),
        None | Some(Bson::Null) => Ok(None),
        Some(_) => Err(decode_err(key)),
    }
}

/// Request body for creating content
#[derive(Deserialize, Debug, Clone)]
pub struct ContentInput {
    pub title: String,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Request body for a partial content update
///
/// Absent keys are left untouched. `published: false` is an explicit
/// change, distinct from leaving `published` out.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ContentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Convert a JSON object into a BSON document
pub fn json_to_document(map: serde_json::Map<String, serde_json::Value>) -> Result<Document> {
    match bson::to_bson(&serde_json::Value::Object(map))? {
        Bson::Document(doc) => Ok(doc),
        _ => Err(FolioError::InvalidArgument("expected a JSON object".into())),
    }
}
