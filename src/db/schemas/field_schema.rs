//! Declared field kinds for content type schemas
//!
//! A content type's `field_schema` maps each custom field name to a
//! [`FieldKind`]. The schema is advisory: by default it only drives value
//! coercion (timestamps) and filter parsing. Strict mode additionally
//! rejects content whose fields do not match.

use std::collections::BTreeMap;

use bson::{Bson, Document};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{FolioError, Result};

/// Field schema of a content type: field name to kind
pub type FieldSchema = BTreeMap<String, FieldKind>;

/// Primitive kind of a custom field
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    #[serde(alias = "int", alias = "float", alias = "float64")]
    Number,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "time.Time", alias = "datetime")]
    Timestamp,
    #[serde(alias = "[]string")]
    StringList,
}

/// Parse an RFC 3339 string into a store timestamp
pub fn parse_timestamp(value: &str) -> Option<bson::DateTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| bson::DateTime::from_chrono(dt.with_timezone(&Utc)))
}

impl FieldKind {
    /// Whether `value` is acceptable for a field of this kind (null always is)
    pub fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (_, Bson::Null) => true,
            (FieldKind::String, Bson::String(_)) => true,
            (FieldKind::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => true,
            (FieldKind::Bool, Bson::Boolean(_)) => true,
            (FieldKind::Timestamp, Bson::DateTime(_)) => true,
            (FieldKind::StringList, Bson::Array(items)) => {
                items.iter().all(|item| matches!(item, Bson::String(_)))
            }
            _ => false,
        }
    }

    /// Convert wire values into their stored form
    ///
    /// RFC 3339 strings become timestamps for `Timestamp` fields; anything
    /// else is returned unchanged.
    pub fn coerce(&self, value: Bson) -> Bson {
        match (self, value) {
            (FieldKind::Timestamp, Bson::String(s)) => match parse_timestamp(&s) {
                Some(dt) => Bson::DateTime(dt),
                None => Bson::String(s),
            },
            (_, value) => value,
        }
    }
}

/// Coerce every declared field in place
pub fn coerce_fields(schema: &FieldSchema, fields: &mut Document) {
    for (name, kind) in schema {
        if let Some(value) = fields.get_mut(name) {
            let raw = std::mem::replace(value, Bson::Null);
            *value = kind.coerce(raw);
        }
    }
}

/// Reject undeclared fields and values of the wrong kind
pub fn validate_fields(schema: &FieldSchema, fields: &Document) -> Result<()> {
    for (name, value) in fields {
        let kind = schema.get(name).ok_or_else(|| {
            FolioError::InvalidArgument(format!("field '{name}' is not declared"))
        })?;
        if !kind.accepts(value) {
            return Err(FolioError::InvalidArgument(format!(
                "field '{name}' expects {kind:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_parses_legacy_type_hints() {
        let schema: FieldSchema = serde_json::from_value(serde_json::json!({
            "description": "string",
            "date": "time.Time",
            "seats": "number",
            "labels": "string_list",
        }))
        .unwrap();

        assert_eq!(schema["date"], FieldKind::Timestamp);
        assert_eq!(schema["labels"], FieldKind::StringList);
        assert_eq!(
            serde_json::to_value(FieldKind::Timestamp).unwrap(),
            serde_json::json!("timestamp")
        );
    }

    #[test]
    fn test_coerce_and_validate() {
        let schema: FieldSchema = [
            ("date".to_string(), FieldKind::Timestamp),
            ("place".to_string(), FieldKind::String),
        ]
        .into_iter()
        .collect();

        let mut fields = doc! { "date": "2024-05-01T18:00:00Z", "place": "Hall" };
        coerce_fields(&schema, &mut fields);
        assert!(fields.get_datetime("date").is_ok());
        assert!(validate_fields(&schema, &fields).is_ok());

        let wrong = doc! { "place": 3 };
        assert!(validate_fields(&schema, &wrong).is_err());

        let undeclared = doc! { "speaker": "Ada" };
        assert!(validate_fields(&schema, &undeclared).is_err());
    }

    #[test]
    fn test_unparseable_timestamp_left_as_string() {
        let value = FieldKind::Timestamp.coerce(Bson::String("next week".into()));
        assert_eq!(value, Bson::String("next week".into()));
        assert!(!FieldKind::Timestamp.accepts(&value));
    }
}
