//! Flat key/value parameters to store filters
//!
//! Each entity exposes a [`FieldRegistry`]: an ordered list of filterable
//! fields and how their string values are parsed. [`translate`] walks the
//! incoming parameters and builds an equality filter:
//!
//! - `id` is parsed as an ObjectId and stored under `_id`
//! - `true`/`false` (any case) become booleans, never strings
//! - one value is a scalar match, several values an exact array match
//! - empty values are dropped; an explicit `false` is kept

use bson::{oid::ObjectId, Bson, Document};

use crate::db::schemas::{
    parse_timestamp, FieldKind, FieldSchema, CONTENT_TYPE_ID, ID, PUBLISHED, TAGS, TITLE,
};
use crate::types::{FolioError, Result};

/// How a filter value is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Identifier,
    Text,
    Number,
    Bool,
    TextList,
    Timestamp,
}

impl From<FieldKind> for FilterKind {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::String => FilterKind::Text,
            FieldKind::Number => FilterKind::Number,
            FieldKind::Bool => FilterKind::Bool,
            FieldKind::Timestamp => FilterKind::Timestamp,
            FieldKind::StringList => FilterKind::TextList,
        }
    }
}

/// A filterable field: public name, stored key and value kind
#[derive(Debug, Clone, PartialEq)]
pub struct FilterField {
    pub name: String,
    pub store_key: String,
    pub kind: FilterKind,
}

impl FilterField {
    pub fn new(name: &str, kind: FilterKind) -> Self {
        Self {
            name: name.to_string(),
            store_key: name.to_string(),
            kind,
        }
    }

    fn id() -> Self {
        Self {
            name: "id".to_string(),
            store_key: ID.to_string(),
            kind: FilterKind::Identifier,
        }
    }
}

/// Ordered set of filterable fields for one entity
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<FilterField>,
}

impl FieldRegistry {
    pub fn new(fields: Vec<FilterField>) -> Self {
        Self { fields }
    }

    /// Fixed content attributes plus the type's declared fields
    pub fn content(schema: &FieldSchema) -> Self {
        let mut fields = vec![
            FilterField::id(),
            FilterField::new(CONTENT_TYPE_ID, FilterKind::Identifier),
            FilterField::new(TITLE, FilterKind::Text),
            FilterField::new(PUBLISHED, FilterKind::Bool),
            FilterField::new(TAGS, FilterKind::TextList),
        ];
        fields.extend(
            schema
                .iter()
                .map(|(name, kind)| FilterField::new(name, FilterKind::from(*kind))),
        );
        Self::new(fields)
    }

    pub fn users() -> Self {
        Self::new(vec![
            FilterField::id(),
            FilterField::new("username", FilterKind::Text),
            FilterField::new("email", FilterKind::Text),
            FilterField::new("names", FilterKind::Text),
            FilterField::new("roles", FilterKind::TextList),
        ])
    }

    pub fn content_types() -> Self {
        Self::new(vec![
            FilterField::id(),
            FilterField::new("typename", FilterKind::Text),
            FilterField::new("collection", FilterKind::Text),
        ])
    }

    /// Look a field up by public or stored name
    pub fn lookup(&self, key: &str) -> Option<&FilterField> {
        self.fields
            .iter()
            .find(|f| f.name == key || f.store_key == key)
    }

    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }
}

/// Query parameters grouped by key, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Parse a raw query string (`a=1&tags=x&tags=y`)
    pub fn from_query(query: Option<&str>) -> Result<Self> {
        let mut params = Self::default();
        let Some(query) = query.filter(|q| !q.is_empty()) else {
            return Ok(params);
        };
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| FolioError::InvalidArgument(format!("malformed query string: {e}")))?;
        for (key, value) in pairs {
            params.push(key, value);
        }
        Ok(params)
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.pairs.push((key, vec![value.into()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_value(key: &str, kind: FilterKind, value: &str) -> Result<Bson> {
    let invalid = |what: &str| {
        FolioError::InvalidArgument(format!("'{value}' is not a valid {what} for '{key}'"))
    };
    match kind {
        FilterKind::Identifier => ObjectId::parse_str(value)
            .map(Bson::ObjectId)
            .map_err(|_| invalid("id")),
        FilterKind::Bool => parse_bool(value)
            .map(Bson::Boolean)
            .ok_or_else(|| invalid("boolean")),
        FilterKind::Number => {
            if let Ok(n) = value.parse::<i64>() {
                Ok(Bson::Int64(n))
            } else {
                value
                    .parse::<f64>()
                    .map(Bson::Double)
                    .map_err(|_| invalid("number"))
            }
        }
        FilterKind::Timestamp => parse_timestamp(value)
            .map(Bson::DateTime)
            .ok_or_else(|| invalid("timestamp")),
        FilterKind::Text | FilterKind::TextList => Ok(parse_bool(value)
            .map(Bson::Boolean)
            .unwrap_or_else(|| Bson::String(value.to_string()))),
    }
}

/// Build a store filter from query parameters
///
/// Keys not in `registry` pass through as text equality on the same key.
/// Operator keys (`$where`, `$ne`, ...) are rejected.
pub fn translate(params: &QueryParams, registry: &FieldRegistry) -> Result<Document> {
    let mut filter = Document::new();

    for (key, values) in params.iter() {
        if key.is_empty() || key.starts_with('$') {
            return Err(FolioError::InvalidArgument(format!(
                "unsupported filter key: '{key}'"
            )));
        }
        let (store_key, kind) = match registry.lookup(key) {
            Some(field) => (field.store_key.as_str(), field.kind),
            None if key == "id" || key == ID => (ID, FilterKind::Identifier),
            None => (key, FilterKind::Text),
        };

        let mut parsed = values
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| parse_value(key, kind, v))
            .collect::<Result<Vec<Bson>>>()?;

        let value = match parsed.len() {
            0 => continue,
            1 => parsed.remove(0),
            _ => Bson::Array(parsed),
        };
        filter.insert(store_key, value);
    }

    Ok(filter)
}
