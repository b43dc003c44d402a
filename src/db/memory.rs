//! In-process document store
//!
//! Backs dev mode and the test suite. Filters support plain equality the
//! way MongoDB evaluates it: a scalar matches an array field that contains
//! it, an array matches only an identical array, and numeric types compare
//! by value. Query operators (`$in`, `$gt`, ...) are not supported.

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, DateTime, Document};
use dashmap::DashMap;
use tracing::debug;

use crate::db::schemas::{ID, UPDATED_AT};
use crate::db::store::{DocumentStore, IndexSpec, Patch};
use crate::types::{FolioError, Result};

/// DashMap-backed [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
    indexes: DashMap<String, Vec<IndexSpec>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unique_fields(&self, collection: &str) -> Vec<(String, &'static str)> {
        let mut fields = vec![(ID.to_string(), "_id_")];
        if let Some(specs) = self.indexes.get(collection) {
            for spec in specs.iter().filter(|s| s.unique) {
                // Single-field indexes only
                if let Some((key, _)) = spec.keys.iter().next() {
                    fields.push((key.clone(), spec.name));
                }
            }
        }
        fields
    }
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x == y,
        _ => match (a, b) {
            (Bson::Array(xs), Bson::Array(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
            }
            _ => a == b,
        },
    }
}

fn field_matches(actual: Option<&Bson>, expected: &Bson) -> bool {
    match (actual, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(items)), expected) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        (Some(actual), expected) => values_equal(actual, expected),
    }
}

fn check_filter(filter: &Document) -> Result<()> {
    match filter.keys().find(|k| k.starts_with('$')) {
        Some(op) => Err(FolioError::InvalidArgument(format!(
            "unsupported query operator: {op}"
        ))),
        None => Ok(()),
    }
}

fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| field_matches(doc.get(key), expected))
}

fn apply_patch(doc: &mut Document, patch: &Patch) {
    for (key, value) in patch.set.iter() {
        doc.insert(key.clone(), value.clone());
    }
    if patch.touch_updated_at {
        doc.insert(UPDATED_AT, DateTime::now());
    }
}

/// First document among `docs` (other than `skip`) that clashes with
/// `candidate` on a unique field
fn find_clash(
    docs: &[Document],
    candidate: &Document,
    unique: &[(String, &'static str)],
    skip: Option<usize>,
) -> Option<&'static str> {
    for (field, index) in unique {
        let Some(value) = candidate.get(field) else {
            continue;
        };
        let clash = docs
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .any(|(_, other)| other.get(field).is_some_and(|v| values_equal(v, value)));
        if clash {
            return Some(index);
        }
    }
    None
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: Document) -> Result<Vec<Document>> {
        check_filter(&filter)?;
        debug!(collection, ?filter, "find");
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches_filter(doc, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        check_filter(&filter)?;
        debug!(collection, ?filter, "find_one");
        Ok(self.collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| matches_filter(doc, &filter))
                .cloned()
        }))
    }

    async fn insert_one(&self, collection: &str, mut doc: Document) -> Result<()> {
        if !doc.contains_key(ID) {
            doc.insert(ID, ObjectId::new());
        }
        let unique = self.unique_fields(collection);
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if let Some(index) = find_clash(&docs, &doc, &unique, None) {
            return Err(FolioError::Conflict(format!(
                "{collection}: duplicate key on insert ({index})"
            )));
        }
        docs.push(doc);
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: Document, patch: Patch) -> Result<u64> {
        check_filter(&filter)?;
        let unique = self.unique_fields(collection);
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(pos) = docs.iter().position(|doc| matches_filter(doc, &filter)) else {
            return Ok(0);
        };

        let mut updated = docs[pos].clone();
        apply_patch(&mut updated, &patch);
        if let Some(index) = find_clash(&docs, &updated, &unique, Some(pos)) {
            return Err(FolioError::Conflict(format!(
                "{collection}: duplicate key on update ({index})"
            )));
        }
        docs[pos] = updated;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        check_filter(&filter)?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| matches_filter(doc, &filter)) {
            Some(pos) => {
                docs.remove(pos);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections.remove(collection);
        self.indexes.remove(collection);
        Ok(())
    }

    async fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn create_index(&self, collection: &str, index: IndexSpec) -> Result<()> {
        self.collections.entry(collection.to_string()).or_default();
        let mut specs = self.indexes.entry(collection.to_string()).or_default();
        if !specs.iter().any(|s| s.name == index.name) {
            specs.push(index);
        }
        Ok(())
    }
}
