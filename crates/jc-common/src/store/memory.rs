use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::instrument;

use super::{DocumentStore, FindQuery, StoreError};
use crate::document::document_id;

/// Insertion-ordered collections held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a document; a document with the same `_id` is replaced in place.
    pub fn insert(&self, collection: &str, doc: Value) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let docs = collections.entry(collection.to_string()).or_default();

        let id = document_id(&doc);
        let existing = id
            .as_deref()
            .and_then(|id| docs.iter().position(|d| document_id(d).as_deref() == Some(id)));
        match existing {
            Some(index) => docs[index] = doc,
            None => docs.push(doc),
        }
    }

    pub fn insert_many(&self, collection: &str, docs: impl IntoIterator<Item = Value>) {
        for doc in docs {
            self.insert(collection, doc);
        }
    }

    pub fn with_documents(self, collection: &str, docs: impl IntoIterator<Item = Value>) -> Self {
        self.insert_many(collection, docs);
        self
    }

    pub fn len(&self, collection: &str) -> usize {
        self.read(|collections| collections.get(collection).map_or(0, Vec::len))
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, Vec<Value>>) -> T) -> T {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&collections)
    }
}

impl DocumentStore for MemoryStore {
    #[instrument(skip(self))]
    async fn find_one_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read(|collections| {
            collections.get(collection).and_then(|docs| {
                docs.iter()
                    .find(|doc| document_id(doc).as_deref() == Some(id))
                    .cloned()
            })
        }))
    }

    #[instrument(skip(self, query), fields(limit = ?query.limit))]
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Value>, StoreError> {
        let filter = query.filter.compile()?;
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(self.read(|collections| {
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|doc| filter.matches(doc))
                        .take(limit)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        }))
    }

    async fn close(&self) {}
}
