//! Path-addressed document storage.
//!
//! Every per-grade record lives in a collection addressed by path segments
//! (`grades/<grade>/students`), and every document in a collection is a JSON
//! object keyed by an opaque id. Writes overwrite or shallow-merge; there is
//! no versioning and the last write wins.

mod objects;
mod sqlite;

pub use objects::{FsObjectStore, ObjectStore};
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid document body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn validate_segment(segment: &str) -> StoreResult<()> {
    if segment.trim().is_empty() {
        return Err(StoreError::InvalidPath("empty path segment".to_string()));
    }
    if segment.contains('/') || segment.contains('\\') || segment == "." || segment == ".." {
        return Err(StoreError::InvalidPath(format!(
            "path segment not allowed: {}",
            segment
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn new<I, S>(segments: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(StoreError::InvalidPath("empty collection path".to_string()));
        }
        for s in &segments {
            validate_segment(s)?;
        }
        Ok(Self { segments })
    }

    pub fn doc(&self, id: &str) -> StoreResult<DocPath> {
        validate_segment(id)?;
        Ok(DocPath {
            collection: self.clone(),
            id: id.to_string(),
        })
    }

    pub fn key(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    /// Decode the body into a record type, ignoring the id.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }
}

/// Serialize a record into a document body. Records always serialize to
/// JSON objects; anything else is a programming error surfaced as `Json`.
pub fn encode<T: Serialize>(record: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Json(serde::ser::Error::custom(format!(
            "document body must be an object, got {}",
            other
        )))),
    }
}

pub trait DocumentStore {
    /// All documents of a collection in insertion order.
    fn get_all(&self, collection: &CollectionPath) -> StoreResult<Vec<Document>>;
    fn get(&self, doc: &DocPath) -> StoreResult<Option<Document>>;
    /// Insert under a fresh id and return it.
    fn add(&self, collection: &CollectionPath, data: Map<String, Value>) -> StoreResult<String>;
    /// Full overwrite; creates the document when missing.
    fn set(&self, doc: &DocPath, data: Map<String, Value>) -> StoreResult<()>;
    /// Shallow merge into an existing document.
    fn update(&self, doc: &DocPath, patch: Map<String, Value>) -> StoreResult<()>;
    /// Set-with-merge: create when missing, shallow merge otherwise.
    fn merge(&self, doc: &DocPath, patch: Map<String, Value>) -> StoreResult<()>;
    /// Deleting a missing document is not an error.
    fn delete(&self, doc: &DocPath) -> StoreResult<()>;
    fn delete_all(&self, collection: &CollectionPath) -> StoreResult<usize>;
}
