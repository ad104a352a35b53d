pub use in_memory_document_store::InMemoryDocumentStore;
pub use postgres_document_store::{PostgresDocumentStore, PostgresDocumentStoreConfig};

use serde_json::Value;

mod in_memory_document_store;
mod postgres_document_store;

/// Field holding the identity of every document, always unique
pub const ID_FIELD: &str = "_id";

pub type Document = Value;

#[derive(Debug, Clone, PartialEq)]
/// Selects documents of a collection
pub enum Filter {
    All,
    Eq { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum DocumentStoreError {
    #[error("Duplicate value {value} for unique field {field}")]
    DuplicateKey { field: String, value: String },

    #[error("Connection to the document store is closed")]
    Closed,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Single collection of JSON documents in a keyed document store
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the first document matching the filter
    async fn find_one(&self, filter: Filter) -> Result<Option<Document>, DocumentStoreError>;
    /// Returns every document matching the filter
    async fn find(&self, filter: Filter) -> Result<Vec<Document>, DocumentStoreError>;
    async fn insert_one(&self, document: Document) -> Result<(), DocumentStoreError>;
    /// Inserts all documents or none of them, returns number of inserted documents
    async fn insert_many(&self, documents: Vec<Document>) -> Result<u64, DocumentStoreError>;
    /// Sets the fields of `set` on the first document matching the filter
    async fn update_one(
        &self,
        filter: Filter,
        set: Document,
    ) -> Result<UpdateResult, DocumentStoreError>;
    /// Same as update_one, returns the document as it was before the update
    async fn find_one_and_update(
        &self,
        filter: Filter,
        set: Document,
    ) -> Result<Option<Document>, DocumentStoreError>;
    async fn delete_one(&self, filter: Filter) -> Result<DeleteResult, DocumentStoreError>;
    async fn delete_many(&self, filter: Filter) -> Result<DeleteResult, DocumentStoreError>;
    /// Creates an index over a top level field. Creating a unique index fails if
    /// the collection already holds duplicate values of that field
    async fn create_index(&self, field: &str, unique: bool) -> Result<(), DocumentStoreError>;
    /// Releases the connection, every following call fails with `Closed`
    async fn close(&self) -> Result<(), DocumentStoreError>;
}

/// Field names end up in index definitions so only plain identifiers are accepted
pub(crate) fn check_field_name(field: &str) -> Result<(), DocumentStoreError> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DocumentStoreError::Other(format!(
            "Invalid field name {field}"
        )))
    }
}

/// Renders a field value the way it is reported in duplicate key errors
pub(crate) fn key_to_string(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

/// Documents must be objects, an `_id` is generated for those that come without one
pub(crate) fn prepare_document(mut document: Document) -> Result<Document, DocumentStoreError> {
    let Some(fields) = document.as_object_mut() else {
        return Err(DocumentStoreError::InvalidDocument(
            "document must be an object".to_string(),
        ));
    };
    fields
        .entry(ID_FIELD)
        .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()));
    Ok(document)
}

/// Update documents are plain objects of top level fields and never touch `_id`
pub(crate) fn check_set(set: &Document) -> Result<(), DocumentStoreError> {
    match set.as_object() {
        None => Err(DocumentStoreError::InvalidDocument(
            "update must be an object".to_string(),
        )),
        Some(fields) if fields.contains_key(ID_FIELD) => Err(DocumentStoreError::InvalidDocument(
            "_id can not be modified".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

/// `$set` semantics, only top level keys present in `set` are replaced
pub(crate) fn apply_set(document: &mut Document, set: &Document) -> Result<(), DocumentStoreError> {
    check_set(set)?;
    json_patch::merge(document, set);
    Ok(())
}

#[cfg(test)]
mod document_store_tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_filter_matches() {
        let document = json!({"_id": "a", "isbn": "1234567890"});
        assert!(Filter::All.matches(&document));
        assert!(Filter::eq("isbn", "1234567890").matches(&document));
        assert!(!Filter::eq("isbn", "1234567891").matches(&document));
        assert!(!Filter::eq("missing", "1234567890").matches(&document));
    }

    #[test]
    fn test_apply_set_keeps_other_fields() {
        let mut document = json!({"_id": "a", "title": "A", "pages": 10});
        apply_set(&mut document, &json!({"title": "B"})).unwrap();
        assert_eq!(document, json!({"_id": "a", "title": "B", "pages": 10}));

        assert!(apply_set(&mut document, &json!({"_id": "other"})).is_err());
        assert!(apply_set(&mut document, &json!("title")).is_err());
    }

    #[test]
    fn test_field_names() {
        assert!(check_field_name("isbn").is_ok());
        assert!(check_field_name("_id").is_ok());
        assert!(check_field_name("").is_err());
        assert!(check_field_name("isbn'); DROP TABLE x; --").is_err());
    }
}
