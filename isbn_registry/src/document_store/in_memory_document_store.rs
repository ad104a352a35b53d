use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::document_store::{
    apply_set, check_field_name, key_to_string, prepare_document, DeleteResult, Document,
    DocumentStore, DocumentStoreError, Filter, UpdateResult, ID_FIELD,
};

struct Collection {
    documents: Vec<Document>,
    /// Indexed fields, value tells if the index is unique
    indexes: BTreeMap<String, bool>,
}

impl Collection {
    fn unique_fields(&self) -> impl Iterator<Item = &String> {
        self.indexes
            .iter()
            .filter(|(_, &unique)| unique)
            .map(|(field, _)| field)
    }

    /// Checks `candidates` against stored documents (except the one at `skip`) and each other
    fn check_unique(
        &self,
        candidates: &[&Document],
        skip: Option<usize>,
    ) -> Result<(), DocumentStoreError> {
        for field in self.unique_fields() {
            let mut seen = vec![];
            for candidate in candidates {
                let Some(value) = candidate.get(field) else {
                    continue;
                };
                let taken = seen.contains(&value)
                    || self
                        .documents
                        .iter()
                        .enumerate()
                        .any(|(index, doc)| Some(index) != skip && doc.get(field) == Some(value));
                if taken {
                    return Err(DocumentStoreError::DuplicateKey {
                        field: field.clone(),
                        value: key_to_string(value),
                    });
                }
                seen.push(value);
            }
        }
        Ok(())
    }

    fn position(&self, filter: &Filter) -> Option<usize> {
        self.documents.iter().position(|doc| filter.matches(doc))
    }

    /// Applies `set` on the first match and returns the document from before the update
    fn update_first(
        &mut self,
        filter: &Filter,
        set: &Document,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let Some(index) = self.position(filter) else {
            return Ok(None);
        };
        let mut updated = self.documents[index].clone();
        apply_set(&mut updated, set)?;
        self.check_unique(&[&updated], Some(index))?;
        Ok(Some(std::mem::replace(&mut self.documents[index], updated)))
    }
}

/// Document store kept in process memory, used for tests and local runs
pub struct InMemoryDocumentStore {
    collection: parking_lot::RwLock<Collection>,
    closed: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            collection: parking_lot::RwLock::new(Collection {
                documents: vec![],
                indexes: BTreeMap::from([(ID_FIELD.to_string(), true)]),
            }),
            closed: AtomicBool::new(false),
        }
    }
}

impl InMemoryDocumentStore {
    fn check_open(&self) -> Result<(), DocumentStoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(DocumentStoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_one(&self, filter: Filter) -> Result<Option<Document>, DocumentStoreError> {
        self.check_open()?;
        Ok(self
            .collection
            .read()
            .documents
            .iter()
            .find(|doc| filter.matches(doc))
            .cloned())
    }

    async fn find(&self, filter: Filter) -> Result<Vec<Document>, DocumentStoreError> {
        self.check_open()?;
        Ok(self
            .collection
            .read()
            .documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn insert_one(&self, document: Document) -> Result<(), DocumentStoreError> {
        self.check_open()?;
        let document = prepare_document(document)?;
        let mut collection = self.collection.write();
        collection.check_unique(&[&document], None)?;
        collection.documents.push(document);
        Ok(())
    }

    async fn insert_many(&self, documents: Vec<Document>) -> Result<u64, DocumentStoreError> {
        self.check_open()?;
        let documents = documents
            .into_iter()
            .map(prepare_document)
            .collect::<Result<Vec<_>, _>>()?;
        let mut collection = self.collection.write();
        collection.check_unique(&documents.iter().collect::<Vec<_>>(), None)?;
        let inserted = documents.len() as u64;
        collection.documents.extend(documents);
        Ok(inserted)
    }

    async fn update_one(
        &self,
        filter: Filter,
        set: Document,
    ) -> Result<UpdateResult, DocumentStoreError> {
        self.check_open()?;
        let previous = self.collection.write().update_first(&filter, &set)?;
        Ok(match previous {
            None => UpdateResult::default(),
            Some(previous) => {
                let mut updated = previous.clone();
                apply_set(&mut updated, &set)?;
                UpdateResult {
                    matched_count: 1,
                    modified_count: u64::from(updated != previous),
                }
            }
        })
    }

    async fn find_one_and_update(
        &self,
        filter: Filter,
        set: Document,
    ) -> Result<Option<Document>, DocumentStoreError> {
        self.check_open()?;
        self.collection.write().update_first(&filter, &set)
    }

    async fn delete_one(&self, filter: Filter) -> Result<DeleteResult, DocumentStoreError> {
        self.check_open()?;
        let mut collection = self.collection.write();
        Ok(match collection.position(&filter) {
            Some(index) => {
                collection.documents.remove(index);
                DeleteResult { deleted_count: 1 }
            }
            None => DeleteResult::default(),
        })
    }

    async fn delete_many(&self, filter: Filter) -> Result<DeleteResult, DocumentStoreError> {
        self.check_open()?;
        let mut collection = self.collection.write();
        let before = collection.documents.len();
        collection.documents.retain(|doc| !filter.matches(doc));
        Ok(DeleteResult {
            deleted_count: (before - collection.documents.len()) as u64,
        })
    }

    async fn create_index(&self, field: &str, unique: bool) -> Result<(), DocumentStoreError> {
        self.check_open()?;
        check_field_name(field)?;
        let mut collection = self.collection.write();
        if unique {
            let mut seen = vec![];
            for value in collection.documents.iter().filter_map(|doc| doc.get(field)) {
                if seen.contains(&value) {
                    return Err(DocumentStoreError::DuplicateKey {
                        field: field.to_string(),
                        value: key_to_string(value),
                    });
                }
                seen.push(value);
            }
        }
        let entry = collection.indexes.entry(field.to_string()).or_insert(unique);
        *entry |= unique;
        Ok(())
    }

    async fn close(&self) -> Result<(), DocumentStoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
