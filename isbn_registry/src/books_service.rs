use std::sync::Arc;

use serde_json::json;

use crate::api::{BookRecord, BookUpdate, BulkReport, Isbn, ResponseEnvelope};
use crate::document_store::{Document, DocumentStore, DocumentStoreError, Filter};

/// Unique key of the registry
pub const ISBN_FIELD: &str = "isbn";

#[derive(thiserror::Error, Debug)]
pub enum BookServiceError {
    #[error("record with isbn: {0} not found")]
    NotFound(Isbn),

    #[error("book record with isbn: {0} already exists")]
    DuplicateKey(Isbn),

    #[error("book record with isbn: {0} could not be added")]
    CreateFailed(Isbn),

    #[error("book with isbn: {0} could not be deleted")]
    DeleteFailed(Isbn),

    #[error("book registry storage is not available")]
    StoreUnavailable,

    #[error("{0} failed")]
    OperationFailed(String),
}

/// Logs the store failure and hides its details from the caller
fn store_failure(operation: &str, err: DocumentStoreError) -> BookServiceError {
    match err {
        DocumentStoreError::Closed => {
            tracing::warn!("{} rejected, document store is closed", operation);
            BookServiceError::StoreUnavailable
        }
        err => {
            tracing::error!("{} failed {}", operation, err);
            BookServiceError::OperationFailed(operation.to_string())
        }
    }
}

fn parse_record(operation: &str, document: Document) -> Result<BookRecord, BookServiceError> {
    serde_json::from_value(document).map_err(|err| store_failure(operation, err.into()))
}

/// Business logic of the registry, translates book records into document store calls
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn DocumentStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Makes sure a record can not be registered twice under the same isbn
    pub async fn init_indexes(&self) -> Result<(), BookServiceError> {
        self.store
            .create_index(ISBN_FIELD, true)
            .await
            .map_err(|err| store_failure("create isbn index", err))
    }

    pub async fn get_one(&self, isbn: &str) -> Result<ResponseEnvelope, BookServiceError> {
        let document = self
            .store
            .find_one(Filter::eq(ISBN_FIELD, isbn))
            .await
            .map_err(|err| store_failure("get record", err))?
            .ok_or_else(|| BookServiceError::NotFound(isbn.to_string()))?;
        let record = parse_record("get record", document)?;
        Ok(ResponseEnvelope::success(json!({ "record": record })))
    }

    pub async fn get_all(&self) -> Result<ResponseEnvelope, BookServiceError> {
        let books = self
            .store
            .find(Filter::All)
            .await
            .map_err(|err| store_failure("get all records", err))?
            .into_iter()
            .map(|document| parse_record("get all records", document))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResponseEnvelope::success(json!({ "books": books })))
    }

    pub async fn create_one(&self, record: BookRecord) -> Result<ResponseEnvelope, BookServiceError> {
        let isbn = record.isbn.clone();
        match self.store.insert_one(json!(record)).await {
            Ok(()) => Ok(ResponseEnvelope::success(json!({ "isbn": isbn }))),
            Err(DocumentStoreError::DuplicateKey { field, .. }) if field == ISBN_FIELD => {
                Err(BookServiceError::DuplicateKey(isbn))
            }
            Err(DocumentStoreError::Closed) => Err(BookServiceError::StoreUnavailable),
            Err(err) => {
                tracing::error!("Add record {} failed {}", isbn, err);
                Err(BookServiceError::CreateFailed(isbn))
            }
        }
    }

    /// Inserts the whole batch or nothing. A duplicate isbn rejects the batch and every isbn
    /// of it is reported as failed
    pub async fn create_many(
        &self,
        records: Vec<BookRecord>,
    ) -> Result<ResponseEnvelope, BookServiceError> {
        let isbns: Vec<Isbn> = records.iter().map(|record| record.isbn.clone()).collect();
        if records.is_empty() {
            return Ok(ResponseEnvelope::bulk(BulkReport {
                status: "0 inserted successfully".to_string(),
                succeeded: 0,
                failed: vec![],
            }));
        }

        let documents = records.into_iter().map(|record| json!(record)).collect();
        match self.store.insert_many(documents).await {
            Ok(inserted) => Ok(ResponseEnvelope::bulk(BulkReport {
                status: format!("{} inserted successfully", inserted),
                succeeded: inserted as usize,
                failed: vec![],
            })),
            Err(DocumentStoreError::DuplicateKey { field, value }) => {
                tracing::warn!("Add multiple records rejected, duplicate {} {}", field, value);
                Ok(ResponseEnvelope::bulk(BulkReport {
                    status: format!(
                        "{} record(s) could not be added, duplicate {}: {}",
                        isbns.len(),
                        field,
                        value
                    ),
                    succeeded: 0,
                    failed: isbns,
                }))
            }
            Err(err) => Err(store_failure("add multiple records", err)),
        }
    }

    /// Sets the fields present in the update, never creates a new record
    pub async fn update_one(&self, update: BookUpdate) -> Result<ResponseEnvelope, BookServiceError> {
        let result = self
            .store
            .update_one(Filter::eq(ISBN_FIELD, update.isbn.as_str()), json!(update))
            .await
            .map_err(|err| store_failure("update record", err))?;
        if result.matched_count == 0 {
            return Err(BookServiceError::NotFound(update.isbn));
        }
        Ok(ResponseEnvelope::status(
            true,
            format!("record with ISBN {} updated", update.isbn),
        ))
    }

    /// Updates every record on its own, isbns which matched nothing are reported back
    pub async fn update_many(
        &self,
        updates: Vec<BookUpdate>,
    ) -> Result<ResponseEnvelope, BookServiceError> {
        let total = updates.len();
        let mut failed = vec![];
        for update in updates {
            let set = json!(update);
            match self
                .store
                .find_one_and_update(Filter::eq(ISBN_FIELD, update.isbn.as_str()), set)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => failed.push(update.isbn),
                Err(DocumentStoreError::Closed) => return Err(BookServiceError::StoreUnavailable),
                Err(err) => {
                    tracing::error!("Update record {} failed {}", update.isbn, err);
                    failed.push(update.isbn)
                }
            }
        }

        let status = if failed.is_empty() {
            format!("All {} records updated successfully.", total)
        } else {
            format!(
                "Failed to update {} record(s): {}",
                failed.len(),
                failed.join(", ")
            )
        };
        Ok(ResponseEnvelope::bulk(BulkReport {
            status,
            succeeded: total - failed.len(),
            failed,
        }))
    }

    pub async fn delete_one(&self, isbn: &str) -> Result<ResponseEnvelope, BookServiceError> {
        let result = self
            .store
            .delete_one(Filter::eq(ISBN_FIELD, isbn))
            .await
            .map_err(|err| store_failure("delete record", err))?;
        if result.deleted_count == 0 {
            return Err(BookServiceError::DeleteFailed(isbn.to_string()));
        }
        Ok(ResponseEnvelope::status(
            true,
            format!("record with {} deleted successfully", isbn),
        ))
    }

    /// Deletes records one isbn at a time, isbns which deleted nothing are reported back
    pub async fn delete_many(&self, isbns: Vec<Isbn>) -> Result<ResponseEnvelope, BookServiceError> {
        let total = isbns.len();
        let mut failed = vec![];
        for isbn in isbns {
            match self
                .store
                .delete_many(Filter::eq(ISBN_FIELD, isbn.as_str()))
                .await
            {
                Ok(result) if result.deleted_count > 0 => {}
                Ok(_) => failed.push(isbn),
                Err(DocumentStoreError::Closed) => return Err(BookServiceError::StoreUnavailable),
                Err(err) => {
                    tracing::error!("Delete record {} failed {}", isbn, err);
                    failed.push(isbn)
                }
            }
        }

        let status = if failed.is_empty() {
            "All records deleted successfully.".to_string()
        } else {
            format!(
                "{} record(s) deleted successfully. {} record(s) could not be deleted: {}",
                total - failed.len(),
                failed.len(),
                failed.join(", ")
            )
        };
        Ok(ResponseEnvelope::bulk(BulkReport {
            status,
            succeeded: total - failed.len(),
            failed,
        }))
    }

    /// Closes the underlying connection, the service stays unavailable until restart
    pub async fn close(&self) -> Result<ResponseEnvelope, BookServiceError> {
        self.store
            .close()
            .await
            .map_err(|err| store_failure("close connection", err))?;
        Ok(ResponseEnvelope::status(true, "DB connection closed"))
    }
}
