use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub type Isbn = String;
pub type BookId = String;

pub const ISBN_MIN_LENGTH: usize = 10;
pub const ISBN_MAX_LENGTH: usize = 13;

pub const SUCCESS_CODE: &str = "00";
pub const SUCCESS_MSG: &str = "Success";
pub const FAILURE_CODE: &str = "99";
pub const FAILURE_MSG: &str = "Failed";

/// Generates an identity for a newly created book record
pub fn generate_book_id() -> BookId {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Full book record as stored in the registry, unique by isbn
pub struct BookRecord {
    #[serde(rename = "_id", default = "generate_book_id")]
    pub id: BookId,
    pub title: String,
    #[serde(alias = "ISBN")]
    pub isbn: Isbn,
    pub author: String,
    pub pages: u32,
    pub publisher: String,
    pub year_published: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Partial update of a book record. Isbn selects the record, every other field is optional
/// and fields which are not set are left untouched in storage
pub struct BookUpdate {
    #[serde(alias = "ISBN")]
    pub isbn: Isbn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_published: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Single validation problem reported back to the caller
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

fn check_isbn(isbn: &str, errors: &mut Vec<FieldError>) {
    let length = isbn.chars().count();
    if !(ISBN_MIN_LENGTH..=ISBN_MAX_LENGTH).contains(&length) {
        errors.push(FieldError::new(
            "isbn",
            format!(
                "isbn must have between {} and {} characters, got {}",
                ISBN_MIN_LENGTH, ISBN_MAX_LENGTH, length
            ),
        ));
    }
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    if title.trim().is_empty() {
        errors.push(FieldError::new("title", "title must not be empty"));
    }
}

fn check_pages(pages: u32, errors: &mut Vec<FieldError>) {
    if pages == 0 {
        errors.push(FieldError::new("pages", "pages must be a positive number"));
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl Validate for BookRecord {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = vec![];
        check_title(&self.title, &mut errors);
        check_isbn(&self.isbn, &mut errors);
        check_pages(self.pages, &mut errors);
        into_result(errors)
    }
}

impl Validate for BookUpdate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = vec![];
        if let Some(title) = &self.title {
            check_title(title, &mut errors);
        }
        check_isbn(&self.isbn, &mut errors);
        if let Some(pages) = self.pages {
            check_pages(pages, &mut errors);
        }
        into_result(errors)
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors = self
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.validate().err().map(|errors| (index, errors)))
            .flat_map(|(index, errors)| {
                errors.into_iter().map(move |error| FieldError {
                    field: format!("[{}].{}", index, error.field),
                    message: error.message,
                })
            })
            .collect();
        into_result(errors)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
/// Outcome of a bulk operation, lists every isbn that was not applied
pub struct BulkReport {
    pub status: String,
    pub succeeded: usize,
    pub failed: Vec<Isbn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Uniform response body returned by every endpoint
pub struct ResponseEnvelope {
    pub code: String,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ResponseEnvelope {
    pub fn new(code: impl Into<String>, msg: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            code: code.into(),
            msg: msg.into(),
            details,
        }
    }

    pub fn success(details: Value) -> Self {
        Self::new(SUCCESS_CODE, SUCCESS_MSG, Some(details))
    }

    pub fn failure(details: Value) -> Self {
        Self::new(FAILURE_CODE, FAILURE_MSG, Some(details))
    }

    /// Envelope carrying only a human readable status line
    pub fn status(success: bool, status: impl Into<String>) -> Self {
        let details = json!({ "status": status.into() });
        if success {
            Self::success(details)
        } else {
            Self::failure(details)
        }
    }

    pub fn bulk(report: BulkReport) -> Self {
        let success = report.failed.is_empty();
        let details = json!(report);
        if success {
            Self::success(details)
        } else {
            Self::failure(details)
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Reads a single entry of details, e.g. `record` or `books`
    pub fn detail<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.details
            .as_ref()
            .and_then(|details| details.get(key))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[cfg(test)]
mod api_tests {
    use chrono::TimeZone;

    use super::*;

    fn valid_record() -> BookRecord {
        BookRecord {
            id: generate_book_id(),
            title: "Dune".to_string(),
            isbn: "9780441013593".to_string(),
            author: "Frank Herbert".to_string(),
            pages: 412,
            publisher: "Ace".to_string(),
            year_published: Utc.with_ymd_and_hms(1965, 8, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_without_id_gets_one_generated() {
        let record: BookRecord = serde_json::from_value(json!({
            "title": "Dune",
            "ISBN": "9780441013593",
            "author": "Frank Herbert",
            "pages": 412,
            "publisher": "Ace",
            "year_published": "1965-08-01T00:00:00Z"
        }))
        .expect("Failed to deserialize record");

        assert_eq!(record.isbn, "9780441013593");
        assert_eq!(record.id.len(), 32);
        assert!(record.validate().is_ok());

        let serialized = json!(record);
        assert_eq!(serialized["_id"], json!(record.id));
        assert_eq!(serialized["isbn"], json!("9780441013593"));
    }

    #[test]
    fn test_record_validation_reports_every_field() {
        let record = BookRecord {
            title: " ".to_string(),
            isbn: "123".to_string(),
            pages: 0,
            ..valid_record()
        };
        let errors = record.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "isbn", "pages"]);

        let too_long = BookRecord {
            isbn: "12345678901234".to_string(),
            ..valid_record()
        };
        assert_eq!(too_long.validate().unwrap_err()[0].field, "isbn");

        let shortest = BookRecord {
            isbn: "1234567890".to_string(),
            ..valid_record()
        };
        assert!(shortest.validate().is_ok());
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = BookUpdate {
            isbn: "1234567890".to_string(),
            title: Some("New".to_string()),
            ..BookUpdate::default()
        };
        assert_eq!(
            json!(update),
            json!({"isbn": "1234567890", "title": "New"})
        );

        let invalid = BookUpdate {
            isbn: "1234567890".to_string(),
            pages: Some(0),
            ..BookUpdate::default()
        };
        assert_eq!(invalid.validate().unwrap_err()[0].field, "pages");
    }

    #[test]
    fn test_list_validation_prefixes_index() {
        let records = vec![
            valid_record(),
            BookRecord {
                isbn: "1".to_string(),
                ..valid_record()
            },
        ];
        let errors = records.validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("[1].isbn", errors[0].message.clone())]);
    }

    #[test]
    fn test_envelope_builders() {
        let success = ResponseEnvelope::success(json!({"isbn": "1234567890"}));
        assert!(success.is_success());
        assert_eq!(success.msg, "Success");
        assert_eq!(success.detail::<String>("isbn"), Some("1234567890".to_string()));

        let failure = ResponseEnvelope::status(false, "nope");
        assert_eq!(failure.code, "99");
        assert_eq!(failure.msg, "Failed");
        assert_eq!(failure.detail::<String>("status"), Some("nope".to_string()));

        let bulk = ResponseEnvelope::bulk(BulkReport {
            status: "Failed to update 1 record(s): 1234567890".to_string(),
            succeeded: 0,
            failed: vec!["1234567890".to_string()],
        });
        assert!(!bulk.is_success());

        let empty = ResponseEnvelope::new("00", "Success", None);
        assert_eq!(json!(empty), json!({"code": "00", "msg": "Success"}));
    }
}
