use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web::{Data, JsonConfig};
use actix_web::Error;
use actix_web::{HttpRequest, HttpResponse};
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use serde_json::json;

use crate::api::{BookRecord, BookUpdate, FieldError, Isbn, ResponseEnvelope, Validate};
use crate::books_service::{BookService, BookServiceError};

fn validation_failed(errors: Vec<FieldError>) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(ResponseEnvelope::failure(json!({ "errors": errors })))
}

/// Body extraction errors are answered with the same envelope as validation errors
pub fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err, _req| {
        let response = validation_failed(vec![FieldError::new("body", err.to_string())]);
        InternalError::from_response(err, response).into()
    })
}

fn error_status(err: &BookServiceError) -> StatusCode {
    match err {
        BookServiceError::NotFound(_)
        | BookServiceError::DuplicateKey(_)
        | BookServiceError::CreateFailed(_)
        | BookServiceError::DeleteFailed(_) => StatusCode::BAD_REQUEST,
        BookServiceError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BookServiceError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(operation: &str, result: Result<ResponseEnvelope, BookServiceError>) -> HttpResponse {
    match result {
        Ok(envelope) => HttpResponse::Ok().json(envelope),
        Err(err) => {
            tracing::info!("{} failed {}", operation, err);
            HttpResponse::build(error_status(&err)).json(ResponseEnvelope::status(false, err.to_string()))
        }
    }
}

/// Answers requests no route matches, including routes with an empty path segment
pub async fn not_found(request: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(ResponseEnvelope::status(
        false,
        format!("no route for {} {}", request.method(), request.path()),
    ))
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn get_by_isbn(
    book_service: Data<BookService>,
    isbn: web::Path<Isbn>,
) -> Result<HttpResponse, Error> {
    Ok(respond("Get book", book_service.get_one(&isbn.into_inner()).await))
}

#[api_v2_operation]
pub async fn get_all_books(book_service: Data<BookService>) -> Result<HttpResponse, Error> {
    Ok(respond("Get all books", book_service.get_all().await))
}

#[api_v2_operation]
pub async fn add_record(
    book_service: Data<BookService>,
    record: web::Json<BookRecord>,
) -> Result<HttpResponse, Error> {
    let record = record.into_inner();
    if let Err(errors) = record.validate() {
        return Ok(validation_failed(errors));
    }
    Ok(respond("Add record", book_service.create_one(record).await))
}

#[api_v2_operation]
pub async fn add_multiple_records(
    book_service: Data<BookService>,
    records: web::Json<Vec<BookRecord>>,
) -> Result<HttpResponse, Error> {
    let records = records.into_inner();
    if let Err(errors) = records.validate() {
        return Ok(validation_failed(errors));
    }
    Ok(respond(
        "Add multiple records",
        book_service.create_many(records).await,
    ))
}

#[api_v2_operation]
pub async fn update_record(
    book_service: Data<BookService>,
    update: web::Json<BookUpdate>,
) -> Result<HttpResponse, Error> {
    let update = update.into_inner();
    if let Err(errors) = update.validate() {
        return Ok(validation_failed(errors));
    }
    Ok(respond("Update record", book_service.update_one(update).await))
}

#[api_v2_operation]
pub async fn update_many(
    book_service: Data<BookService>,
    updates: web::Json<Vec<BookUpdate>>,
) -> Result<HttpResponse, Error> {
    let updates = updates.into_inner();
    if let Err(errors) = updates.validate() {
        return Ok(validation_failed(errors));
    }
    Ok(respond("Update many", book_service.update_many(updates).await))
}

#[api_v2_operation]
pub async fn delete_record(
    book_service: Data<BookService>,
    isbn: web::Path<Isbn>,
) -> Result<HttpResponse, Error> {
    Ok(respond(
        "Delete record",
        book_service.delete_one(&isbn.into_inner()).await,
    ))
}

#[api_v2_operation]
pub async fn delete_many(
    book_service: Data<BookService>,
    isbns: web::Json<Vec<Isbn>>,
) -> Result<HttpResponse, Error> {
    Ok(respond(
        "Delete many",
        book_service.delete_many(isbns.into_inner()).await,
    ))
}

#[api_v2_operation]
/// Closes the document store connection, every later request fails until restart
pub async fn close(book_service: Data<BookService>) -> Result<HttpResponse, Error> {
    Ok(respond("Close", book_service.close().await))
}
