use std::time::UNIX_EPOCH;

use chrono::{TimeZone, Utc};

use isbn_registry::api::{generate_book_id, BookRecord, BookUpdate, Isbn};
use isbn_registry::client::IsbnRegistryClient;

const ISBN_REGISTRY_URL: &str = "http://127.0.0.1:8080";

/// 13 digit isbn that does not collide with records of previous runs
fn unique_isbn(offset: u128) -> Isbn {
    let micros = std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_micros();
    format!("{:013}", (micros + offset) % 10_000_000_000_000)
}

fn book(isbn: &str, title: &str) -> BookRecord {
    BookRecord {
        id: generate_book_id(),
        title: title.to_string(),
        isbn: isbn.to_string(),
        author: "Author1".to_string(),
        pages: 250,
        publisher: "Publisher1".to_string(),
        year_published: Utc.with_ymd_and_hms(2010, 5, 17, 0, 0, 0).unwrap(),
    }
}

#[tokio::test]
/// Simple test for the isbn registry
/// Creates a book
/// Gets the book
/// Tries to create the same isbn again
/// Patches the book
/// Gets list of books and checks if the book is there
/// Deletes the book
async fn isbn_registry_e2e_test() {
    let client = IsbnRegistryClient::new(ISBN_REGISTRY_URL).expect("Failed to create client");

    let isbn = unique_isbn(0);
    let record = book(&isbn, "title1");

    let created = client.add_book(&record).await.expect("Failed to add book");
    assert!(created.is_success());

    let returned = client
        .get_book(&isbn)
        .await
        .expect("Failed to get book")
        .expect("Book not found");
    assert_eq!(returned, record);

    let duplicate = client
        .add_book(&book(&isbn, "other title"))
        .await
        .expect("Failed to call add book");
    assert!(!duplicate.is_success());

    let update = BookUpdate {
        isbn: isbn.clone(),
        title: Some("updated title".to_string()),
        ..BookUpdate::default()
    };
    let updated = client.update_book(&update).await.expect("Failed to update book");
    assert!(updated.is_success());

    let books = client.list_books().await.expect("Failed to list books");
    assert!(books
        .iter()
        .any(|book| book.isbn == isbn && book.title == "updated title" && book.pages == 250));

    let deleted = client.delete_book(&isbn).await.expect("Failed to delete book");
    assert!(deleted.is_success());
    assert_eq!(client.get_book(&isbn).await.expect("Failed to get book"), None);
}

#[tokio::test]
/// Bulk endpoints report every isbn they could not apply
async fn isbn_registry_bulk_e2e_test() {
    let client = IsbnRegistryClient::new(ISBN_REGISTRY_URL).expect("Failed to create client");

    let isbn_a = unique_isbn(1_000_000);
    let isbn_b = unique_isbn(2_000_000);
    let missing_isbn = unique_isbn(3_000_000);

    let created = client
        .add_books(&[book(&isbn_a, "A"), book(&isbn_b, "B")])
        .await
        .expect("Failed to add books");
    assert!(created.is_success());
    assert_eq!(created.detail::<usize>("succeeded"), Some(2));

    let updates = vec![
        BookUpdate {
            isbn: isbn_a.clone(),
            pages: Some(10),
            ..BookUpdate::default()
        },
        BookUpdate {
            isbn: missing_isbn.clone(),
            pages: Some(10),
            ..BookUpdate::default()
        },
    ];
    let updated = client
        .update_books(&updates)
        .await
        .expect("Failed to update books");
    assert!(!updated.is_success());
    assert_eq!(
        updated.detail::<Vec<Isbn>>("failed"),
        Some(vec![missing_isbn.clone()])
    );

    let deleted = client
        .delete_books(&[isbn_a.clone(), isbn_b.clone()])
        .await
        .expect("Failed to delete books");
    assert!(deleted.is_success());

    let books = client.list_books().await.expect("Failed to list books");
    assert!(!books
        .iter()
        .any(|book| book.isbn == isbn_a || book.isbn == isbn_b));
}
