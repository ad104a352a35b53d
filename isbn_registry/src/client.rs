use anyhow::{bail, Context};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;

use crate::api::{BookRecord, BookUpdate, Isbn, ResponseEnvelope};

/// Client of the isbn registry http api.
/// Every call returns the response envelope, failures reported by the registry
/// come back as envelopes with failure code, anything else is an error
pub struct IsbnRegistryClient {
    url: String,
    client: ClientWithMiddleware,
}

impl IsbnRegistryClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    async fn send(&self, request: RequestBuilder) -> anyhow::Result<ResponseEnvelope> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        match serde_json::from_str::<ResponseEnvelope>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if status.is_success() => bail!("Unexpected response body {}", body),
            Err(_) => bail!("Request failed with status {} {}", status, body),
        }
    }

    /// Calls GET /get-by-isbn/{isbn} endpoint
    /// Returns the record if present and None if there is no record with given isbn
    pub async fn get_book(&self, isbn: &str) -> anyhow::Result<Option<BookRecord>> {
        let envelope = self
            .send(self.client.get(format!("{}/get-by-isbn/{}", self.url, isbn)))
            .await?;
        Ok(envelope.detail("record"))
    }

    /// Calls GET /get-all-books endpoint
    pub async fn list_books(&self) -> anyhow::Result<Vec<BookRecord>> {
        let envelope = self
            .send(self.client.get(format!("{}/get-all-books", self.url)))
            .await?;
        envelope
            .detail("books")
            .with_context(|| format!("Failed to list books {:?}", envelope.details))
    }

    /// Calls POST /add-record endpoint
    pub async fn add_book(&self, record: &BookRecord) -> anyhow::Result<ResponseEnvelope> {
        self.send(
            self.client
                .post(format!("{}/add-record", self.url))
                .json(record),
        )
        .await
    }

    /// Calls POST /add-multiple-records endpoint
    pub async fn add_books(&self, records: &[BookRecord]) -> anyhow::Result<ResponseEnvelope> {
        self.send(
            self.client
                .post(format!("{}/add-multiple-records", self.url))
                .json(records),
        )
        .await
    }

    /// Calls PUT /update-record endpoint
    pub async fn update_book(&self, update: &BookUpdate) -> anyhow::Result<ResponseEnvelope> {
        self.send(
            self.client
                .put(format!("{}/update-record", self.url))
                .json(update),
        )
        .await
    }

    /// Calls PUT /update-many endpoint
    pub async fn update_books(&self, updates: &[BookUpdate]) -> anyhow::Result<ResponseEnvelope> {
        self.send(
            self.client
                .put(format!("{}/update-many", self.url))
                .json(updates),
        )
        .await
    }

    /// Calls DELETE /delete-record/{isbn} endpoint
    pub async fn delete_book(&self, isbn: &str) -> anyhow::Result<ResponseEnvelope> {
        self.send(
            self.client
                .delete(format!("{}/delete-record/{}", self.url, isbn)),
        )
        .await
    }

    /// Calls DELETE /delete-many endpoint
    pub async fn delete_books(&self, isbns: &[Isbn]) -> anyhow::Result<ResponseEnvelope> {
        self.send(
            self.client
                .delete(format!("{}/delete-many", self.url))
                .json(isbns),
        )
        .await
    }

    /// Calls GET /close endpoint, the registry stays unavailable until restarted
    pub async fn close(&self) -> anyhow::Result<ResponseEnvelope> {
        self.send(self.client.get(format!("{}/close", self.url))).await
    }
}
