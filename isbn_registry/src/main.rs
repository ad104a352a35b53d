use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use opentelemetry::global;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::runtime::TokioCurrentThread;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use isbn_registry::app_config::{config_app, default_service};
use isbn_registry::app_settings::AppSettings;
use isbn_registry::books_service::BookService;
use isbn_registry::document_store::{
    DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, PostgresDocumentStoreConfig,
};
use isbn_registry::handlers::json_config;

// Based on https://github.com/LukeMathWalker/tracing-actix-web/blob/main/examples/opentelemetry/src/main.rs#L15
fn init_telemetry() {
    let app_name = "isbn_registry";

    // Start a new Jaeger trace pipeline.
    // Spans are exported in batch - recommended setup for a production application.
    global::set_text_map_propagator(TraceContextPropagator::new());
    #[allow(deprecated)]
    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(app_name)
        .install_batch(TokioCurrentThread)
        .expect("Failed to install OpenTelemetry tracer.");

    // Filter based on level - trace, debug, info, warn, error
    // Tunable via `RUST_LOG` env variable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("info"));
    // Create a `tracing` layer using the Jaeger tracer
    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    // Create a `tracing` layer to emit spans as structured logs to stdout
    let formatting_layer = BunyanFormattingLayer::new(app_name.into(), std::io::stdout);
    // Combined them all together in a `tracing` subscriber
    let subscriber = Registry::default()
        .with(env_filter)
        .with(telemetry)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to install `tracing` subscriber.")
}

async fn init_document_store(settings: &AppSettings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if settings.use_in_memory_db {
        tracing::info!("Using in memory document store");
        return Ok(Arc::new(InMemoryDocumentStore::default()));
    }
    let store = PostgresDocumentStore::connect(PostgresDocumentStoreConfig {
        uri: settings.database_url.clone(),
        database: settings.database_name.clone(),
        collection: settings.collection_name.clone(),
    })
    .await?;
    Ok(Arc::new(store))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry();
    let settings = AppSettings::load()?;

    // One store for the whole process, shared by all workers until /close or shutdown
    let document_store = init_document_store(&settings)
        .await
        .context("Failed to init document store")?;
    let book_service = BookService::new(document_store);
    book_service
        .init_indexes()
        .await
        .context("Failed to create isbn index")?;

    tracing::info!("starting HTTP server at http://0.0.0.0:{}", settings.port);
    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(book_service.clone()))
            .app_data(json_config())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .default_service(default_service())
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind(("0.0.0.0", settings.port))?
    .run()
    .await?;

    opentelemetry::global::shutdown_tracer_provider();
    Ok(())
}
