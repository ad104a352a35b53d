pub mod api;

#[cfg(any(feature = "client", test))]
pub mod client;

#[cfg(any(feature = "server", test))]
pub mod app_config;
#[cfg(any(feature = "server", test))]
pub mod app_settings;
#[cfg(any(feature = "server", test))]
pub mod books_service;
#[cfg(any(feature = "server", test))]
pub mod document_store;
#[cfg(any(feature = "server", test))]
pub mod handlers;
