//! Client-credentials API client for the identity provider, used by
//! Exporter and Importer to read and write realm entities.

pub mod client;
pub mod config;

pub use client::ApiClient;
pub use config::AuthConfig;
